// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Configuration types.
//!
//! [`RunConfig`] holds the run settings and is layered from defaults, an
//! optional TOML file, `STEER_` environment variables and the command line.
//! [`FabricConfig`] is the YAML description of the devices, links, weights
//! and reconfiguration plan.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use steer_engine::sim_error;
use steer_engine::types::{BlockId, NodeId, SimError, SimResult, SimTimeNs};
use steer_routing::load_balancer::DEFAULT_SEED;
use steer_track::str_to_level;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    PerfectSimple,
    PerfectSimpleDifferentInjectionBandwidth,
    ReconfigurableLink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingKind {
    Wcmp,
    Threshold,
    ReconfigurablePod,
    BlockValiant,
    BlockUgalG,
    BlockUgalL,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerKind {
    Stateless,
    Stateful,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub link: LinkKind,
    pub link_delay_ns: SimTimeNs,
    pub link_bandwidth_bit_per_ns: u64,
    pub injection_link_bandwidth_bit_per_ns: u64,
    pub server_link_delay_ns: SimTimeNs,

    pub routing: RoutingKind,
    pub load_balancer: LoadBalancerKind,

    pub wcmp_path_weights_filename: Option<PathBuf>,
    pub threshold_path_weights_filename: Option<PathBuf>,
    pub reconfiguration_events_filename: Option<PathBuf>,
    pub pod_id_filename: Option<PathBuf>,

    pub routing_random_valiant_node_range_lower_incl: BlockId,
    pub routing_random_valiant_node_range_upper_incl: BlockId,
    pub routing_ecmp_then_valiant_switch_threshold_bytes: u64,
    pub threshold_rate_bit_per_ns: f64,

    pub link_reconfig_latency_ns: SimTimeNs,
    pub reconfiguration_period_ns: SimTimeNs,
    pub run_time_ns: SimTimeNs,

    pub seed: u64,
    pub log_level: String,

    /// Where to write the log. `-` is stdout.
    pub log_file: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            link: LinkKind::PerfectSimple,
            link_delay_ns: 20,
            link_bandwidth_bit_per_ns: 10,
            injection_link_bandwidth_bit_per_ns: 10,
            server_link_delay_ns: 20,
            routing: RoutingKind::Wcmp,
            load_balancer: LoadBalancerKind::Stateless,
            wcmp_path_weights_filename: None,
            threshold_path_weights_filename: None,
            reconfiguration_events_filename: None,
            pod_id_filename: None,
            routing_random_valiant_node_range_lower_incl: 0,
            routing_random_valiant_node_range_upper_incl: 0,
            routing_ecmp_then_valiant_switch_threshold_bytes: 100_000,
            threshold_rate_bit_per_ns: 1.0,
            link_reconfig_latency_ns: 1_000,
            reconfiguration_period_ns: 1_000_000,
            run_time_ns: 10_000_000,
            seed: DEFAULT_SEED,
            log_level: "warn".to_string(),
            log_file: "-".to_string(),
        }
    }
}

/// Command line overrides. Anything left unset keeps its configured value.
#[derive(Debug, Default, Parser)]
#[command(about = "Run a reconfigurable fabric defined by a YAML file")]
pub struct Cli {
    /// YAML description of the fabric
    pub fabric_file: Option<PathBuf>,

    /// TOML file of run settings
    #[arg(long)]
    pub conf_file: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub link: Option<LinkKind>,

    #[arg(long, value_enum)]
    pub routing: Option<RoutingKind>,

    #[arg(long, value_enum)]
    pub load_balancer: Option<LoadBalancerKind>,

    #[arg(long)]
    pub run_time_ns: Option<SimTimeNs>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Level of log messages to emit (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write the log to this file. Use '-' for stdout
    #[arg(short = 'l', long)]
    pub log_file: Option<String>,
}

impl RunConfig {
    fn figment(conf_file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(RunConfig::default()));
        if let Some(conf_file) = conf_file {
            figment = figment.merge(Toml::file(conf_file));
        }
        figment.merge(Env::prefixed("STEER_"))
    }

    /// Layer defaults, the TOML file and `STEER_` environment variables.
    pub fn load(conf_file: Option<&Path>) -> Result<Self, SimError> {
        if let Some(path) = conf_file {
            if !path.is_file() {
                return sim_error!(format!("{} not found", path.display()));
            }
        }
        let config: RunConfig = Self::figment(conf_file)
            .extract()
            .map_err(|e| SimError(format!("Unable to load run config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load with every source including the command line.
    pub fn from_cli(cli: &Cli) -> Result<Self, SimError> {
        let mut config = Self::load(cli.conf_file.as_deref())?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, SimError> {
        let config: RunConfig = serde_yaml::from_str(s)
            .map_err(|e| SimError(format!("serde_yaml::from_str failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(link) = cli.link {
            self.link = link;
        }
        if let Some(routing) = cli.routing {
            self.routing = routing;
        }
        if let Some(load_balancer) = cli.load_balancer {
            self.load_balancer = load_balancer;
        }
        if let Some(run_time_ns) = cli.run_time_ns {
            self.run_time_ns = run_time_ns;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = log_level.clone();
        }
        if let Some(log_file) = &cli.log_file {
            self.log_file = log_file.clone();
        }
    }

    pub fn validate(&self) -> SimResult {
        if self.link_bandwidth_bit_per_ns == 0 {
            return sim_error!("link_bandwidth_bit_per_ns must be positive");
        }
        if self.link == LinkKind::PerfectSimpleDifferentInjectionBandwidth
            && self.injection_link_bandwidth_bit_per_ns == 0
        {
            return sim_error!("injection_link_bandwidth_bit_per_ns must be positive");
        }
        if self.routing_random_valiant_node_range_lower_incl
            > self.routing_random_valiant_node_range_upper_incl
        {
            return sim_error!(format!(
                "valiant range {}..={} is empty",
                self.routing_random_valiant_node_range_lower_incl,
                self.routing_random_valiant_node_range_upper_incl
            ));
        }
        if self.link == LinkKind::ReconfigurableLink && self.link_reconfig_latency_ns == 0 {
            return sim_error!("link_reconfig_latency_ns must be positive");
        }
        if self.routing == RoutingKind::Threshold && self.threshold_rate_bit_per_ns <= 0.0 {
            return sim_error!("threshold_rate_bit_per_ns must be positive");
        }
        if str_to_level(&self.log_level).is_none() {
            return sim_error!(format!("Unknown log level '{}'", self.log_level));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct FabricConfig {
    pub servers: Option<Vec<DeviceSection>>,
    pub switches: Option<Vec<SwitchSection>>,
    pub links: Option<Vec<LinkSection>>,
    pub block_weights: Option<Vec<BlockWeightSection>>,
    pub reconfiguration: Option<ReconfigurationSection>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceSection {
    pub id: NodeId,
    pub block: BlockId,
}

#[derive(Debug, Deserialize)]
pub struct SwitchSection {
    pub id: NodeId,
    pub block: BlockId,
    #[serde(default)]
    pub reconfigurable: bool,
}

#[derive(Debug, Deserialize)]
pub struct LinkSection {
    pub from: NodeId,
    pub to: NodeId,
    pub multiplicity: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockWeightSection {
    pub source: BlockId,
    pub destination: BlockId,
    pub intermediate: BlockId,
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReconfigurationSection {
    pub events: Option<Vec<EventSection>>,
    pub epochs: Option<Vec<EpochSection>>,
}

#[derive(Debug, Deserialize)]
pub struct EventSection {
    pub time_ns: SimTimeNs,
    pub device: NodeId,
    pub details: BTreeMap<BlockId, i64>,
    pub during: Vec<BlockWeightSection>,
    pub after: Vec<BlockWeightSection>,
}

#[derive(Debug, Deserialize)]
pub struct EpochSection {
    pub offset_ns: SimTimeNs,
    pub switches: BTreeMap<NodeId, BTreeMap<BlockId, i64>>,
    pub during: Vec<BlockWeightSection>,
    pub after: Vec<BlockWeightSection>,
}
