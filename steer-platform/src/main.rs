// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::process::ExitCode;

use clap::Parser;
use steer_engine::engine::Engine;
use steer_engine::types::SimError;
use steer_platform::Platform;
use steer_platform::builder::build_tracker;
use steer_platform::types::{Cli, RunConfig};

fn run(cli: &Cli) -> Result<(), SimError> {
    let cfg = RunConfig::from_cli(cli)?;
    let Some(fabric_file) = &cli.fabric_file else {
        return Err(SimError("No fabric file given".to_string()));
    };

    let tracker = build_tracker(&cfg)?;
    let mut engine = Engine::new(&tracker);
    let mut platform = Platform::from_file(&engine, &cfg, fabric_file)?;
    platform.plan_reconfigurations(&engine)?;
    engine.run_until(cfg.run_time_ns)?;

    println!("{platform}");
    println!(
        "Ran to {}ns, {} reconfigurations planned",
        engine.time_now_ns(),
        platform.num_planned()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
