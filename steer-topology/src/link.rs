// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Links between devices and the factories that build them.
//!
//! A link's multiplicity says how many base-bandwidth links one adjacency
//! entry stands for. Its effective bandwidth is the base bandwidth scaled by
//! the multiplicity.
//!
//! ```rust
//! use steer_topology::device::DeviceInfo;
//! use steer_topology::link::{LinkFactory, PerfectSimpleLinkFactory};
//!
//! let factory = PerfectSimpleLinkFactory::new(10, 100);
//! let a = DeviceInfo::switch(1, 0);
//! let b = DeviceInfo::switch(2, 1);
//! let link = factory.create(&a, &b, 4).unwrap();
//! assert_eq!(link.bandwidth_bit_per_ns(), 400);
//! assert!(factory.create(&a, &b, 0).is_err());
//! ```

use steer_engine::types::SimTimeNs;

use crate::device::DeviceInfo;
use crate::errors::TopologyError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    delay_ns: SimTimeNs,
    base_bandwidth_bit_per_ns: u64,
    multiplicity: u64,
}

impl Link {
    pub fn new(
        delay_ns: SimTimeNs,
        base_bandwidth_bit_per_ns: u64,
        multiplicity: i64,
    ) -> Result<Self, TopologyError> {
        if multiplicity < 1 {
            return Err(TopologyError::InvalidMultiplicity { multiplicity });
        }
        Ok(Self {
            delay_ns,
            base_bandwidth_bit_per_ns,
            multiplicity: multiplicity as u64,
        })
    }

    #[must_use]
    pub fn delay_ns(&self) -> SimTimeNs {
        self.delay_ns
    }

    #[must_use]
    pub fn base_bandwidth_bit_per_ns(&self) -> u64 {
        self.base_bandwidth_bit_per_ns
    }

    /// Bandwidth of all parallel links together.
    #[must_use]
    pub fn bandwidth_bit_per_ns(&self) -> u64 {
        self.base_bandwidth_bit_per_ns.saturating_mul(self.multiplicity)
    }

    #[must_use]
    pub fn multiplicity(&self) -> u64 {
        self.multiplicity
    }

    /// Change the number of parallel links. Zero is allowed and models a
    /// link that is down.
    pub fn set_multiplicity(&mut self, multiplicity: i64) -> Result<(), TopologyError> {
        if multiplicity < 0 {
            return Err(TopologyError::InvalidMultiplicity { multiplicity });
        }
        self.multiplicity = multiplicity as u64;
        Ok(())
    }
}

/// Builds the link for one adjacency entry.
pub trait LinkFactory {
    fn create(
        &self,
        from: &DeviceInfo,
        to: &DeviceInfo,
        multiplicity: i64,
    ) -> Result<Link, TopologyError>;
}

/// Every link has the same delay and base bandwidth.
pub struct PerfectSimpleLinkFactory {
    delay_ns: SimTimeNs,
    bandwidth_bit_per_ns: u64,
}

impl PerfectSimpleLinkFactory {
    #[must_use]
    pub fn new(delay_ns: SimTimeNs, bandwidth_bit_per_ns: u64) -> Self {
        Self {
            delay_ns,
            bandwidth_bit_per_ns,
        }
    }
}

impl LinkFactory for PerfectSimpleLinkFactory {
    fn create(
        &self,
        _from: &DeviceInfo,
        _to: &DeviceInfo,
        multiplicity: i64,
    ) -> Result<Link, TopologyError> {
        Link::new(self.delay_ns, self.bandwidth_bit_per_ns, multiplicity)
    }
}

/// Links touching a server use the injection bandwidth.
pub struct DifferentInjectionLinkFactory {
    delay_ns: SimTimeNs,
    bandwidth_bit_per_ns: u64,
    injection_bandwidth_bit_per_ns: u64,
}

impl DifferentInjectionLinkFactory {
    #[must_use]
    pub fn new(
        delay_ns: SimTimeNs,
        bandwidth_bit_per_ns: u64,
        injection_bandwidth_bit_per_ns: u64,
    ) -> Self {
        Self {
            delay_ns,
            bandwidth_bit_per_ns,
            injection_bandwidth_bit_per_ns,
        }
    }
}

impl LinkFactory for DifferentInjectionLinkFactory {
    fn create(
        &self,
        from: &DeviceInfo,
        to: &DeviceInfo,
        multiplicity: i64,
    ) -> Result<Link, TopologyError> {
        let bandwidth = if from.is_server || to.is_server {
            self.injection_bandwidth_bit_per_ns
        } else {
            self.bandwidth_bit_per_ns
        };
        Link::new(self.delay_ns, bandwidth, multiplicity)
    }
}

/// Links whose multiplicity changes at run time. Links touching a server
/// use the server delay.
pub struct ReconfigurableLinkFactory {
    delay_ns: SimTimeNs,
    server_delay_ns: SimTimeNs,
    bandwidth_bit_per_ns: u64,
}

impl ReconfigurableLinkFactory {
    #[must_use]
    pub fn new(delay_ns: SimTimeNs, server_delay_ns: SimTimeNs, bandwidth_bit_per_ns: u64) -> Self {
        Self {
            delay_ns,
            server_delay_ns,
            bandwidth_bit_per_ns,
        }
    }
}

impl LinkFactory for ReconfigurableLinkFactory {
    fn create(
        &self,
        from: &DeviceInfo,
        to: &DeviceInfo,
        multiplicity: i64,
    ) -> Result<Link, TopologyError> {
        let delay_ns = if from.is_server || to.is_server {
            self.server_delay_ns
        } else {
            self.delay_ns
        };
        Link::new(delay_ns, self.bandwidth_bit_per_ns, multiplicity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch(id: usize) -> DeviceInfo {
        DeviceInfo::switch(id, id / 10)
    }

    fn server(id: usize) -> DeviceInfo {
        DeviceInfo::server(id, id / 10)
    }

    #[test]
    fn bandwidth_scales_with_multiplicity() {
        let factory = PerfectSimpleLinkFactory::new(20, 25);
        for m in 1..5 {
            let link = factory.create(&switch(10), &switch(20), m).unwrap();
            assert_eq!(link.bandwidth_bit_per_ns(), 25 * m as u64);
            assert_eq!(link.delay_ns(), 20);
        }
    }

    #[test]
    fn sub_unit_multiplicity_rejected() {
        let factory = PerfectSimpleLinkFactory::new(20, 25);
        for m in [0, -1, i64::MIN] {
            assert_eq!(
                factory.create(&switch(10), &switch(20), m),
                Err(TopologyError::InvalidMultiplicity { multiplicity: m })
            );
        }
    }

    #[test]
    fn injection_bandwidth_for_servers() {
        let factory = DifferentInjectionLinkFactory::new(5, 100, 40);
        let core = factory.create(&switch(10), &switch(20), 2).unwrap();
        assert_eq!(core.bandwidth_bit_per_ns(), 200);
        let up = factory.create(&server(11), &switch(10), 1).unwrap();
        assert_eq!(up.bandwidth_bit_per_ns(), 40);
        let down = factory.create(&switch(10), &server(11), 3).unwrap();
        assert_eq!(down.bandwidth_bit_per_ns(), 120);
    }

    #[test]
    fn server_delay_for_reconfigurable() {
        let factory = ReconfigurableLinkFactory::new(50, 5, 100);
        assert_eq!(
            factory.create(&switch(10), &switch(20), 1).unwrap().delay_ns(),
            50
        );
        assert_eq!(
            factory.create(&server(11), &switch(10), 1).unwrap().delay_ns(),
            5
        );
    }

    #[test]
    fn huge_multiplicity_saturates() {
        let mut link = Link::new(1, 10, i64::MAX).unwrap();
        assert_eq!(link.bandwidth_bit_per_ns(), u64::MAX);
        link.set_multiplicity(i64::MAX).unwrap();
        assert_eq!(link.bandwidth_bit_per_ns(), u64::MAX);
    }

    #[test]
    fn multiplicity_can_drop_to_zero() {
        let mut link = Link::new(1, 10, 3).unwrap();
        link.set_multiplicity(0).unwrap();
        assert_eq!(link.bandwidth_bit_per_ns(), 0);
        assert_eq!(
            link.set_multiplicity(-2),
            Err(TopologyError::InvalidMultiplicity { multiplicity: -2 })
        );
        assert_eq!(link.multiplicity(), 0);
    }
}
