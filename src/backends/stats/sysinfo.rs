// sysinfo stats backend
//
// Portable fallback for platforms without a native backend.

use crate::backends::BackendPriority;
use crate::backends::stats::{CounterSample, StatsSource};
use crate::error::{MonitorError, Result};
use sysinfo::Networks;

pub struct SysinfoStats {
    networks: Networks,
}

impl SysinfoStats {
    pub fn open(interface: &str) -> Result<Self> {
        let networks = Networks::new_with_refreshed_list();
        if networks.list().is_empty() {
            return Err(MonitorError::unavailable(
                "sysinfo",
                "no network interfaces reported",
            ));
        }
        if !networks.list().contains_key(interface) {
            log::debug!("sysinfo does not know {} yet", interface);
        }
        Ok(Self { networks })
    }

    fn counters(&self, interface: &str) -> Option<CounterSample> {
        self.networks
            .list()
            .get(interface)
            .map(|data| CounterSample::new(data.total_received(), data.total_transmitted()))
    }
}

impl StatsSource for SysinfoStats {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Fallback
    }

    fn is_available() -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    fn sample(&mut self, interface: &str) -> Result<CounterSample> {
        self.networks.refresh();
        if let Some(sample) = self.counters(interface) {
            return Ok(sample);
        }

        // The interface may have appeared since the list was built
        self.networks.refresh_list();
        self.counters(interface)
            .ok_or_else(|| MonitorError::lookup_failed("sysinfo", interface))
    }
}
