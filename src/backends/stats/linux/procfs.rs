// procfs crate stats backend
//
// Same data as the netdev backend, parsed by the procfs crate. Reopens
// /proc/net/dev on every poll.

use crate::backends::BackendPriority;
use crate::backends::stats::{CounterSample, StatsSource};
use crate::error::{MonitorError, Result};

pub struct ProcfsStats;

impl ProcfsStats {
    pub fn open() -> Result<Self> {
        if !Self::is_available() {
            return Err(MonitorError::unavailable("procfs", "/proc not mounted"));
        }
        Ok(Self)
    }
}

impl StatsSource for ProcfsStats {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Good
    }

    fn is_available() -> bool {
        std::path::Path::new("/proc/net/dev").exists()
    }

    fn sample(&mut self, interface: &str) -> Result<CounterSample> {
        let devices = procfs::net::dev_status()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let device = devices
            .get(interface)
            .ok_or_else(|| MonitorError::lookup_failed("procfs", interface))?;

        Ok(CounterSample::new(device.recv_bytes, device.sent_bytes))
    }
}
