// Interface counter backends
//
// Every backend answers the same question: what are the cumulative rx/tx byte
// counters of interface X right now. How they get there differs a lot:
// - Linux: /proc/net/dev (netdev), the ifindex table + sysfs (sysfs), procfs crate (procfs)
// - FreeBSD: ifmib sysctl rows (ifmib)
// - illumos/Solaris: kstat named statistics (kstat)
// - Anything else: sysinfo (sysinfo)

use super::{BackendInfo, BackendPriority, best_available};
use crate::error::{MonitorError, Result};

pub mod indexed;
pub mod kstat;
pub mod sysinfo;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "freebsd")]
pub mod freebsd;

/// One raw cumulative read of an interface's byte counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSample {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl CounterSample {
    pub fn new(rx_bytes: u64, tx_bytes: u64) -> Self {
        Self { rx_bytes, tx_bytes }
    }
}

/// Interface counter source trait
///
/// A value of this trait is the open handle: whatever the backend caches to
/// make repeated polls cheap (an open file, a row index, a registry) lives in
/// it, and dropping it releases everything.
pub trait StatsSource: Send {
    /// Backend name (e.g., "netdev", "ifmib", "kstat")
    fn name(&self) -> &'static str;

    /// Backend priority for auto-selection
    fn priority(&self) -> BackendPriority;

    /// Check if this backend is available on the current system
    fn is_available() -> bool
    where
        Self: Sized;

    /// Read the cumulative counters of `interface`
    ///
    /// A stale cached lookup must be re-resolved by name before this gives
    /// up with `MonitorError::LookupFailed`.
    fn sample(&mut self, interface: &str) -> Result<CounterSample>;
}

/// Detect all stats backends compiled in for this platform
pub fn detect_stats_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(target_os = "linux")]
    {
        backends.push(BackendInfo {
            name: "netdev",
            priority: BackendPriority::Best,
            available: linux::NetDevStats::is_available(),
        });
        backends.push(BackendInfo {
            name: "sysfs",
            priority: BackendPriority::Better,
            available: linux::SysfsStats::is_available(),
        });
        backends.push(BackendInfo {
            name: "procfs",
            priority: BackendPriority::Good,
            available: linux::ProcfsStats::is_available(),
        });
    }

    #[cfg(target_os = "freebsd")]
    {
        backends.push(BackendInfo {
            name: "ifmib",
            priority: BackendPriority::Best,
            available: freebsd::IfmibStats::is_available(),
        });
    }

    backends.push(BackendInfo {
        name: "kstat",
        priority: BackendPriority::Best,
        available: kstat::KstatStats::is_available(),
    });

    backends.push(BackendInfo {
        name: "sysinfo",
        priority: BackendPriority::Fallback,
        available: sysinfo::SysinfoStats::is_available(),
    });

    backends
}

/// Open a stats source for `interface`
///
/// With a preference, exactly that backend is opened. Otherwise available
/// backends are tried best-first and the first one that opens wins, so a
/// `/proc/net/dev` without byte columns falls through to the next backend.
pub fn select_stats_source(
    preference: Option<&str>,
    interface: &str,
) -> Result<Box<dyn StatsSource>> {
    if let Some(name) = preference {
        return create_stats_source(name, interface);
    }

    let mut candidates: Vec<BackendInfo> = detect_stats_backends()
        .into_iter()
        .filter(|b| b.available)
        .collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut last_error = None;
    for info in candidates {
        match create_stats_source(info.name, interface) {
            Ok(source) => {
                log::info!(
                    "Using {} stats backend ({:?}) for {}",
                    source.name(),
                    source.priority(),
                    interface
                );
                return Ok(source);
            }
            Err(e) => {
                log::warn!("Stats backend {} failed to open: {}", info.name, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| MonitorError::unavailable("stats", "no stats backend available")))
}

/// Name of the backend auto-selection would try first
pub fn preferred_stats_backend() -> Option<&'static str> {
    best_available(&detect_stats_backends())
}

/// Create a stats source by name
fn create_stats_source(name: &str, interface: &str) -> Result<Box<dyn StatsSource>> {
    match name {
        #[cfg(target_os = "linux")]
        "netdev" => Ok(Box::new(linux::NetDevStats::open()?)),
        #[cfg(target_os = "linux")]
        "sysfs" => Ok(Box::new(linux::SysfsStats::open(interface)?)),
        #[cfg(target_os = "linux")]
        "procfs" => Ok(Box::new(linux::ProcfsStats::open()?)),

        #[cfg(target_os = "freebsd")]
        "ifmib" => Ok(Box::new(freebsd::IfmibStats::open(interface)?)),

        "kstat" => Ok(Box::new(kstat::KstatStats::open(interface)?)),
        "sysinfo" => Ok(Box::new(sysinfo::SysinfoStats::open(interface)?)),

        _ => Err(MonitorError::UnknownBackend(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_rejected() {
        let result = select_stats_source(Some("carrier-pigeon"), "eth0");
        assert!(matches!(result, Err(MonitorError::UnknownBackend(name)) if name == "carrier-pigeon"));
    }

    #[test]
    fn test_sysinfo_always_listed() {
        let backends = detect_stats_backends();
        assert!(backends.iter().any(|b| b.name == "sysinfo"));
    }
}
