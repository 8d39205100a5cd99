// Backend trait definitions and core types

pub mod interface;
pub mod stats;

/// Backend priority ranking (higher = better)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackendPriority {
    Fallback = 1, // Works everywhere but coarse (sysinfo, pnet)
    Good = 2,     // Solid implementation (procfs crate, getifaddrs)
    Better = 3,   // Cached kernel index lookups (sysfs)
    Best = 4,     // Native counter interfaces (/proc/net/dev, ifmib, kstat, SIOCGIFCONF)
}

/// Backend metadata for selection and `--list-backends`
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub name: &'static str,
    pub priority: BackendPriority,
    pub available: bool,
}

/// Pick the name of the best available backend from a detection list
pub(crate) fn best_available(backends: &[BackendInfo]) -> Option<&'static str> {
    backends
        .iter()
        .filter(|b| b.available)
        .max_by_key(|b| b.priority)
        .map(|b| b.name)
}
