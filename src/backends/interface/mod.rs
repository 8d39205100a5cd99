// Interface enumeration backends
//
// Lists the interfaces configured on the host so the monitor can pick a
// default and cycle through them, and reports up/loopback flags.

use super::{BackendInfo, BackendPriority, best_available};
use crate::error::{MonitorError, Result};

#[cfg(unix)]
pub mod getifaddrs;

#[cfg(target_os = "linux")]
pub mod ifconf;

#[cfg(feature = "enumerate-pnet")]
pub mod pnet;

/// Administrative flags of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceFlags {
    pub up: bool,
    pub loopback: bool,
}

/// One entry of an interface listing
///
/// An interface may be listed once per configured address; `flags` is
/// `None` when they could not be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub flags: Option<InterfaceFlags>,
}

impl InterfaceRecord {
    pub fn new(name: impl Into<String>, flags: Option<InterfaceFlags>) -> Self {
        Self {
            name: name.into(),
            flags,
        }
    }

    fn is_loopback(&self) -> bool {
        self.flags.is_some_and(|f| f.loopback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterfaceStatus {
    /// Could not be queried at all
    #[default]
    Unknown,
    Up,
    Down,
}

impl InterfaceStatus {
    pub fn from_flags(flags: Option<InterfaceFlags>) -> Self {
        match flags {
            None => InterfaceStatus::Unknown,
            Some(f) if f.up => InterfaceStatus::Up,
            Some(_) => InterfaceStatus::Down,
        }
    }
}

/// Interface enumerator trait
pub trait InterfaceEnumerator: Send {
    /// Backend name (e.g., "ifconf", "getifaddrs")
    fn name(&self) -> &'static str;

    /// Backend priority for auto-selection
    fn priority(&self) -> BackendPriority;

    /// Check if this backend is available on the current system
    fn is_available() -> bool
    where
        Self: Sized;

    /// All interfaces in kernel order
    fn list(&self) -> Result<Vec<InterfaceRecord>>;

    /// Flags of one interface, `None` if it cannot be queried
    fn flags_of(&self, name: &str) -> Option<InterfaceFlags> {
        self.list()
            .ok()?
            .into_iter()
            .find(|record| record.name == name)
            .and_then(|record| record.flags)
    }

    /// The interface to monitor after `current` (see `select_next`)
    fn next_after(&self, current: Option<&str>) -> Result<Option<String>> {
        Ok(select_next(&self.list()?, current))
    }
}

/// Pick the interface to monitor next
///
/// Without a current interface this is the first non-loopback entry, or the
/// first entry when everything is loopback. With one, the list is walked
/// forward from it (wrapping) to the first entry with a different name that
/// isn't loopback; if there is none the current interface is kept. A current
/// interface that has disappeared is treated like no current interface.
pub fn select_next(interfaces: &[InterfaceRecord], current: Option<&str>) -> Option<String> {
    if let Some(current) = current {
        if let Some(pos) = interfaces.iter().position(|r| r.name == current) {
            let len = interfaces.len();
            let next = (1..len)
                .map(|offset| &interfaces[(pos + offset) % len])
                .find(|r| r.name != current && !r.is_loopback());

            return Some(next.map_or_else(|| current.to_string(), |r| r.name.clone()));
        }
    }

    interfaces
        .iter()
        .find(|r| !r.is_loopback())
        .or_else(|| interfaces.first())
        .map(|r| r.name.clone())
}

/// Detect all enumerators compiled in for this platform
pub fn detect_enumerators() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(target_os = "linux")]
    backends.push(BackendInfo {
        name: "ifconf",
        priority: BackendPriority::Best,
        available: ifconf::IfconfEnumerator::is_available(),
    });

    #[cfg(unix)]
    backends.push(BackendInfo {
        name: "getifaddrs",
        priority: BackendPriority::Good,
        available: getifaddrs::GetifaddrsEnumerator::is_available(),
    });

    #[cfg(feature = "enumerate-pnet")]
    backends.push(BackendInfo {
        name: "pnet",
        priority: BackendPriority::Fallback,
        available: pnet::PnetEnumerator::is_available(),
    });

    backends
}

/// Pick an enumerator by preference, or the best available one
pub fn select_enumerator(preference: Option<&str>) -> Result<Box<dyn InterfaceEnumerator>> {
    let name = match preference {
        Some(name) => name,
        None => best_available(&detect_enumerators())
            .ok_or_else(|| MonitorError::unavailable("enumerator", "no enumerator available"))?,
    };

    let enumerator = create_enumerator(name)?;
    log::info!(
        "Using {} interface enumerator ({:?})",
        enumerator.name(),
        enumerator.priority()
    );
    Ok(enumerator)
}

/// Name of the enumerator auto-selection would pick
pub fn preferred_enumerator() -> Option<&'static str> {
    best_available(&detect_enumerators())
}

/// Create an enumerator by name
fn create_enumerator(name: &str) -> Result<Box<dyn InterfaceEnumerator>> {
    match name {
        #[cfg(target_os = "linux")]
        "ifconf" => Ok(Box::new(ifconf::IfconfEnumerator::new())),
        #[cfg(unix)]
        "getifaddrs" => Ok(Box::new(getifaddrs::GetifaddrsEnumerator::new())),
        #[cfg(feature = "enumerate-pnet")]
        "pnet" => Ok(Box::new(pnet::PnetEnumerator::new())),
        _ => Err(MonitorError::UnknownBackend(name.to_string())),
    }
}
