// getifaddrs(3) interface enumerator
//
// Reports one entry per configured address, so an interface with an IPv4
// and an IPv6 address shows up twice.

use super::{InterfaceEnumerator, InterfaceFlags, InterfaceRecord};
use crate::backends::BackendPriority;
use crate::error::{MonitorError, Result};
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags as NixFlags;

pub struct GetifaddrsEnumerator;

impl GetifaddrsEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceEnumerator for GetifaddrsEnumerator {
    fn name(&self) -> &'static str {
        "getifaddrs"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Good
    }

    fn is_available() -> bool {
        getifaddrs().is_ok()
    }

    fn list(&self) -> Result<Vec<InterfaceRecord>> {
        let addrs = getifaddrs().map_err(|errno| MonitorError::EnumerationFailed {
            backend: "getifaddrs",
            source: errno.into(),
        })?;

        Ok(addrs
            .map(|addr| {
                let flags = InterfaceFlags {
                    up: addr.flags.contains(NixFlags::IFF_UP),
                    loopback: addr.flags.contains(NixFlags::IFF_LOOPBACK),
                };
                InterfaceRecord::new(addr.interface_name, Some(flags))
            })
            .collect())
    }
}
