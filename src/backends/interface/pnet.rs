// pnet_datalink interface enumerator

use super::{InterfaceEnumerator, InterfaceFlags, InterfaceRecord};
use crate::backends::BackendPriority;
use crate::error::Result;

pub struct PnetEnumerator;

impl PnetEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceEnumerator for PnetEnumerator {
    fn name(&self) -> &'static str {
        "pnet"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Fallback
    }

    fn is_available() -> bool {
        true
    }

    fn list(&self) -> Result<Vec<InterfaceRecord>> {
        Ok(pnet_datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let flags = InterfaceFlags {
                    up: iface.is_up(),
                    loopback: iface.is_loopback(),
                };
                InterfaceRecord::new(iface.name, Some(flags))
            })
            .collect())
    }
}
