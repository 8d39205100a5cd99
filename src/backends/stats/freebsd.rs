// FreeBSD ifmib stats backend
//
// net.link.generic.ifdata.<row>.general holds a struct ifmibdata per
// interface row. Rows are addressed by ifindex; the row of the monitored
// interface is cached and re-resolved by name when it stops matching.

use crate::backends::BackendPriority;
use crate::backends::stats::indexed::{CounterTable, IndexCache, TableRow};
use crate::backends::stats::{CounterSample, StatsSource};
use crate::error::{MonitorError, Result};
use std::ffi::CStr;
use std::io;

// <net/if_mib.h>
const NETLINK_GENERIC: libc::c_int = 0;
const IFMIB_IFDATA: libc::c_int = 2;
const IFDATA_GENERAL: libc::c_int = 1;

const IFCOUNT_SYSCTL: &CStr = c"net.link.generic.system.ifcount";

#[repr(C)]
#[allow(dead_code)]
struct IfmibData {
    ifmd_name: [libc::c_char; libc::IFNAMSIZ],
    ifmd_pcount: libc::c_int,
    ifmd_flags: libc::c_int,
    ifmd_snd_len: libc::c_int,
    ifmd_snd_maxlen: libc::c_int,
    ifmd_snd_drops: libc::c_int,
    ifmd_filler: [libc::c_int; 4],
    ifmd_data: libc::if_data,
}

struct IfmibTable;

impl CounterTable for IfmibTable {
    fn row_count(&self) -> Result<u32> {
        let mut count: libc::c_int = 0;
        let mut len = std::mem::size_of::<libc::c_int>();
        // SAFETY: count and len describe a writable c_int
        let rc = unsafe {
            libc::sysctlbyname(
                IFCOUNT_SYSCTL.as_ptr(),
                (&mut count as *mut libc::c_int).cast(),
                &mut len,
                std::ptr::null(),
                0,
            )
        };
        if rc == -1 {
            return Err(MonitorError::unavailable(
                "ifmib",
                format!(
                    "cannot retrieve the interface count: {}",
                    io::Error::last_os_error()
                ),
            ));
        }
        Ok(count.max(0) as u32)
    }

    fn row(&self, index: u32) -> Result<Option<TableRow>> {
        let mib = [
            libc::CTL_NET,
            libc::PF_LINK,
            NETLINK_GENERIC,
            IFMIB_IFDATA,
            index as libc::c_int,
            IFDATA_GENERAL,
        ];
        let mut data = std::mem::MaybeUninit::<IfmibData>::zeroed();
        let mut len = std::mem::size_of::<IfmibData>();

        // SAFETY: data is a zeroed IfmibData of len bytes
        let rc = unsafe {
            libc::sysctl(
                mib.as_ptr(),
                mib.len() as libc::c_uint,
                data.as_mut_ptr().cast(),
                &mut len,
                std::ptr::null(),
                0,
            )
        };
        if rc == -1 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::ENOENT) => Ok(None),
                _ => Err(err.into()),
            };
        }

        // SAFETY: zero-initialized and then filled in by the kernel
        let data = unsafe { data.assume_init() };
        // SAFETY: the kernel NUL-terminates ifmd_name; the zeroed tail
        // terminates it otherwise
        let name = unsafe { CStr::from_ptr(data.ifmd_name.as_ptr()) };

        Ok(Some(TableRow {
            name: name.to_string_lossy().into_owned(),
            counters: CounterSample::new(data.ifmd_data.ifi_ibytes, data.ifmd_data.ifi_obytes),
        }))
    }
}

/// Stats backend over the ifmib sysctl tree
pub struct IfmibStats {
    cache: IndexCache,
}

impl IfmibStats {
    pub fn open(interface: &str) -> Result<Self> {
        let table = IfmibTable;
        table.row_count()?;

        let cache = match nix::net::if_::if_nametoindex(interface) {
            Ok(index) => IndexCache::at(index),
            Err(_) => IndexCache::default(),
        };
        Ok(Self { cache })
    }
}

impl StatsSource for IfmibStats {
    fn name(&self) -> &'static str {
        "ifmib"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Best
    }

    fn is_available() -> bool {
        IfmibTable.row_count().is_ok()
    }

    fn sample(&mut self, interface: &str) -> Result<CounterSample> {
        self.cache
            .lookup(&IfmibTable, interface)?
            .ok_or_else(|| MonitorError::lookup_failed("ifmib", interface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_row() {
        let mut cache = IndexCache::default();
        let sample = cache.lookup(&IfmibTable, "lo0").unwrap();
        assert!(sample.is_some());
    }
}
