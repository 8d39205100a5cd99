// sysfs stats backend
//
// Walks the kernel ifindex table and reads each interface's
// /sys/class/net/<name>/statistics counters. The index of the monitored
// interface is cached between polls.

use crate::backends::BackendPriority;
use crate::backends::stats::indexed::{CounterTable, IndexCache, TableRow};
use crate::backends::stats::{CounterSample, StatsSource};
use crate::error::{MonitorError, Result};
use std::ffi::CStr;
use std::io;
use std::path::{Path, PathBuf};

const SYS_CLASS_NET: &str = "/sys/class/net";

fn index_to_name(index: u32) -> Option<String> {
    let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
    // SAFETY: buf has the IF_NAMESIZE bytes if_indextoname writes at most
    let ptr = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
    if ptr.is_null() {
        return None;
    }
    // SAFETY: on success buf holds a NUL-terminated name
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Some(name.to_string_lossy().into_owned())
}

fn read_counter(path: &Path) -> io::Result<u64> {
    let text = std::fs::read_to_string(path)?;
    text.trim().parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {}", path.display(), e),
        )
    })
}

/// The ifindex table, with counters read from sysfs
struct SysfsTable {
    root: PathBuf,
}

impl SysfsTable {
    fn counters(&self, name: &str) -> io::Result<CounterSample> {
        let statistics = self.root.join(name).join("statistics");
        Ok(CounterSample::new(
            read_counter(&statistics.join("rx_bytes"))?,
            read_counter(&statistics.join("tx_bytes"))?,
        ))
    }
}

impl CounterTable for SysfsTable {
    fn row_count(&self) -> Result<u32> {
        let interfaces = nix::net::if_::if_nameindex().map_err(io::Error::from)?;
        Ok(interfaces.iter().map(|i| i.index()).max().unwrap_or(0))
    }

    fn row(&self, index: u32) -> Result<Option<TableRow>> {
        let Some(name) = index_to_name(index) else {
            return Ok(None);
        };

        match self.counters(&name) {
            Ok(counters) => Ok(Some(TableRow { name, counters })),
            // Gone between the two lookups
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Stats backend over the ifindex table and sysfs
pub struct SysfsStats {
    table: SysfsTable,
    cache: IndexCache,
}

impl SysfsStats {
    pub fn open(interface: &str) -> Result<Self> {
        let root = PathBuf::from(SYS_CLASS_NET);
        if !root.is_dir() {
            return Err(MonitorError::unavailable(
                "sysfs",
                format!("{} not mounted", SYS_CLASS_NET),
            ));
        }

        let cache = match nix::net::if_::if_nametoindex(interface) {
            Ok(index) => IndexCache::at(index),
            Err(_) => IndexCache::default(),
        };

        Ok(Self {
            table: SysfsTable { root },
            cache,
        })
    }
}

impl StatsSource for SysfsStats {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Better
    }

    fn is_available() -> bool {
        Path::new(SYS_CLASS_NET).is_dir()
    }

    fn sample(&mut self, interface: &str) -> Result<CounterSample> {
        self.cache
            .lookup(&self.table, interface)?
            .ok_or_else(|| MonitorError::lookup_failed("sysfs", interface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_statistics(root: &Path, name: &str, rx: &str, tx: &str) {
        let dir = root.join(name).join("statistics");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("rx_bytes"), rx).unwrap();
        std::fs::write(dir.join("tx_bytes"), tx).unwrap();
    }

    #[test]
    fn test_counters_from_statistics_dir() {
        let root = tempfile::tempdir().unwrap();
        write_statistics(root.path(), "eth0", "123456\n", "654321\n");

        let table = SysfsTable {
            root: root.path().to_path_buf(),
        };
        assert_eq!(
            table.counters("eth0").unwrap(),
            CounterSample::new(123456, 654321)
        );
    }

    #[test]
    fn test_counters_missing_interface() {
        let root = tempfile::tempdir().unwrap();
        let table = SysfsTable {
            root: root.path().to_path_buf(),
        };

        let err = table.counters("eth9").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_counters_garbage() {
        let root = tempfile::tempdir().unwrap();
        write_statistics(root.path(), "eth0", "lots\n", "0\n");
        let table = SysfsTable {
            root: root.path().to_path_buf(),
        };

        let err = table.counters("eth0").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_index_zero_has_no_name() {
        assert_eq!(index_to_name(0), None);
    }
}
