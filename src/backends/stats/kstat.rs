// illumos/Solaris kstat stats backend
//
// Link statistics are published as named kstats under
// <driver>:<instance>:<interface>, e.g. e1000g:0:e1000g0. They are read with
// the kstat(1M) tool in parseable mode, one process per poll; the resolved
// selector is kept between polls.

use crate::backends::BackendPriority;
use crate::backends::stats::{CounterSample, StatsSource};
use crate::error::{MonitorError, Result};
use std::process::Command;

/// Split an interface name into its driver module and instance number
///
/// "e1000g0" is instance 0 of module "e1000g". A name without a trailing
/// number is instance 0.
pub fn split_instance(interface: &str) -> (&str, u32) {
    let module = interface.trim_end_matches(|c: char| c.is_ascii_digit());
    let instance = interface[module.len()..].parse().unwrap_or(0);
    (module, instance)
}

/// `module:instance:name` selector of an interface's link kstat
pub fn selector(interface: &str) -> String {
    let (module, instance) = split_instance(interface);
    format!("{}:{}:{}", module, instance, interface)
}

/// Pull the byte counters out of `kstat -p` output
///
/// The 64-bit counters are preferred when the driver publishes them; the
/// 32-bit ones wrap every 4 GiB.
pub fn parse_counters(output: &str) -> Option<CounterSample> {
    let mut rbytes = None;
    let mut obytes = None;
    let mut rbytes64 = None;
    let mut obytes64 = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let Some(stat) = key.rsplit(':').next() else {
            continue;
        };
        let Ok(value) = value.trim().parse::<u64>() else {
            continue;
        };

        match stat {
            "rbytes" => rbytes = Some(value),
            "obytes" => obytes = Some(value),
            "rbytes64" => rbytes64 = Some(value),
            "obytes64" => obytes64 = Some(value),
            _ => {}
        }
    }

    match (rbytes64, obytes64) {
        (Some(rx), Some(tx)) => Some(CounterSample::new(rx, tx)),
        _ => Some(CounterSample::new(rbytes?, obytes?)),
    }
}

pub struct KstatStats {
    /// Interface the cached selector belongs to, and the selector
    resolved: (String, String),
}

impl KstatStats {
    pub fn open(interface: &str) -> Result<Self> {
        if !Self::is_available() {
            return Err(MonitorError::unavailable(
                "kstat",
                "kstat is only available on illumos and Solaris",
            ));
        }
        Ok(Self {
            resolved: (interface.to_string(), selector(interface)),
        })
    }

    fn selector_for(&mut self, interface: &str) -> &str {
        if self.resolved.0 != interface {
            self.resolved = (interface.to_string(), selector(interface));
        }
        &self.resolved.1
    }
}

impl StatsSource for KstatStats {
    fn name(&self) -> &'static str {
        "kstat"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Best
    }

    fn is_available() -> bool {
        cfg!(any(target_os = "illumos", target_os = "solaris"))
            && Command::new("kstat").arg("-p").arg("unix:0:system_misc:ncpus").output().is_ok()
    }

    fn sample(&mut self, interface: &str) -> Result<CounterSample> {
        let selector = self.selector_for(interface);

        let output = Command::new("kstat").arg("-p").arg(selector).output()?;
        if !output.status.success() {
            log::debug!("kstat {} exited with {}", selector, output.status);
            return Err(MonitorError::lookup_failed("kstat", interface));
        }

        parse_counters(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| MonitorError::lookup_failed("kstat", interface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_instance() {
        assert_eq!(split_instance("e1000g0"), ("e1000g", 0));
        assert_eq!(split_instance("hme12"), ("hme", 12));
        assert_eq!(split_instance("lo"), ("lo", 0));
    }

    #[test]
    fn test_selector() {
        assert_eq!(selector("e1000g0"), "e1000g:0:e1000g0");
        assert_eq!(selector("hme12"), "hme:12:hme12");
    }

    #[test]
    fn test_selector_cached_per_interface() {
        let mut stats = KstatStats {
            resolved: ("e1000g0".to_string(), selector("e1000g0")),
        };
        assert_eq!(stats.selector_for("e1000g0"), "e1000g:0:e1000g0");
        assert_eq!(stats.selector_for("bge1"), "bge:1:bge1");
        assert_eq!(stats.resolved.0, "bge1");
    }

    #[test]
    fn test_parse_32bit_counters() {
        let output = "hme:0:hme0:ipackets\t10\nhme:0:hme0:obytes\t2048\nhme:0:hme0:rbytes\t1024\n";
        assert_eq!(parse_counters(output), Some(CounterSample::new(1024, 2048)));
    }

    #[test]
    fn test_prefers_64bit_counters() {
        let output = "e1000g:0:e1000g0:rbytes\t5\n\
                      e1000g:0:e1000g0:obytes\t6\n\
                      e1000g:0:e1000g0:rbytes64\t5000000000\n\
                      e1000g:0:e1000g0:obytes64\t6000000000\n";
        assert_eq!(
            parse_counters(output),
            Some(CounterSample::new(5_000_000_000, 6_000_000_000))
        );
    }

    #[test]
    fn test_missing_counters() {
        assert_eq!(parse_counters("hme:0:hme0:rbytes\t1024\n"), None);
        assert_eq!(parse_counters(""), None);
    }
}
