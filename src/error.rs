use thiserror::Error;

/// Errors raised by the statistics sources and interface enumerators.
///
/// Per-poll failures (`LookupFailed`) are absorbed by the monitor and only
/// show up as an unknown interface status; the rest are reported to the
/// caller.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{backend} backend unavailable: {reason}")]
    Unavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("{backend} backend has no counters for interface {interface}")]
    LookupFailed {
        backend: &'static str,
        interface: String,
    },

    #[error("cannot list interfaces with {backend}: {source}")]
    EnumerationFailed {
        backend: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("no network interfaces available")]
    NoInterfaces,

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MonitorError {
    pub fn unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        MonitorError::Unavailable {
            backend,
            reason: reason.into(),
        }
    }

    pub fn lookup_failed(backend: &'static str, interface: &str) -> Self {
        MonitorError::LookupFailed {
            backend,
            interface: interface.to_string(),
        }
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
