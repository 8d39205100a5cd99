// Linux stats backends

mod netdev;
mod procfs;
mod sysfs;

pub use netdev::NetDevStats;
pub use procfs::ProcfsStats;
pub use sysfs::SysfsStats;
