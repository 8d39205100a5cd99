mod backends;
mod config;
mod error;
mod history;
mod keybindings;
mod monitor;
mod rate;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::backends::BackendInfo;
use crate::backends::interface::{detect_enumerators, preferred_enumerator, select_enumerator};
use crate::backends::stats::{detect_stats_backends, preferred_stats_backend, select_stats_source};
use crate::config::{Config, DisplayUnit};
use crate::monitor::{Frontend, Session};
use crate::ui::{DisplaySettings, PlainFrontend, TuiFrontend};

/// netload - network interface throughput monitor
#[derive(Parser, Debug)]
#[command(name = "netload")]
#[command(version)]
#[command(about = "Live throughput and history of one network interface at a time", long_about = None)]
struct Args {
    /// Seconds between counter reads
    #[arg(short = 'u', long = "update", value_name = "SECS")]
    interval: Option<u64>,

    /// Display updates per interval, easing towards each new reading
    #[arg(short = 's', long = "smooth", value_name = "STEPS")]
    smooth: Option<u32>,

    /// Interface to monitor (default: first non-loopback)
    #[arg(short = 'i', long, value_name = "NAME")]
    interface: Option<String>,

    /// Never switch away from the starting interface
    #[arg(short = 'k', long)]
    keep_interface: bool,

    /// Show bytes/s instead of bits/s
    #[arg(short = 'b', long)]
    bytes: bool,

    /// Highlight throughput above this many kbit/s (kB/s with --bytes)
    #[arg(short = 'a', long, value_name = "KILO")]
    alarm: Option<u64>,

    /// Don't show the interface name
    #[arg(short = 'n', long)]
    no_ifname: bool,

    /// Counter backend to use
    #[arg(long, value_name = "BACKEND")]
    stats_backend: Option<String>,

    /// Interface enumerator to use
    #[arg(long, value_name = "BACKEND")]
    enumerator: Option<String>,

    /// Number of bars in the history graph
    #[arg(long, value_name = "N")]
    slots: Option<usize>,

    /// Height of the history graph in units
    #[arg(long, value_name = "UNITS")]
    height: Option<u64>,

    /// Print one line per interval instead of the TUI
    #[arg(long)]
    plain: bool,

    /// Stop after this many lines (plain mode)
    #[arg(long, value_name = "N", requires = "plain")]
    samples: Option<u64>,

    /// List all available backends and exit
    #[arg(long)]
    list_backends: bool,

    /// Config file to read (default: <config dir>/netload/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

impl Args {
    /// Layer command line flags over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(smooth) = self.smooth {
            config.smoothing_steps = smooth;
        }
        if let Some(interface) = &self.interface {
            config.interface = Some(interface.clone());
        }
        if self.keep_interface {
            config.keep_interface = true;
        }
        if self.bytes {
            config.display_unit = DisplayUnit::Bytes;
        }
        if let Some(alarm) = self.alarm {
            config.alarm_threshold = Some(alarm);
        }
        if self.no_ifname {
            config.show_interface_name = false;
        }
        if let Some(backend) = &self.stats_backend {
            config.stats_backend = Some(backend.clone());
        }
        if let Some(backend) = &self.enumerator {
            config.enumerator_backend = Some(backend.clone());
        }
        if let Some(slots) = self.slots {
            config.history_slots = slots;
        }
        if let Some(height) = self.height {
            config.history_height = height;
        }
    }
}

fn print_backend_table(title: &str, backends: &[BackendInfo], preferred: Option<&str>) {
    println!("{}:", title);
    if backends.is_empty() {
        println!("  (none compiled in)");
        return;
    }

    for backend in backends {
        let status = if backend.available {
            "✅ available"
        } else {
            "❌ unavailable"
        };
        let marker = if Some(backend.name) == preferred {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {:12} [priority: {:?}] {}{}",
            backend.name, backend.priority, status, marker
        );
    }
}

fn print_available_backends() {
    println!("netload v{} - Available Backends\n", env!("CARGO_PKG_VERSION"));

    print_backend_table(
        "Stats Backends",
        &detect_stats_backends(),
        preferred_stats_backend(),
    );
    println!();
    print_backend_table(
        "Interface Enumerators",
        &detect_enumerators(),
        preferred_enumerator(),
    );

    println!();
    println!("Usage:");
    println!("  netload [--stats-backend <name>] [--enumerator <name>]");
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_ok() {
        pretty_env_logger::formatted_builder()
            .parse_default_env()
            .init();
    }

    let args = Args::parse();

    if args.list_backends {
        print_available_backends();
        return Ok(());
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load(&config_path)?;
    args.apply(&mut config);
    config.validate()?;

    if args.save_config {
        config.save(&config_path)?;
    }

    let enumerator = select_enumerator(config.enumerator_backend.as_deref())
        .context("Cannot list network interfaces")?;

    let session = Session::new(
        config.monitor_settings(),
        config.keep_interface,
        enumerator.as_ref(),
    );
    let interface = session
        .initial_interface(config.interface.as_deref())
        .context("Cannot pick an interface to monitor")?;

    let display = DisplaySettings {
        unit: config.display_unit,
        alarm_threshold: config.alarm_bytes_per_sec(),
        show_interface_name: config.show_interface_name,
    };

    let stats_backend = config.stats_backend.clone();
    let mut open_source =
        move |name: &str| select_stats_source(stats_backend.as_deref(), name);

    let mut frontend: Box<dyn Frontend> = if args.plain {
        Box::new(PlainFrontend::new(std::io::stdout(), display, args.samples))
    } else {
        Box::new(TuiFrontend::new(display)?)
    };

    let res = session.run(interface, frontend.as_mut(), &mut open_source);

    // Restore the terminal before reporting anything
    drop(frontend);

    res
}
