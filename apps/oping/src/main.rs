mod console;
mod control;
mod keys;
mod netenv;
mod ports;
mod report;
mod schedule;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use console::{Console, RawMode};
use control::ControlState;
use netenv::SystemInterfaces;
use oping_model::ProbeMode;
use oping_probe::{ensure_raw_socket_access, EchoMatch, ProbeError, Strategy};
use oping_stats::Aggregator;
use schedule::{ScheduleSettings, Scheduler, SharedStats};
use std::io::{self, IsTerminal};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter, fmt, Layer};

#[derive(Parser)]
#[command(
    name = "oping",
    version,
    about = "Interactive ICMP / TCP connect ping. Only probe hosts you are permitted to test."
)]
struct Cli {
    #[arg(required = true)]
    hosts: Vec<String>,

    /// Passes before stopping (or sleeping, with --sleep); 0 runs until quit.
    #[arg(long, default_value_t = 0)]
    count: u32,

    /// Seconds to sleep after --count passes before starting over.
    #[arg(long, default_value_t = 0)]
    sleep: u64,

    /// Per-probe timeout in seconds.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    #[arg(long = "type", value_enum, default_value_t = ProbeKind::Icmp)]
    probe_type: ProbeKind,

    /// Port number or service name for syn probes; repeatable.
    #[arg(long = "port")]
    ports: Vec<String>,

    /// With --lost-only, replies slower than this are still shown.
    #[arg(long, default_value_t = 200.0)]
    lost_threshold_ms: f64,

    /// Only accept echo replies matching our identifier and sequence.
    #[arg(long)]
    strict_match: bool,

    /// Print the final statistics as JSON.
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    lost_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProbeKind {
    Icmp,
    Syn,
}

impl From<ProbeKind> for ProbeMode {
    fn from(kind: ProbeKind) -> Self {
        match kind {
            ProbeKind::Icmp => ProbeMode::Icmp,
            ProbeKind::Syn => ProbeMode::Syn,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let control = Arc::new(
        ControlState::new()
            .with_verbose(cli.verbose)
            .with_lost_only(cli.lost_only),
    );
    let console = Console::stdout();
    init_logging(&console, &control);

    let mode = ProbeMode::from(cli.probe_type);
    if mode == ProbeMode::Icmp {
        match ensure_raw_socket_access() {
            Ok(()) => {}
            Err(ProbeError::Privilege(_)) => {
                bail!("ICMP ping requires root privileges (raw socket access denied)")
            }
            Err(err) => return Err(err).context("failed to open raw ICMP socket"),
        }
    }

    let ports: Vec<u16> = cli.ports.iter().map(|value| ports::parse_port(value)).collect();
    let matching = if cli.strict_match {
        EchoMatch::Exact
    } else {
        EchoMatch::AnyReply
    };
    let strategy = Strategy::new(mode, ports, matching);

    let mut settings = ScheduleSettings::new(cli.hosts, mode);
    settings.count = cli.count;
    settings.post_limit_sleep = Duration::from_secs(cli.sleep);
    settings.timeout = Duration::from_secs(cli.timeout);
    settings.lost_threshold_ms = cli.lost_threshold_ms;
    settings.json_report = cli.json;
    info!(
        mode = %mode,
        targets = settings.targets.len(),
        count = settings.count,
        "starting"
    );

    let stats: SharedStats = Arc::new(Mutex::new(Aggregator::new()));

    let interrupt = Arc::clone(&control);
    ctrlc::set_handler(move || interrupt.stop()).context("failed to install Ctrl-C handler")?;

    let raw_mode = if io::stdin().is_terminal() {
        match RawMode::enable(&console) {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(error = %err, "keyboard commands unavailable");
                None
            }
        }
    } else {
        None
    };
    let keyboard = raw_mode.as_ref().map(|_| {
        keys::spawn_terminal_loop(Arc::clone(&control), Arc::clone(&stats), console.clone())
    });

    console.line("Press 'h' for help with keyboard commands");
    let mut scheduler = Scheduler::new(
        settings,
        strategy,
        SystemInterfaces,
        Arc::clone(&control),
        stats,
        console.clone(),
    );
    scheduler.run();

    control.stop();
    if let Some(handle) = keyboard {
        if handle.join().is_err() {
            warn!("keyboard thread panicked");
        }
    }
    drop(raw_mode);
    Ok(())
}

/// Logs go to stderr. Debug events pass only while debug mode is on.
fn init_logging(console: &Console, control: &Arc<ControlState>) {
    let writer = console.sibling(io::stderr());
    let control = Arc::clone(control);
    let gate = filter::filter_fn(move |meta| *meta.level() <= Level::INFO || control.debug());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(move || writer.clone())
                .with_filter(gate),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["oping", "example.net"]).unwrap();
        assert_eq!(cli.hosts, vec!["example.net"]);
        assert_eq!(cli.count, 0);
        assert_eq!(cli.sleep, 0);
        assert_eq!(cli.timeout, 1);
        assert_eq!(cli.probe_type, ProbeKind::Icmp);
        assert!(cli.ports.is_empty());
        assert_eq!(cli.lost_threshold_ms, 200.0);
        assert!(!cli.strict_match && !cli.json && !cli.verbose && !cli.lost_only);
    }

    #[test]
    fn syn_with_repeated_ports() {
        let cli = Cli::try_parse_from([
            "oping", "--type", "syn", "--port", "80", "--port", "https", "a", "b",
        ])
        .unwrap();
        assert_eq!(ProbeMode::from(cli.probe_type), ProbeMode::Syn);
        assert_eq!(cli.ports, vec!["80", "https"]);
        assert_eq!(cli.hosts, vec!["a", "b"]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Cli::try_parse_from(["oping"]).is_err());
        assert!(Cli::try_parse_from(["oping", "--timeout", "0", "h"]).is_err());
        assert!(Cli::try_parse_from(["oping", "--type", "udp", "h"]).is_err());
    }
}
