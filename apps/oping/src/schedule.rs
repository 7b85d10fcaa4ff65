use crate::console::Console;
use crate::control::ControlState;
use crate::netenv::InterfaceSource;
use crate::report::{self, LineContext};
use chrono::{Local, SecondsFormat, Utc};
use oping_model::{ProbeMode, ProbeResult};
use oping_probe::Prober;
use oping_stats::Aggregator;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub type SharedStats = Arc<Mutex<Aggregator>>;

/// Longest uninterrupted sleep; shutdown is noticed within this.
const NAP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub targets: Vec<String>,
    pub mode: ProbeMode,
    /// Passes before the run ends or takes its post-limit sleep; 0 is unbounded.
    pub count: u32,
    pub post_limit_sleep: Duration,
    pub timeout: Duration,
    pub base_delay: Duration,
    pub pause_poll: Duration,
    pub lost_threshold_ms: f64,
    pub json_report: bool,
}

impl ScheduleSettings {
    pub fn new(targets: Vec<String>, mode: ProbeMode) -> Self {
        Self {
            targets,
            mode,
            count: 0,
            post_limit_sleep: Duration::ZERO,
            timeout: Duration::from_secs(1),
            base_delay: Duration::from_secs(1),
            pause_poll: Duration::from_millis(100),
            lost_threshold_ms: 200.0,
            json_report: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolvingEnvironment,
    Probing,
    Sleeping,
    Paused,
    Draining,
    Terminated,
}

/// Drives probe cycles until shutdown or the count limit, then prints the
/// final report.
pub struct Scheduler<P, E> {
    settings: ScheduleSettings,
    prober: P,
    interfaces: E,
    control: Arc<ControlState>,
    stats: SharedStats,
    console: Console,
    pass: u32,
    interface: String,
    /// Index of the next target to probe in the current cycle.
    cursor: usize,
    cycles: u64,
}

impl<P: Prober, E: InterfaceSource> Scheduler<P, E> {
    pub fn new(
        settings: ScheduleSettings,
        prober: P,
        interfaces: E,
        control: Arc<ControlState>,
        stats: SharedStats,
        console: Console,
    ) -> Self {
        Self {
            settings,
            prober,
            interfaces,
            control,
            stats,
            console,
            pass: 1,
            interface: report::interface_label(None),
            cursor: 0,
            cycles: 0,
        }
    }

    /// Runs to completion and returns the number of full cycles probed.
    pub fn run(&mut self) -> u64 {
        let mut phase = Phase::ResolvingEnvironment;
        while phase != Phase::Terminated {
            let next = self.step(phase);
            if next != phase {
                debug!(from = ?phase, to = ?next, pass = self.pass, "phase change");
            }
            phase = next;
        }
        self.cycles
    }

    fn step(&mut self, phase: Phase) -> Phase {
        match phase {
            Phase::ResolvingEnvironment => self.resolve_environment(),
            Phase::Probing => self.probe_cycle(),
            Phase::Sleeping => self.sleep_between_cycles(),
            Phase::Paused => self.wait_paused(),
            Phase::Draining => self.drain(),
            Phase::Terminated => Phase::Terminated,
        }
    }

    /// Shutdown and pause take effect at every phase boundary and between targets.
    fn interruption(&self) -> Option<Phase> {
        if !self.control.running() {
            Some(Phase::Draining)
        } else if self.control.paused() {
            Some(Phase::Paused)
        } else {
            None
        }
    }

    fn resolve_environment(&mut self) -> Phase {
        if let Some(next) = self.interruption() {
            return next;
        }
        self.interface = report::interface_label(self.interfaces.discover().as_ref());
        Phase::Probing
    }

    /// Probes the remaining targets of the cycle. An interrupted cycle
    /// resumes at the first target it has not probed yet.
    fn probe_cycle(&mut self) -> Phase {
        while let Some(target) = self.settings.targets.get(self.cursor) {
            if let Some(next) = self.interruption() {
                return next;
            }
            let results = self.prober.probe(target, self.settings.timeout);
            {
                let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
                for result in &results {
                    stats.record(result);
                }
            }
            for result in &results {
                self.emit(result);
            }
            self.cursor += 1;
        }
        self.cursor = 0;
        self.cycles += 1;
        self.after_cycle()
    }

    fn emit(&self, result: &ProbeResult) {
        if !report::should_emit(
            result,
            self.control.lost_only(),
            self.settings.lost_threshold_ms,
        ) {
            return;
        }
        let ctx = LineContext {
            interface: &self.interface,
            pass: self.pass,
            timeout: self.settings.timeout,
            mode: self.settings.mode,
        };
        let mut line = report::result_line(result, &ctx);
        if self.control.verbose() {
            line.push_str(&report::verbose_suffix(
                result,
                &ctx,
                Local::now().naive_local(),
            ));
        }
        self.console.line(line);
    }

    fn after_cycle(&mut self) -> Phase {
        let count = self.settings.count;
        if count == 0 || self.pass < count {
            return Phase::Sleeping;
        }
        let rest = self.settings.post_limit_sleep;
        if rest.is_zero() {
            return Phase::Draining;
        }
        self.console.line(format!(
            "Completed {count} pings, sleeping for {} seconds...",
            rest.as_secs()
        ));
        if !nap(&self.control, rest) {
            return Phase::Draining;
        }
        self.pass = 1;
        Phase::ResolvingEnvironment
    }

    fn sleep_between_cycles(&mut self) -> Phase {
        let extra = Duration::from_secs(u64::from(self.control.extra_sleep()));
        if !nap(&self.control, extra + self.settings.base_delay) {
            return Phase::Draining;
        }
        self.pass += 1;
        Phase::ResolvingEnvironment
    }

    fn wait_paused(&self) -> Phase {
        if !self.control.running() {
            return Phase::Draining;
        }
        if !self.control.paused() {
            return Phase::ResolvingEnvironment;
        }
        thread::sleep(self.settings.pause_poll);
        Phase::Paused
    }

    fn drain(&self) -> Phase {
        if !self.control.running() {
            self.console.line("Stopping ping...");
        }
        let rows = self
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .report();
        if self.settings.json_report {
            let finished = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
            match report::stats_json(&rows, &finished) {
                Ok(text) => self.console.line(text),
                Err(err) => warn!(error = %err, "failed to encode statistics"),
            }
        } else {
            self.console.lines(report::stats_table(&rows));
        }
        Phase::Terminated
    }
}

/// Sleeps for `total` in short slices. Returns false as soon as the session
/// stops running.
pub fn nap(control: &ControlState, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !control.running() {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(NAP_SLICE));
    }
}
