// Interface monitoring loop
//
// One InterfaceMonitor polls one interface: it reads the counters once per
// update interval, smooths the display in between, and records each
// interval in the history graph. The Session runs monitors one after the
// other as the user cycles through interfaces.

use crate::backends::interface::{InterfaceEnumerator, InterfaceStatus};
use crate::backends::stats::{CounterSample, StatsSource};
use crate::error::MonitorError;
use crate::history::{HistoryGraph, HistorySettings};
use crate::rate::{RateEngine, RateSample};
use anyhow::Result;
use std::time::{Duration, Instant};

/// Input from the frontend while waiting for the next deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendEvent {
    NextInterface,
    Redraw,
    Quit,
}

/// How much of the display to redraw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawScope {
    /// Only the throughput readout changed
    Throughput,
    All,
}

/// Everything a frontend needs to draw one frame
pub struct MonitorView<'a> {
    pub interface: &'a str,
    pub status: InterfaceStatus,
    /// Smoothed combined rate, bytes per second
    pub throughput: u64,
    pub history: &'a HistoryGraph,
    /// Intervals completed on this interface
    pub intervals: u64,
}

pub trait Frontend {
    /// Block until `timeout` passes (`None`) or the user does something
    fn wait(&mut self, timeout: Duration) -> Result<Option<FrontendEvent>>;

    fn draw(&mut self, view: &MonitorView<'_>, scope: DrawScope) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval_secs: u64,
    pub smoothing_steps: u32,
    pub history: HistorySettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            smoothing_steps: 1,
            history: HistorySettings::default(),
        }
    }
}

/// Why a monitor stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    NextInterface,
    Quit,
}

pub struct InterfaceMonitor {
    name: String,
    status: InterfaceStatus,
    source: Option<Box<dyn StatsSource>>,
    engine: RateEngine,
    history: HistoryGraph,
    intervals: u64,
}

impl InterfaceMonitor {
    /// Monitor `name`; without a source every poll fails and the status
    /// stays unknown
    pub fn new(
        name: impl Into<String>,
        source: Option<Box<dyn StatsSource>>,
        settings: &MonitorSettings,
    ) -> Self {
        Self {
            name: name.into(),
            status: InterfaceStatus::Unknown,
            source,
            engine: RateEngine::new(settings.smoothing_steps, settings.interval_secs),
            history: HistoryGraph::new(settings.history),
            intervals: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> InterfaceStatus {
        self.status
    }

    pub fn history(&self) -> &HistoryGraph {
        &self.history
    }

    pub fn view(&self) -> MonitorView<'_> {
        MonitorView {
            interface: &self.name,
            status: self.status,
            throughput: self.engine.displayed(),
            history: &self.history,
            intervals: self.intervals,
        }
    }

    fn poll(&mut self) -> Option<CounterSample> {
        let source = self.source.as_mut()?;
        match source.sample(&self.name) {
            Ok(sample) => Some(sample),
            Err(e) => {
                log::debug!("{} poll of {} failed: {}", source.name(), self.name, e);
                None
            }
        }
    }

    /// Refresh the status and take the baseline reading
    pub fn start(&mut self, enumerator: &dyn InterfaceEnumerator) {
        self.status = InterfaceStatus::from_flags(enumerator.flags_of(&self.name));

        let sample = self.poll();
        if sample.is_none() {
            self.status = InterfaceStatus::Unknown;
        }
        self.engine.prime(sample);
    }

    /// Close the current interval: read counters and record the rate
    pub fn complete_interval(&mut self, enumerator: &dyn InterfaceEnumerator) -> RateSample {
        self.status = InterfaceStatus::from_flags(enumerator.flags_of(&self.name));

        let sample = self.poll();
        if sample.is_none() {
            self.status = InterfaceStatus::Unknown;
        }

        let rate = self.engine.record(sample);
        self.history.push(rate);
        self.intervals += 1;
        rate
    }

    /// Monitor until the user asks for another interface or quits
    pub fn run(
        &mut self,
        frontend: &mut dyn Frontend,
        enumerator: &dyn InterfaceEnumerator,
    ) -> Result<MonitorExit> {
        self.start(enumerator);
        frontend.draw(&self.view(), DrawScope::All)?;

        let steps = self.engine.steps();
        loop {
            let interval_start = Instant::now();
            let mut step = 1;

            loop {
                // Nothing left to smooth; sleep out the interval
                if self.engine.is_settled() {
                    step = steps;
                }

                let timeout = self
                    .engine
                    .schedule()
                    .timeout(step, interval_start.elapsed());

                match frontend.wait(timeout)? {
                    None => {
                        step += 1;
                        if step > steps {
                            break;
                        }
                        self.engine.advance(step);
                        frontend.draw(&self.view(), DrawScope::Throughput)?;
                    }
                    Some(FrontendEvent::Redraw) => {
                        frontend.draw(&self.view(), DrawScope::All)?;
                    }
                    Some(FrontendEvent::NextInterface) => return Ok(MonitorExit::NextInterface),
                    Some(FrontendEvent::Quit) => return Ok(MonitorExit::Quit),
                }
            }

            self.complete_interval(enumerator);
            frontend.draw(&self.view(), DrawScope::All)?;
        }
    }
}

/// Opens a stats source for an interface name
pub type SourceFactory<'a> =
    dyn FnMut(&str) -> crate::error::Result<Box<dyn StatsSource>> + 'a;

/// Interface selection and switching across monitors
pub struct Session<'a> {
    settings: MonitorSettings,
    keep_interface: bool,
    enumerator: &'a dyn InterfaceEnumerator,
}

impl<'a> Session<'a> {
    pub fn new(
        settings: MonitorSettings,
        keep_interface: bool,
        enumerator: &'a dyn InterfaceEnumerator,
    ) -> Self {
        Self {
            settings,
            keep_interface,
            enumerator,
        }
    }

    /// Interface to start with
    ///
    /// A requested interface that cannot be queried is replaced by the
    /// default unless `keep_interface` is set.
    pub fn initial_interface(&self, requested: Option<&str>) -> crate::error::Result<String> {
        let default = self
            .enumerator
            .next_after(None)?
            .ok_or(MonitorError::NoInterfaces)?;

        let Some(requested) = requested else {
            return Ok(default);
        };

        if self.enumerator.flags_of(requested).is_none() && !self.keep_interface {
            log::warn!("Unknown interface {}; defaulting to {}", requested, default);
            return Ok(default);
        }

        Ok(requested.to_string())
    }

    /// Interface to switch to after a next-interface request
    pub fn next_interface(&self, current: &str) -> String {
        if self.keep_interface {
            return current.to_string();
        }

        match self.enumerator.next_after(Some(current)) {
            Ok(Some(next)) => next,
            Ok(None) => current.to_string(),
            Err(e) => {
                log::warn!("Cannot list interfaces, staying on {}: {}", current, e);
                current.to_string()
            }
        }
    }

    /// Monitor `interface` and its successors until the frontend quits
    pub fn run(
        &self,
        interface: String,
        frontend: &mut dyn Frontend,
        open_source: &mut SourceFactory<'_>,
    ) -> Result<()> {
        let source = open_source(&interface)?;
        log::info!("Monitoring {}", interface);
        let mut monitor = InterfaceMonitor::new(interface, Some(source), &self.settings);

        loop {
            match monitor.run(frontend, self.enumerator)? {
                MonitorExit::Quit => return Ok(()),
                MonitorExit::NextInterface => {
                    // Staying put keeps the history
                    let next = self.next_interface(monitor.name());
                    if next == monitor.name() {
                        continue;
                    }

                    log::info!("Switching from {} to {}", monitor.name(), next);

                    // Release the old handle before opening the next one
                    drop(monitor);
                    let source = match open_source(&next) {
                        Ok(source) => Some(source),
                        Err(e) => {
                            log::warn!("No statistics for {}: {}", next, e);
                            None
                        }
                    };
                    monitor = InterfaceMonitor::new(next, source, &self.settings);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendPriority;
    use crate::backends::interface::{InterfaceFlags, InterfaceRecord};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedSource {
        samples: VecDeque<Option<CounterSample>>,
    }

    impl ScriptedSource {
        fn boxed(samples: Vec<Option<(u64, u64)>>) -> Box<dyn StatsSource> {
            Box::new(Self {
                samples: samples
                    .into_iter()
                    .map(|s| s.map(|(rx, tx)| CounterSample::new(rx, tx)))
                    .collect(),
            })
        }
    }

    impl StatsSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn priority(&self) -> BackendPriority {
            BackendPriority::Fallback
        }

        fn is_available() -> bool {
            true
        }

        fn sample(&mut self, interface: &str) -> crate::error::Result<CounterSample> {
            self.samples
                .pop_front()
                .flatten()
                .ok_or_else(|| MonitorError::lookup_failed("scripted", interface))
        }
    }

    struct FakeEnumerator {
        records: Vec<InterfaceRecord>,
    }

    impl FakeEnumerator {
        fn new(names: &[&str]) -> Self {
            Self {
                records: names
                    .iter()
                    .map(|&name| {
                        InterfaceRecord::new(
                            name,
                            Some(InterfaceFlags {
                                up: true,
                                loopback: name.starts_with("lo"),
                            }),
                        )
                    })
                    .collect(),
            }
        }
    }

    impl InterfaceEnumerator for FakeEnumerator {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn priority(&self) -> BackendPriority {
            BackendPriority::Fallback
        }

        fn is_available() -> bool {
            true
        }

        fn list(&self) -> crate::error::Result<Vec<InterfaceRecord>> {
            Ok(self.records.clone())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Frame {
        interface: String,
        status: InterfaceStatus,
        throughput: u64,
        scope: DrawScope,
    }

    struct ScriptedFrontend {
        events: VecDeque<Option<FrontendEvent>>,
        frames: Vec<Frame>,
        timeouts: Vec<Duration>,
    }

    impl ScriptedFrontend {
        fn new(events: Vec<Option<FrontendEvent>>) -> Self {
            Self {
                events: events.into(),
                frames: Vec::new(),
                timeouts: Vec::new(),
            }
        }

        fn throughputs(&self) -> Vec<u64> {
            self.frames.iter().map(|f| f.throughput).collect()
        }
    }

    impl Frontend for ScriptedFrontend {
        fn wait(&mut self, timeout: Duration) -> Result<Option<FrontendEvent>> {
            self.timeouts.push(timeout);
            Ok(self.events.pop_front().unwrap_or(Some(FrontendEvent::Quit)))
        }

        fn draw(&mut self, view: &MonitorView<'_>, scope: DrawScope) -> Result<()> {
            self.frames.push(Frame {
                interface: view.interface.to_string(),
                status: view.status,
                throughput: view.throughput,
                scope,
            });
            Ok(())
        }
    }

    #[test]
    fn test_one_interval() {
        let enumerator = FakeEnumerator::new(&["lo", "eth0"]);
        let source = ScriptedSource::boxed(vec![Some((1000, 500)), Some((2000, 1500))]);
        let mut monitor = InterfaceMonitor::new("eth0", Some(source), &MonitorSettings::default());
        let mut frontend = ScriptedFrontend::new(vec![None, Some(FrontendEvent::Quit)]);

        let exit = monitor.run(&mut frontend, &enumerator).unwrap();

        assert_eq!(exit, MonitorExit::Quit);
        assert_eq!(frontend.throughputs(), vec![0, 2000]);
        assert_eq!(
            frontend.frames.last().map(|f| (f.status, f.scope)),
            Some((InterfaceStatus::Up, DrawScope::All))
        );
        assert_eq!(monitor.history().latest(), RateSample::new(1000, 1000));
        assert!(
            frontend
                .timeouts
                .iter()
                .all(|&t| t <= Duration::from_secs(1))
        );
    }

    #[test]
    fn test_smoothing_redraws_throughput() {
        let enumerator = FakeEnumerator::new(&["eth0"]);
        let source = ScriptedSource::boxed(vec![Some((0, 0)), Some((1000, 0))]);
        let settings = MonitorSettings {
            smoothing_steps: 3,
            ..MonitorSettings::default()
        };
        let mut monitor = InterfaceMonitor::new("eth0", Some(source), &settings);
        let mut frontend = ScriptedFrontend::new(vec![None, None, None, Some(FrontendEvent::Quit)]);

        monitor.run(&mut frontend, &enumerator).unwrap();

        assert_eq!(frontend.throughputs(), vec![0, 600, 900, 1000]);
        let scopes: Vec<DrawScope> = frontend.frames.iter().map(|f| f.scope).collect();
        assert_eq!(
            scopes,
            vec![
                DrawScope::All,
                DrawScope::All,
                DrawScope::Throughput,
                DrawScope::Throughput
            ]
        );
    }

    #[test]
    fn test_failed_poll_records_idle_interval() {
        let enumerator = FakeEnumerator::new(&["eth0"]);
        let source = ScriptedSource::boxed(vec![Some((1000, 1000)), None, Some((4000, 1000))]);
        let mut monitor = InterfaceMonitor::new("eth0", Some(source), &MonitorSettings::default());
        monitor.start(&enumerator);

        assert_eq!(monitor.complete_interval(&enumerator), RateSample::default());
        assert_eq!(monitor.status(), InterfaceStatus::Unknown);

        // The baseline survived the failure
        assert_eq!(
            monitor.complete_interval(&enumerator),
            RateSample::new(3000, 0)
        );
        assert_eq!(monitor.status(), InterfaceStatus::Up);
    }

    #[test]
    fn test_without_source_status_unknown() {
        let enumerator = FakeEnumerator::new(&["eth0"]);
        let mut monitor = InterfaceMonitor::new("eth0", None, &MonitorSettings::default());
        monitor.start(&enumerator);
        assert_eq!(monitor.status(), InterfaceStatus::Unknown);

        monitor.complete_interval(&enumerator);
        assert_eq!(monitor.status(), InterfaceStatus::Unknown);
        assert_eq!(monitor.history().latest(), RateSample::default());
    }

    #[test]
    fn test_failed_baseline_read_status_unknown() {
        let enumerator = FakeEnumerator::new(&["eth0"]);
        let source = ScriptedSource::boxed(vec![None, Some((1000, 0)), Some((3000, 0))]);
        let mut monitor = InterfaceMonitor::new("eth0", Some(source), &MonitorSettings::default());
        monitor.start(&enumerator);
        assert_eq!(monitor.status(), InterfaceStatus::Unknown);

        // First good read becomes the baseline
        assert_eq!(monitor.complete_interval(&enumerator), RateSample::default());
        assert_eq!(monitor.status(), InterfaceStatus::Up);
        assert_eq!(
            monitor.complete_interval(&enumerator),
            RateSample::new(2000, 0)
        );
    }

    #[test]
    fn test_redraw_and_next_interface() {
        let enumerator = FakeEnumerator::new(&["eth0"]);
        let source = ScriptedSource::boxed(vec![Some((0, 0))]);
        let mut monitor = InterfaceMonitor::new("eth0", Some(source), &MonitorSettings::default());
        let mut frontend = ScriptedFrontend::new(vec![
            Some(FrontendEvent::Redraw),
            Some(FrontendEvent::NextInterface),
        ]);

        let exit = monitor.run(&mut frontend, &enumerator).unwrap();

        assert_eq!(exit, MonitorExit::NextInterface);
        assert_eq!(frontend.frames.len(), 2);
        assert_eq!(frontend.frames[1].scope, DrawScope::All);
    }

    #[test]
    fn test_initial_interface() {
        let enumerator = FakeEnumerator::new(&["lo", "eth0", "eth1"]);
        let session = Session::new(MonitorSettings::default(), false, &enumerator);

        assert_eq!(session.initial_interface(None).unwrap(), "eth0");
        assert_eq!(session.initial_interface(Some("eth1")).unwrap(), "eth1");
        assert_eq!(session.initial_interface(Some("ppp0")).unwrap(), "eth0");

        let keeping = Session::new(MonitorSettings::default(), true, &enumerator);
        assert_eq!(keeping.initial_interface(Some("ppp0")).unwrap(), "ppp0");
    }

    #[test]
    fn test_initial_interface_none_available() {
        let enumerator = FakeEnumerator::new(&[]);
        let session = Session::new(MonitorSettings::default(), false, &enumerator);

        assert!(matches!(
            session.initial_interface(None),
            Err(MonitorError::NoInterfaces)
        ));
    }

    #[test]
    fn test_session_cycles_interfaces() {
        let enumerator = FakeEnumerator::new(&["lo", "eth0", "eth1"]);
        let session = Session::new(MonitorSettings::default(), false, &enumerator);
        let mut frontend = ScriptedFrontend::new(vec![
            Some(FrontendEvent::NextInterface),
            Some(FrontendEvent::NextInterface),
            Some(FrontendEvent::Quit),
        ]);

        let opened = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&opened);
        let mut open = move |name: &str| -> crate::error::Result<Box<dyn StatsSource>> {
            log.lock().unwrap().push(name.to_string());
            if name == "eth1" {
                return Err(MonitorError::unavailable("scripted", "no eth1"));
            }
            Ok(ScriptedSource::boxed(vec![Some((0, 0))]))
        };

        session
            .run("eth0".to_string(), &mut frontend, &mut open)
            .unwrap();

        assert_eq!(*opened.lock().unwrap(), vec!["eth0", "eth1", "eth0"]);

        let monitored: Vec<(String, InterfaceStatus)> = frontend
            .frames
            .iter()
            .map(|f| (f.interface.clone(), f.status))
            .collect();
        assert_eq!(
            monitored,
            vec![
                ("eth0".to_string(), InterfaceStatus::Up),
                ("eth1".to_string(), InterfaceStatus::Unknown),
                ("eth0".to_string(), InterfaceStatus::Up),
            ]
        );
    }

    #[test]
    fn test_session_keeps_interface() {
        let enumerator = FakeEnumerator::new(&["eth0", "eth1"]);
        let session = Session::new(MonitorSettings::default(), true, &enumerator);

        assert_eq!(session.next_interface("eth0"), "eth0");
    }
}
