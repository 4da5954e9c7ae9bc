//! Run controller
//!
//! The [`Runner`] owns the dispatcher for the lifetime of the process and
//! installs it as the thread's active session while a run is in progress.
//! Inside that window the free functions [`test`], [`run_test`], [`suite`]
//! and [`run_suite`] execute units depth-first, and assertions find the
//! dispatcher without it being threaded through every body.
//!
//! Every unit boundary contains what happens inside it: a fatal abort, an
//! error returned from the body or a panic end that unit only. The matching
//! end event is always emitted.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Once;
use tracing::{debug, info, warn};
use crate::config::{Config, ReportLevel};
use crate::dispatcher::{Dispatcher, Tally};
use crate::error::{FatalAbort, Result, UtError};
use crate::events::{Event, Log, Summary, Unexpected};
use crate::report::Reporter;
use crate::unit::{IntoOutcome, Outcome, Suite, Test};

/// How a unit invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,

    /// Completed, with at least one failed assertion
    Failed,

    /// Left early through a fatal assertion
    Aborted,

    /// Left early through an error or panic
    Errored,

    /// Registered but not executed
    Skipped,
}

impl Status {
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed | Status::Aborted | Status::Errored)
    }
}

type Bridge = Rc<RefCell<Dispatcher>>;

thread_local! {
    /// Dispatcher of the run in progress on this thread
    static ACTIVE: RefCell<Option<Bridge>> = const { RefCell::new(None) };
}

/// Installs a bridge as the active session until dropped
struct ActiveScope;

impl ActiveScope {
    fn enter(bridge: Bridge) -> Result<Self> {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.is_some() {
                return Err(UtError::RunInProgress);
            }
            *active = Some(bridge);
            Ok(ActiveScope)
        })
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active.borrow_mut().take();
        });
    }
}

/// Silence the panic hook for panics raised inside a session
///
/// Those panics are contained and reported as `Unexpected` events. Panics on
/// threads without a session still reach the previously installed hook.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let contained = ACTIVE
                .try_with(|active| active.try_borrow().map_or(false, |a| a.is_some()))
                .unwrap_or(false);
            if contained {
                debug!(location = ?info.location(), "contained panic");
            } else {
                default_hook(info);
            }
        }));
        debug!("panic hook installed");
    });
}

pub(crate) fn active() -> Result<Bridge> {
    ACTIVE
        .with(|active| active.borrow().clone())
        .ok_or(UtError::NoActiveSession)
}

/// Whether a run is in progress on this thread
pub fn in_session() -> bool {
    ACTIVE.with(|active| active.borrow().is_some())
}

pub(crate) fn emit(bridge: &Bridge, event: impl Into<Event>) {
    bridge.borrow_mut().dispatch(event);
}

pub struct Runner {
    bridge: Bridge,
    suites: Vec<Suite<'static>>,
}

impl Runner {
    pub fn new(config: Config, reporter: impl Reporter + 'static) -> Self {
        Self::with_reporter(config, Box::new(reporter))
    }

    pub fn with_reporter(config: Config, reporter: Box<dyn Reporter>) -> Self {
        Self {
            bridge: Rc::new(RefCell::new(Dispatcher::new(config, reporter))),
            suites: Vec::new(),
        }
    }

    /// Register a suite; suites run in registration order
    pub fn add_suite(&mut self, suite: Suite<'static>) -> &mut Self {
        self.suites.push(suite);
        self
    }

    pub fn suite<F, R>(&mut self, name: &str, body: F) -> &mut Self
    where
        F: FnOnce() -> R + 'static,
        R: IntoOutcome,
    {
        self.add_suite(Suite::new(name, body))
    }

    pub fn pending(&self) -> usize {
        self.suites.len()
    }

    pub fn config(&self) -> Config {
        self.bridge.borrow().config().clone()
    }

    pub fn configure(&mut self, config: Config) {
        self.bridge.borrow_mut().configure(config);
    }

    pub fn report_level(&self) -> ReportLevel {
        self.bridge.borrow().report_level()
    }

    pub fn set_report_level(&mut self, report_level: ReportLevel) {
        self.bridge.borrow_mut().set_report_level(report_level);
    }

    /// Tally of the last run (or the one in progress)
    pub fn tally(&self) -> Tally {
        self.bridge.borrow().tally().clone()
    }

    /// Run every registered suite and emit the summary
    ///
    /// Suites are consumed: each one runs exactly once. Counters start from
    /// zero; the configuration carries over from previous runs.
    pub fn run(&mut self) -> Result<Tally> {
        install_panic_hook();
        let _scope = ActiveScope::enter(self.bridge.clone())?;
        self.bridge.borrow_mut().reset();

        let suites = std::mem::take(&mut self.suites);
        info!("Running {} suites", suites.len());

        for suite in suites {
            run_suite(suite)?;
        }

        emit(&self.bridge, Summary);

        let tally = self.tally();
        info!(
            tests = tally.tests_run,
            failed = tally.tests_failed,
            skipped = tally.tests_skipped,
            "Run finished"
        );
        Ok(tally)
    }
}

/// Why a body stopped early
enum Interrupt {
    Fatal,
    Unexpected(String),
}

fn invoke(body: impl FnOnce() -> Outcome) -> std::result::Result<(), Interrupt> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) if FatalAbort::is_abort(&e) => Err(Interrupt::Fatal),
        Ok(Err(e)) => Err(Interrupt::Unexpected(format!("{:#}", e))),
        Err(payload) => Err(Interrupt::Unexpected(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked with a non-string payload".to_string()
    }
}

/// Whether a body that returned normally had dropped a `FatalAbort`
///
/// The dropped signal is reported as unexpected; the unit counts as aborted.
fn discarded_fatal(bridge: &Bridge, unit: &str) -> bool {
    let fatal = bridge.borrow().state().fatal_raised();
    if fatal {
        let message = "fatal assertion signal was discarded".to_string();
        warn!(unit, error = %message, "unexpected error");
        emit(bridge, Unexpected { message });
    }
    fatal
}

/// Settle an interrupted unit, emitting `Unexpected` where needed
fn settle(bridge: &Bridge, unit: &str, interrupt: Interrupt) -> Status {
    match interrupt {
        Interrupt::Fatal => {
            debug!(unit, "aborted by fatal assertion");
            Status::Aborted
        }
        Interrupt::Unexpected(message) => {
            warn!(unit, error = %message, "unexpected error");
            emit(bridge, Unexpected { message });
            Status::Errored
        }
    }
}

/// Execute a test now, within the active session
///
/// Skipped tests emit only `TestSkip`. Otherwise `TestBegin` and `TestEnd`
/// always bracket whatever the body emitted, however it ended. Nothing is
/// emitted for a test started after its enclosing unit already aborted.
pub fn run_test(test: Test<'_>) -> Result<Status> {
    let bridge = active()?;

    let (aborted, skip_reason) = {
        let dispatcher = bridge.borrow();
        let state = dispatcher.state();
        let reason = dispatcher.config().skip_reason(&test, !state.in_test());
        (state.fatal_raised(), reason)
    };
    if aborted {
        debug!(test = %test.name(), "enclosing unit already aborted");
        return Ok(Status::Aborted);
    }
    if let Some(reason) = skip_reason {
        debug!(test = %test.name(), %reason, "skipping test");
        emit(&bridge, test.skip());
        return Ok(Status::Skipped);
    }

    let name = test.name().clone();
    let end = test.end();
    emit(&bridge, test.begin());
    debug!(test = %name, shape = ?test.shape(), "test begin");

    let status = match invoke(move || test.run()) {
        Ok(()) if discarded_fatal(&bridge, name.as_str()) => Status::Aborted,
        Ok(()) if bridge.borrow().state().test_failed() => Status::Failed,
        Ok(()) => Status::Passed,
        Err(interrupt) => settle(&bridge, name.as_str(), interrupt),
    };

    emit(&bridge, end);
    debug!(test = %name, ?status, "test end");
    Ok(status)
}

/// Register a test and execute it immediately
pub fn test<F, R>(name: &str, body: F) -> Result<Status>
where
    F: FnOnce() -> R,
    R: IntoOutcome,
{
    run_test(Test::new(name, body))
}

/// Execute a suite now, within the active session
///
/// A fatal abort or error raised by the suite body itself ends that suite
/// only; `SuiteEnd` is still emitted and sibling suites are unaffected.
pub fn run_suite(suite: Suite<'_>) -> Result<Status> {
    let bridge = active()?;
    if bridge.borrow().state().fatal_raised() {
        debug!(suite = %suite.name(), "enclosing unit already aborted");
        return Ok(Status::Aborted);
    }

    let name = suite.name().clone();
    let end = suite.end();
    emit(&bridge, suite.begin());
    debug!(suite = %name, "suite begin");

    let status = match invoke(move || suite.run()) {
        Ok(()) if discarded_fatal(&bridge, name.as_str()) => Status::Aborted,
        Ok(()) => Status::Passed,
        Err(interrupt) => settle(&bridge, name.as_str(), interrupt),
    };

    emit(&bridge, end);
    debug!(suite = %name, ?status, "suite end");
    Ok(status)
}

pub fn suite<F, R>(name: &str, body: F) -> Result<Status>
where
    F: FnOnce() -> R,
    R: IntoOutcome,
{
    run_suite(Suite::new(name, body))
}

/// Emit a diagnostic line into the event stream
///
/// Outside a run there is nowhere to send it; the message goes to the
/// `tracing` log instead.
pub fn log(message: impl Into<String>) {
    let message = message.into();
    match active() {
        Ok(bridge) => emit(&bridge, Log { message }),
        Err(_) => warn!(%message, "log called outside of a test session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::expect;
    use crate::events::EventKind;
    use crate::expression::eq;
    use crate::report::RecordingReporter;

    #[test]
    fn test_units_require_a_session() {
        assert!(!in_session());
        assert_eq!(test("orphan", || {}), Err(UtError::NoActiveSession));
        assert_eq!(suite("orphan", || {}), Err(UtError::NoActiveSession));
        log("dropped on the floor");
    }

    #[test]
    fn test_session_is_scoped_to_run() {
        let recorder = RecordingReporter::new();
        let mut runner = Runner::new(Config::default(), recorder.clone());
        runner.suite("suite", || {
            assert!(in_session());
        });
        let tally = runner.run().unwrap();
        assert_eq!(tally.unexpected, 0);
        assert!(!in_session());
        assert_eq!(runner.pending(), 0);
    }

    #[test]
    fn test_nested_run_is_rejected() {
        let recorder = RecordingReporter::new();
        let mut runner = Runner::new(Config::default(), recorder);
        runner.suite("outer", || -> anyhow::Result<()> {
            let mut inner = Runner::new(Config::default(), RecordingReporter::new());
            let result = inner.run();
            expect(eq(result, Err(UtError::RunInProgress))).check()?;
            Ok(())
        });
        let tally = runner.run().unwrap();
        assert_eq!(tally.assertions_passed, 1);
        assert!(tally.is_success());
    }

    #[test]
    fn test_statuses() {
        let recorder = RecordingReporter::new();
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let sink = statuses.clone();

        let mut runner = Runner::new(Config::default(), recorder.clone());
        runner.suite("statuses", move || -> anyhow::Result<()> {
            let mut seen = sink.borrow_mut();
            seen.push(test("passed", || expect(eq(1, 1)).check().map(|_| ()))?);
            seen.push(test("failed", || expect(eq(1, 2)).check().map(|_| ()))?);
            seen.push(test("aborted", || expect(eq(1, 2)).fatal().check().map(|_| ()))?);
            seen.push(test("errored", || -> anyhow::Result<()> { anyhow::bail!("no fixture") })?);
            seen.push(test("panicked", || -> anyhow::Result<()> { panic!("kaboom") })?);
            seen.push(run_test(Test::new("skipped", || {}).category("skip"))?);
            Ok(())
        });
        let tally = runner.run().unwrap();

        assert_eq!(tally.tests_run, 5);
        assert_eq!(tally.tests_passed, 1);
        assert_eq!(tally.tests_failed, 4);
        assert_eq!(tally.tests_skipped, 1);
        assert_eq!(tally.unexpected, 2);
        assert_eq!(tally.fatal_aborts, 1);

        assert_eq!(
            *statuses.borrow(),
            vec![
                Status::Passed,
                Status::Failed,
                Status::Aborted,
                Status::Errored,
                Status::Errored,
                Status::Skipped,
            ]
        );
        assert!(!Status::Skipped.is_failure());
        assert!(Status::Aborted.is_failure());

        let unexpected: Vec<String> = recorder
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Unexpected(e) => Some(e.message),
                _ => None,
            })
            .collect();
        assert_eq!(unexpected, vec!["no fixture".to_string(), "panicked: kaboom".to_string()]);
    }

    #[test]
    fn test_summary_emitted_once_per_run() {
        let recorder = RecordingReporter::new();
        let mut runner = Runner::new(Config::default(), recorder.clone());
        runner.suite("a", || {}).suite("b", || {});
        runner.run().unwrap();

        let kinds = recorder.kinds();
        let summaries = kinds.iter().filter(|k| **k == EventKind::Summary).count();
        assert_eq!(summaries, 1);
        assert_eq!(kinds.last(), Some(&EventKind::Summary));

        recorder.clear();
        let tally = runner.run().unwrap();
        assert_eq!(tally, Tally::default());
        assert_eq!(recorder.kinds(), vec![EventKind::Summary]);
    }
}
