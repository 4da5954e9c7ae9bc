//! Dispatcher/reporter bridge
//!
//! The single sink every event passes through. It keeps the run's counters
//! and nesting depth up to date for every event, then forwards the event to
//! the reporter if the configured report level lets it through.

use serde::Serialize;
use tracing::trace;
use crate::config::{Config, ReportLevel};
use crate::events::Event;
use crate::report::Reporter;

/// Running counters of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub suites: usize,
    pub tests_run: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub tests_skipped: usize,
    pub assertions_passed: usize,
    pub assertions_failed: usize,
    pub fatal_aborts: usize,
    pub unexpected: usize,
}

impl Tally {
    pub fn is_success(&self) -> bool {
        self.tests_failed == 0 && self.assertions_failed == 0 && self.unexpected == 0
    }

    pub fn assertions(&self) -> usize {
        self.assertions_passed + self.assertions_failed
    }
}

/// An open suite or test
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    test: bool,

    /// Assertion failure or unexpected error recorded directly in this test
    failed: bool,

    /// A fatal assertion failed while this unit was innermost
    fatal: bool,
}

/// What a reporter can see besides the event itself
#[derive(Debug, Clone, Default)]
pub struct RunState {
    tally: Tally,
    frames: Vec<Frame>,
}

impl RunState {
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Number of open suites and tests
    ///
    /// While a begin or end event is being rendered, the unit it belongs to
    /// counts as open.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether the innermost open test has recorded a failure
    pub fn test_failed(&self) -> bool {
        self.innermost_test().map_or(false, |frame| frame.failed)
    }

    /// Whether any test is open
    pub fn in_test(&self) -> bool {
        self.innermost_test().is_some()
    }

    /// Whether the innermost open unit has already raised a fatal abort
    ///
    /// Stays set until that unit ends, even if the body dropped the
    /// `FatalAbort` instead of propagating it.
    pub fn fatal_raised(&self) -> bool {
        self.frames.last().map_or(false, |frame| frame.fatal)
    }

    fn innermost_test(&self) -> Option<&Frame> {
        self.frames.iter().rev().find(|frame| frame.test)
    }

    fn mark_failed(&mut self) {
        if let Some(frame) = self.frames.iter_mut().rev().find(|frame| frame.test) {
            frame.failed = true;
        }
    }

    fn mark_fatal(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.fatal = true;
        }
    }

    fn open(&mut self, test: bool) {
        self.frames.push(Frame {
            test,
            ..Frame::default()
        });
    }

    fn close(&mut self) {
        self.frames.pop();
    }
}

pub struct Dispatcher {
    config: Config,
    state: RunState,
    reporter: Box<dyn Reporter>,
}

impl Dispatcher {
    pub fn new(config: Config, reporter: Box<dyn Reporter>) -> Self {
        Self {
            config,
            state: RunState::default(),
            reporter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn configure(&mut self, config: Config) {
        self.config = config;
    }

    pub fn report_level(&self) -> ReportLevel {
        self.config.report_level
    }

    pub fn set_report_level(&mut self, report_level: ReportLevel) {
        self.config.report_level = report_level;
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn tally(&self) -> &Tally {
        &self.state.tally
    }

    /// Clear counters and depth. The configuration is left alone.
    pub fn reset(&mut self) {
        self.state = RunState::default();
    }

    /// Record an event and render it if the report level admits it
    pub fn dispatch(&mut self, event: impl Into<Event>) {
        let event = event.into();
        trace!(kind = ?event.kind(), depth = self.state.depth(), "dispatch");

        self.record(&event);

        if self.config.report_level.admits(&event) {
            self.reporter.on_event(&event, &self.state);
        }

        if matches!(event, Event::SuiteEnd(_) | Event::TestEnd(_)) {
            self.state.close();
        }
    }

    fn record(&mut self, event: &Event) {
        let state = &mut self.state;

        match event {
            Event::SuiteBegin(_) => {
                state.tally.suites += 1;
                state.open(false);
            }
            Event::TestBegin(_) => {
                state.tally.tests_run += 1;
                state.open(true);
            }
            Event::TestSkip(_) => state.tally.tests_skipped += 1,
            Event::TestEnd(_) => {
                if state.test_failed() {
                    state.tally.tests_failed += 1;
                } else {
                    state.tally.tests_passed += 1;
                }
            }
            Event::AssertionPass(_) => state.tally.assertions_passed += 1,
            Event::AssertionFail(_) => {
                state.tally.assertions_failed += 1;
                state.mark_failed();
            }
            Event::AssertionFatal(_) => {
                state.tally.fatal_aborts += 1;
                state.mark_failed();
                state.mark_fatal();
            }
            Event::Unexpected(_) => {
                state.tally.unexpected += 1;
                state.mark_failed();
            }
            Event::SuiteEnd(_) | Event::Log(_) | Event::Summary(_) => {}
        }
    }
}
