//! Test reporting module
//!
//! Reporters turn the event stream into output. They only see the events the
//! report level admits, but they always get the up to date [`RunState`].
//! A reporter must not emit events itself.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use colored::{Color, Colorize};
use tracing::{debug, error, info, warn};
use crate::dispatcher::{RunState, Tally};
use crate::events::{Event, EventKind};

/// Test reporter trait
pub trait Reporter {
    /// Called for every admitted event, in emission order
    fn on_event(&mut self, event: &Event, state: &RunState);
}

/// Indentation level of an event
///
/// Begin and end events sit at the level of their parent; everything else
/// belongs to the innermost open unit.
pub fn indent_level(event: &Event, state: &RunState) -> usize {
    match event {
        Event::SuiteBegin(_) | Event::SuiteEnd(_) | Event::TestBegin(_) | Event::TestEnd(_) => {
            state.depth().saturating_sub(1)
        }
        Event::Summary(_) => 0,
        _ => state.depth(),
    }
}

/// Console test reporter
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
    color: bool,
}

impl ConsoleReporter {
    pub fn new(color: bool) -> Self {
        Self::with_writer(io::stdout(), color)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn render(&self, event: &Event, state: &RunState) -> String {
        let pad = "  ".repeat(indent_level(event, state));

        match event {
            Event::SuiteBegin(e) => {
                let title = if self.color {
                    "Running suite".bold().to_string()
                } else {
                    "Running suite".to_string()
                };
                format!("{}{} {}", pad, title, e.name)
            }
            Event::SuiteEnd(e) => format!("{}{}", pad, self.dim(&format!("Finished suite {}", e.name))),
            Event::TestBegin(e) => format!("{}Running {} ...", pad, e.name),
            Event::TestSkip(e) => format!("{}{} ... {}", pad, e.name, self.paint("SKIP", Color::Yellow)),
            Event::TestEnd(e) => {
                let status = if state.test_failed() {
                    self.paint("FAIL", Color::Red)
                } else {
                    self.paint("PASS", Color::Green)
                };
                format!("{}{} ... {}", pad, e.name, status)
            }
            Event::AssertionPass(e) => format!(
                "{}{} {} {}",
                pad,
                self.paint("ok", Color::Green),
                e.expression,
                self.dim(&format!("at {}", e.location))
            ),
            Event::AssertionFail(e) => {
                let mut line = format!(
                    "{}{} {} {}",
                    pad,
                    self.paint("FAILED", Color::Red),
                    e.expression,
                    self.dim(&format!("at {}", e.location))
                );
                if let Some(message) = &e.message {
                    line.push_str(&format!(": {}", message));
                }
                line
            }
            Event::AssertionFatal(e) => format!(
                "{}{} test aborted at {}",
                pad,
                self.paint("FATAL", Color::Red),
                e.location
            ),
            Event::Unexpected(e) => format!("{}{} {}", pad, self.paint("ERROR", Color::Red), e.what()),
            Event::Log(e) => format!("{}{}", pad, self.dim(&e.message)),
            Event::Summary(_) => self.render_summary(state.tally()),
        }
    }

    fn render_summary(&self, tally: &Tally) -> String {
        let heading = if self.color {
            "Test Summary".bold().underline().to_string()
        } else {
            "Test Summary".to_string()
        };

        let mut lines = vec![String::new(), heading, String::new()];
        lines.push(format!(
            "  {} passed",
            self.paint(&tally.tests_passed.to_string(), Color::Green)
        ));
        if tally.tests_failed > 0 {
            lines.push(format!(
                "  {} failed",
                self.paint(&tally.tests_failed.to_string(), Color::Red)
            ));
        }
        if tally.tests_skipped > 0 {
            lines.push(format!(
                "  {} skipped",
                self.paint(&tally.tests_skipped.to_string(), Color::Yellow)
            ));
        }
        lines.push(String::new());
        lines.push(format!(
            "Total: {} tests in {} suites, {} assertions ({} passed, {} failed)",
            tally.tests_run,
            tally.suites,
            tally.assertions(),
            tally.assertions_passed,
            tally.assertions_failed
        ));
        if tally.unexpected > 0 {
            lines.push(format!("{} unexpected errors", tally.unexpected));
        }

        lines.push(String::new());
        if tally.is_success() {
            lines.push(self.paint("All tests passed!", Color::Green));
        } else {
            lines.push(self.paint("Some tests failed.", Color::Red));
        }
        lines.join("\n")
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_event(&mut self, event: &Event, state: &RunState) {
        let line = self.render(event, state);
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("console reporter failed to write: {}", e);
        }
    }
}

/// JSON lines test reporter
///
/// One object per event, tagged with `"event"`; the summary object carries
/// the tally and a timestamp.
pub struct JsonReporter<W: Write = io::Stdout> {
    out: W,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn to_json(event: &Event, state: &RunState) -> serde_json::Result<serde_json::Value> {
        if let Event::Summary(_) = event {
            let tally = state.tally();
            return Ok(serde_json::json!({
                "event": "summary",
                "tally": serde_json::to_value(tally)?,
                "success": tally.is_success(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }));
        }

        let mut value = serde_json::to_value(event)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("depth".to_string(), indent_level(event, state).into());
        }
        Ok(value)
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn on_event(&mut self, event: &Event, state: &RunState) {
        let line = match Self::to_json(event, state) {
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!("failed to serialize {:?} event: {}", event.kind(), e);
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("json reporter failed to write: {}", e);
        }
    }
}

/// Renders events as structured `tracing` records
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn on_event(&mut self, event: &Event, state: &RunState) {
        let depth = state.depth();
        match event {
            Event::SuiteBegin(e) => info!(suite = %e.name, depth, "suite begin"),
            Event::SuiteEnd(e) => info!(suite = %e.name, depth, "suite end"),
            Event::TestBegin(e) => info!(test = %e.name, depth, "test begin"),
            Event::TestSkip(e) => info!(test = %e.name, depth, "test skipped"),
            Event::TestEnd(e) => info!(test = %e.name, depth, failed = state.test_failed(), "test end"),
            Event::AssertionPass(e) => debug!(
                expression = %e.expression,
                location = %e.location,
                "assertion passed"
            ),
            Event::AssertionFail(e) => error!(
                expression = %e.expression,
                location = %e.location,
                detail = e.message.as_deref().unwrap_or(""),
                "assertion failed"
            ),
            Event::AssertionFatal(e) => error!(location = %e.location, "fatal assertion, test aborted"),
            Event::Unexpected(e) => error!(error = e.what(), "unexpected error"),
            Event::Log(e) => info!(depth, "{}", e.message),
            Event::Summary(_) => {
                let tally = state.tally();
                info!(
                    suites = tally.suites,
                    tests = tally.tests_run,
                    passed = tally.tests_passed,
                    failed = tally.tests_failed,
                    skipped = tally.tests_skipped,
                    assertions_passed = tally.assertions_passed,
                    assertions_failed = tally.assertions_failed,
                    success = tally.is_success(),
                    "summary"
                );
            }
        }
    }
}

/// Keeps every admitted event in a shared list
///
/// Clones share the same list, so a handle kept by the caller sees what the
/// dispatcher's copy recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(Event::kind).collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Reporter for RecordingReporter {
    fn on_event(&mut self, event: &Event, _state: &RunState) {
        self.events.borrow_mut().push(event.clone());
    }
}
