//! Assertion evaluator
//!
//! [`expect`] takes an already evaluated expression and returns an [`Expect`]
//! builder. Modifiers (`message`, `fatal`) only collect settings, in any
//! order; `check` dispatches the outcome exactly once.
//!
//! ```
//! use ut_core::{expect, expression::eq};
//!
//! fn body() -> anyhow::Result<()> {
//!     expect(eq(1 + 1, 2)).fatal().message("arithmetic").check()?;
//!     expect(eq(2 * 2, 5)).message("keeps going").check()?;
//!     Ok(())
//! }
//! ```

use tracing::trace;
use crate::error::FatalAbort;
use crate::events::{Assertion, SourceLocation};
use crate::expression::Evaluated;
use crate::runner::{active, emit};

#[must_use = "an assertion is only reported once `check` is called"]
#[derive(Debug, Clone)]
pub struct Expect {
    evaluated: Evaluated,
    location: SourceLocation,
    message: Option<String>,
    fatal: bool,
}

/// Start an assertion at the caller's location
#[track_caller]
pub fn expect(expression: impl Into<Evaluated>) -> Expect {
    Expect {
        evaluated: expression.into(),
        location: SourceLocation::caller(),
        message: None,
        fatal: false,
    }
}

impl Expect {
    /// Failure message, rendered only if the assertion fails
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Abort the enclosing test if the assertion fails
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn passed(&self) -> bool {
        self.evaluated.passed
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Report the outcome to the active session
    ///
    /// Returns `Ok(passed)`, except for a failed fatal assertion: that one
    /// emits `AssertionFail` and `AssertionFatal`, then returns the
    /// [`FatalAbort`] error for the body to propagate with `?`.
    ///
    /// Once the enclosing unit has aborted, further checks emit nothing and
    /// return the abort again.
    pub fn check(self) -> anyhow::Result<bool> {
        let bridge = active()?;
        if bridge.borrow().state().fatal_raised() {
            trace!(location = %self.location, "assertion after fatal abort");
            return Err(FatalAbort::new(self.location).into());
        }
        let passed = self.evaluated.passed;
        let fatal = self.fatal;

        let assertion = Assertion {
            expression: self.evaluated.expression,
            location: self.location,
            message: self.message,
        };
        trace!(passed, fatal, location = %assertion.location, "assertion");

        if passed {
            emit(&bridge, assertion.pass());
            return Ok(true);
        }

        emit(&bridge, assertion.fail());
        if fatal {
            emit(&bridge, assertion.fatal());
            return Err(FatalAbort::new(assertion.location).into());
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use crate::config::Config;
    use crate::error::UtError;
    use crate::events::{Event, EventKind};
    use crate::expression::{eq, that};
    use crate::report::RecordingReporter;
    use crate::runner::{test, Runner};

    fn run_single<F>(body: F) -> RecordingReporter
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let recorder = RecordingReporter::new();
        let mut runner = Runner::new(Config::default(), recorder.clone());
        runner.suite("assertions", move || test("body", body).map(|_| ()));
        runner.run().unwrap();
        recorder
    }

    #[test]
    fn test_check_outside_session() {
        let err = expect(true).check().unwrap_err();
        assert_eq!(err.downcast_ref::<UtError>(), Some(&UtError::NoActiveSession));
    }

    #[test]
    fn test_modifiers_commute() {
        let a = expect(false).message("m").fatal();
        let b = expect(false).fatal().message("m");
        assert_eq!(a.is_fatal(), b.is_fatal());
        assert_eq!(a.message, b.message);
        assert!(!a.passed());
    }

    #[test]
    fn test_location_is_callers() {
        let line = line!() + 1;
        let pending = expect(true);
        assert_eq!(pending.location().line, line);
        assert!(pending.location().file.ends_with("assertion.rs"));
    }

    #[test]
    fn test_non_fatal_failure_continues() {
        let reached = Rc::new(Cell::new(false));
        let flag = reached.clone();
        let recorder = run_single(move || {
            let passed = expect(eq(1 + 1, 3)).message("error message...").check()?;
            assert!(!passed);
            flag.set(true);
            Ok(())
        });

        assert!(reached.get());
        let fail = recorder
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::AssertionFail(fail) => Some(fail),
                _ => None,
            })
            .unwrap();
        assert_eq!(fail.message.as_deref(), Some("error message..."));
        assert_eq!(fail.expression.to_string(), "2 == 3");
    }

    #[test]
    fn test_fatal_failure_aborts() {
        let reached = Rc::new(Cell::new(false));
        let flag = reached.clone();
        let recorder = run_single(move || {
            expect(eq(1 + 1, 3)).fatal().check()?;
            flag.set(true);
            Ok(())
        });

        assert!(!reached.get());
        assert_eq!(
            recorder.kinds(),
            vec![
                EventKind::SuiteBegin,
                EventKind::TestBegin,
                EventKind::AssertionFail,
                EventKind::AssertionFatal,
                EventKind::TestEnd,
                EventKind::SuiteEnd,
                EventKind::Summary,
            ]
        );
    }

    #[test]
    fn test_passing_fatal_never_aborts() {
        let reached = Rc::new(Cell::new(false));
        let flag = reached.clone();
        let recorder = run_single(move || {
            expect(that(true)).fatal().message("never output").check()?;
            expect(that(true)).message("never output").fatal().check()?;
            flag.set(true);
            Ok(())
        });

        assert!(reached.get());
        let passes = recorder
            .kinds()
            .into_iter()
            .filter(|k| *k == EventKind::AssertionPass)
            .count();
        assert_eq!(passes, 2);
    }

    #[test]
    fn test_expression_evaluated_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        run_single(move || {
            let bump = || {
                counter.set(counter.get() + 1);
                counter.get()
            };
            expect(eq(bump(), 1)).message("first").fatal().message("again").check()?;
            Ok(())
        });
        assert_eq!(calls.get(), 1);
    }
}
