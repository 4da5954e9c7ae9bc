//! Unit test execution engine driven by lifecycle events
//!
//! Suites and tests are ordinary values wrapping a body. Running them produces
//! a stream of events (suite/test begin and end, assertion outcomes, logs, a
//! final summary) that a single dispatcher counts and forwards to a reporter.
//! Fatal assertions leave only the enclosing test, through `?`.
//!
//! ```
//! use ut_core::{expect, expression::eq, test, Config, RecordingReporter, Runner};
//!
//! let recorder = RecordingReporter::new();
//! let mut runner = Runner::new(Config::default(), recorder.clone());
//! runner.suite("arithmetic", || -> anyhow::Result<()> {
//!     test("addition", || -> anyhow::Result<()> {
//!         expect(eq(1 + 1, 2)).fatal().check()?;
//!         expect(eq(1 + 1, 3)).message("error message...").check()?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! });
//!
//! let tally = runner.run()?;
//! assert_eq!(tally.assertions_passed, 1);
//! assert_eq!(tally.assertions_failed, 1);
//! # Ok::<(), ut_core::UtError>(())
//! ```

pub mod assertion;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod expression;
pub mod report;
pub mod runner;
pub mod unit;

pub use assertion::{expect, Expect};
pub use config::{Config, ReportLevel};
pub use dispatcher::{Dispatcher, RunState, Tally};
pub use error::{FatalAbort, Result, UtError};
pub use events::{Event, EventKind, Name, SourceLocation};
pub use report::{ConsoleReporter, JsonReporter, RecordingReporter, Reporter, TracingReporter};
pub use runner::{in_session, log, run_suite, run_test, suite, test, Runner, Status};
pub use unit::{IntoOutcome, Outcome, Shape, Suite, Test, TypedBody};
