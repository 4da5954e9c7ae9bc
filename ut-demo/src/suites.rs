//! Smoke suites
//!
//! Three suites sharing the name `suite`. The first two each carry one
//! non-fatal failure in a test and one in its nested test; the third passes.
//! Every passing assertion is marked fatal, with the marker placed both
//! before and after the message.

use anyhow::Result;
use ut_core::expression::eq;
use ut_core::{expect, test, Runner};

pub fn register(runner: &mut Runner) {
    runner
        .suite("suite", failing_suite)
        .suite("suite", failing_suite)
        .suite("suite", passing_suite);
}

fn failing_suite() -> Result<()> {
    test("test", || -> Result<()> {
        expect(eq(1 + 1, 2)).message("never output").fatal().check()?;
        expect(eq(1 + 1, 2)).fatal().message("never output").check()?;

        expect(eq(1 + 1, 3)).message("error message...").check()?;

        expect(eq(1 + 1, 2)).message("never output").fatal().check()?;
        expect(eq(1 + 1, 2)).fatal().message("never output").check()?;

        test("nested_test", || -> Result<()> {
            expect(eq(2 * 2, 4)).message("never output").fatal().check()?;
            expect(eq(2 * 2, 4)).fatal().message("never output").check()?;

            expect(eq(2 * 2, 5)).message("nested error message...").check()?;

            expect(eq(2 * 2, 4)).message("never output").fatal().check()?;
            expect(eq(2 * 2, 4)).fatal().message("never output").check()?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn passing_suite() -> Result<()> {
    test("test", || -> Result<()> {
        expect(eq(1 + 1, 2)).message("never output").fatal().check()?;
        expect(eq(1 + 1, 2)).fatal().message("never output").check()?;

        test("nested_test", || -> Result<()> {
            expect(eq(2 * 2, 4)).message("never output").fatal().check()?;
            expect(eq(2 * 2, 4)).fatal().message("never output").check()?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ut_core::{Config, ReportLevel, RecordingReporter};

    #[test]
    fn test_smoke_tally() {
        let recorder = RecordingReporter::new();
        let config = Config::default().with_report_level(ReportLevel::FailOnly);
        let mut runner = Runner::new(config, recorder.clone());
        register(&mut runner);
        let tally = runner.run().unwrap();

        assert_eq!(tally.suites, 3);
        assert_eq!(tally.tests_run, 6);
        assert_eq!(tally.assertions_passed, 20);
        assert_eq!(tally.assertions_failed, 4);
        assert_eq!(recorder.events().len(), 5);
    }
}
