//! Run configuration
//!
//! The configuration is an ordinary value: built by the host (defaults, a
//! TOML file, environment overrides) and handed to the
//! [`Runner`](crate::runner::Runner), which owns it for the lifetime of the
//! process. Nothing resets it behind the host's back.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::{Result, UtError};
use crate::events::Event;
use crate::unit::Test;

/// Environment variable overriding the report level
pub const REPORT_LEVEL_ENV: &str = "UT_REPORT_LEVEL";

/// Environment variable overriding the test name filter
pub const FILTER_ENV: &str = "UT_FILTER";

/// Which events a reporter gets to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    /// Every event
    #[default]
    #[serde(alias = "ALL")]
    All,

    /// Failures, unexpected errors and the summary
    #[serde(alias = "fail-only", alias = "FAIL_ONLY")]
    FailOnly,

    /// Only the final tally
    #[serde(alias = "SUMMARY")]
    Summary,
}

impl ReportLevel {
    /// Whether an event at this level should be rendered
    ///
    /// Filtering only concerns rendering; counters see every event.
    pub fn admits(self, event: &Event) -> bool {
        match self {
            ReportLevel::All => true,
            ReportLevel::FailOnly => event.is_failure() || matches!(event, Event::Summary(_)),
            ReportLevel::Summary => matches!(event, Event::Summary(_)),
        }
    }
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportLevel::All => "all",
            ReportLevel::FailOnly => "fail_only",
            ReportLevel::Summary => "summary",
        };
        f.write_str(name)
    }
}

impl FromStr for ReportLevel {
    type Err = UtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all" => Ok(ReportLevel::All),
            "fail_only" | "fail" => Ok(ReportLevel::FailOnly),
            "summary" => Ok(ReportLevel::Summary),
            _ => Err(UtError::invalid_report_level(s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Verbosity of the reporter
    #[serde(default)]
    pub report_level: ReportLevel,

    /// Only tests whose name contains this pattern are executed
    #[serde(default)]
    pub filter: Option<String>,

    /// Tests tagged with any of these categories are skipped
    #[serde(default = "default_skip_categories")]
    pub skip_categories: Vec<String>,

    /// Colored console output
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_level: ReportLevel::default(),
            filter: None,
            skip_categories: default_skip_categories(),
            color: default_true(),
        }
    }
}

impl Config {
    pub fn with_report_level(mut self, report_level: ReportLevel) -> Self {
        self.report_level = report_level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| UtError::config_parse(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| UtError::config_io(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Apply `UT_REPORT_LEVEL` and `UT_FILTER` overrides
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(
            std::env::var(REPORT_LEVEL_ENV).ok().as_deref(),
            std::env::var(FILTER_ENV).ok().as_deref(),
        )
    }

    fn apply_overrides(mut self, report_level: Option<&str>, filter: Option<&str>) -> Result<Self> {
        if let Some(level) = report_level {
            self.report_level = level.parse()?;
        }
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            self.filter = Some(filter.to_string());
        }
        Ok(self)
    }

    /// Reason a test should not be executed, if any
    ///
    /// The name filter selects top-level tests only; nested tests run with
    /// their parent. Skip categories apply at any depth.
    pub fn skip_reason(&self, test: &Test<'_>, top_level: bool) -> Option<String> {
        if let Some(category) = test
            .tags()
            .iter()
            .find(|c| self.skip_categories.iter().any(|s| s == *c))
        {
            return Some(format!("category '{}'", category));
        }

        match &self.filter {
            Some(filter) if top_level && !test.name().as_str().contains(filter.as_str()) => {
                Some(format!("does not match filter '{}'", filter))
            }
            _ => None,
        }
    }
}

fn default_skip_categories() -> Vec<String> {
    vec!["skip".to_string()]
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Log, Summary, Unexpected};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_report_level_parsing() {
        assert_eq!("ALL".parse::<ReportLevel>().unwrap(), ReportLevel::All);
        assert_eq!("fail-only".parse::<ReportLevel>().unwrap(), ReportLevel::FailOnly);
        assert_eq!("FAIL_ONLY".parse::<ReportLevel>().unwrap(), ReportLevel::FailOnly);
        assert_eq!(" summary ".parse::<ReportLevel>().unwrap(), ReportLevel::Summary);
        assert!("chatty".parse::<ReportLevel>().is_err());
        assert_eq!(ReportLevel::FailOnly.to_string(), "fail_only");
    }

    #[test]
    fn test_report_level_admits() {
        let summary = Event::Summary(Summary);
        let unexpected = Event::Unexpected(Unexpected { message: "boom".into() });
        let log = Event::Log(Log { message: "hello".into() });

        assert!(ReportLevel::All.admits(&log));
        assert!(!ReportLevel::FailOnly.admits(&log));
        assert!(ReportLevel::FailOnly.admits(&unexpected));
        assert!(ReportLevel::FailOnly.admits(&summary));
        assert!(!ReportLevel::Summary.admits(&unexpected));
        assert!(ReportLevel::Summary.admits(&summary));
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml_str(
            r#"
            report_level = "fail_only"
            filter = "math"
            "#,
        )
        .unwrap();
        assert_eq!(config.report_level, ReportLevel::FailOnly);
        assert_eq!(config.filter.as_deref(), Some("math"));
        assert_eq!(config.skip_categories, vec!["skip".to_string()]);
        assert!(config.color);

        assert!(Config::from_toml_str("report_level = 3").is_err());
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "report_level = \"summary\"\ncolor = false").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.report_level, ReportLevel::Summary);
        assert!(!config.color);

        let missing = Config::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(UtError::ConfigIo { .. })));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .apply_overrides(Some("summary"), Some("nested"))
            .unwrap();
        assert_eq!(config.report_level, ReportLevel::Summary);
        assert_eq!(config.filter.as_deref(), Some("nested"));

        let config = Config::default().apply_overrides(None, Some("")).unwrap();
        assert_eq!(config, Config::default());

        assert!(Config::default().apply_overrides(Some("nope"), None).is_err());
    }

    #[test]
    fn test_skip_reason() {
        let config = Config::default().with_filter("math");
        let matching = Test::new("math_addition", || {});
        let other = Test::new("strings", || {});
        let tagged = Test::new("math_slow", || {}).category("skip");

        assert_eq!(config.skip_reason(&matching, true), None);
        assert!(config.skip_reason(&other, true).unwrap().contains("filter"));
        assert!(config.skip_reason(&tagged, true).unwrap().contains("skip"));

        assert_eq!(config.skip_reason(&other, false), None);
        assert!(config.skip_reason(&tagged, false).unwrap().contains("skip"));
    }
}
