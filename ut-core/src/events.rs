//! Event model
//!
//! Every moment of a run is described by one small value type. Producers
//! (assertions, the runner) build an event right before dispatching it and the
//! dispatcher forwards it to the reporter; nothing keeps events afterwards.
//!
//! The full descriptors [`Suite`](crate::unit::Suite),
//! [`Test`](crate::unit::Test) and [`Assertion`] are not dispatched
//! themselves. They narrow to their lifecycle events through pure
//! projections (`begin`, `end`, `skip`, `pass`, `fail`, `fatal`).

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use serde::{Serialize, Serializer};
use crate::expression::Expression;

/// Suite or test name captured at registration time
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Where an assertion was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Location of the caller of the enclosing `#[track_caller]` function
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

// =========================================
// SUITE
// =========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteBegin {
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteEnd {
    pub name: Name,
}

// =========================================
// TEST
// =========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestBegin {
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSkip {
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestEnd {
    pub name: Name,
}

// =========================================
// ASSERTION
// =========================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionPass {
    pub expression: Expression,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionFail {
    pub expression: Expression,
    pub location: SourceLocation,

    /// User supplied failure message, if any
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFatal {
    pub location: SourceLocation,
}

/// Full assertion descriptor
///
/// Built once the expression has been evaluated; narrows to the event the
/// outcome calls for.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub expression: Expression,
    pub location: SourceLocation,
    pub message: Option<String>,
}

impl Assertion {
    pub fn pass(&self) -> AssertionPass {
        AssertionPass {
            expression: self.expression.clone(),
            location: self.location,
        }
    }

    pub fn fail(&self) -> AssertionFail {
        AssertionFail {
            expression: self.expression.clone(),
            location: self.location,
            message: self.message.clone(),
        }
    }

    pub fn fatal(&self) -> AssertionFatal {
        AssertionFatal {
            location: self.location,
        }
    }
}

// =========================================
// UNEXPECTED / LOG / SUMMARY
// =========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unexpected {
    pub message: String,
}

impl Unexpected {
    pub fn what(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary;

/// Discriminant of [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SuiteBegin,
    SuiteEnd,
    TestBegin,
    TestSkip,
    TestEnd,
    AssertionPass,
    AssertionFail,
    AssertionFatal,
    Unexpected,
    Log,
    Summary,
}

/// Any event that reaches the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SuiteBegin(SuiteBegin),
    SuiteEnd(SuiteEnd),
    TestBegin(TestBegin),
    TestSkip(TestSkip),
    TestEnd(TestEnd),
    AssertionPass(AssertionPass),
    AssertionFail(AssertionFail),
    AssertionFatal(AssertionFatal),
    Unexpected(Unexpected),
    Log(Log),
    Summary(Summary),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SuiteBegin(_) => EventKind::SuiteBegin,
            Event::SuiteEnd(_) => EventKind::SuiteEnd,
            Event::TestBegin(_) => EventKind::TestBegin,
            Event::TestSkip(_) => EventKind::TestSkip,
            Event::TestEnd(_) => EventKind::TestEnd,
            Event::AssertionPass(_) => EventKind::AssertionPass,
            Event::AssertionFail(_) => EventKind::AssertionFail,
            Event::AssertionFatal(_) => EventKind::AssertionFatal,
            Event::Unexpected(_) => EventKind::Unexpected,
            Event::Log(_) => EventKind::Log,
            Event::Summary(_) => EventKind::Summary,
        }
    }

    /// Name of the suite or test this event belongs to, if it carries one
    pub fn unit_name(&self) -> Option<&Name> {
        match self {
            Event::SuiteBegin(SuiteBegin { name })
            | Event::SuiteEnd(SuiteEnd { name })
            | Event::TestBegin(TestBegin { name })
            | Event::TestSkip(TestSkip { name })
            | Event::TestEnd(TestEnd { name }) => Some(name),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::AssertionFail(_) | Event::AssertionFatal(_) | Event::Unexpected(_)
        )
    }
}

macro_rules! impl_into_event {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Event {
                fn from(event: $variant) -> Self {
                    Event::$variant(event)
                }
            }
        )*
    };
}

impl_into_event!(
    SuiteBegin,
    SuiteEnd,
    TestBegin,
    TestSkip,
    TestEnd,
    AssertionPass,
    AssertionFail,
    AssertionFatal,
    Unexpected,
    Log,
    Summary,
);
