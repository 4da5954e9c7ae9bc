//! Test and suite units
//!
//! A unit pairs a name with a body. Bodies come in three invocation shapes,
//! each with its own constructor: no argument ([`Test::new`]), one argument
//! supplied at registration ([`Test::with_arg`]), or a type parameter
//! ([`Test::typed`]). A body matching none of them simply does not compile.
//!
//! `run` consumes the unit and hands back whatever the body produced,
//! including the [`FatalAbort`](crate::error::FatalAbort) signal. Catching it
//! is the runner's job.

use std::any::type_name;
use std::collections::BTreeSet;
use std::fmt;
use crate::events::{Name, SuiteBegin, SuiteEnd, TestBegin, TestEnd, TestSkip};

/// What a body hands back to the runner
pub type Outcome = anyhow::Result<()>;

/// Return types accepted from a test or suite body
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Ok(())
    }
}

impl<E> IntoOutcome for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_outcome(self) -> Outcome {
        self.map_err(Into::into)
    }
}

/// Body parameterised by a type rather than a value
///
/// Closures cannot be generic, so typed tests are written as a small struct:
///
/// ```
/// use ut_core::{expect, expression::eq, unit::{Test, TypedBody}};
///
/// struct FourByteAligned;
///
/// impl TypedBody for FourByteAligned {
///     type Output = anyhow::Result<()>;
///
///     fn call<T: 'static>(self) -> Self::Output {
///         let size = std::mem::size_of::<T>();
///         expect(eq(size % 4, 0)).check()?;
///         Ok(())
///     }
/// }
///
/// let test = Test::typed::<u32, _>("four byte aligned", FourByteAligned);
/// assert_eq!(test.shape().type_name(), Some("u32"));
/// ```
pub trait TypedBody {
    type Output: IntoOutcome;

    fn call<T: 'static>(self) -> Self::Output;
}

/// Invocation shape selected when the test was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Nullary,
    WithArg { arg_type: &'static str },
    Typed { type_name: &'static str },
}

impl Shape {
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Shape::Typed { type_name } => Some(*type_name),
            _ => None,
        }
    }
}

type Body<'a> = Box<dyn FnOnce() -> Outcome + 'a>;

/// Full test descriptor
pub struct Test<'a> {
    name: Name,
    categories: BTreeSet<String>,
    shape: Shape,
    body: Body<'a>,
}

impl<'a> Test<'a> {
    pub fn new<F, R>(name: impl Into<Name>, body: F) -> Self
    where
        F: FnOnce() -> R + 'a,
        R: IntoOutcome,
    {
        Self::from_parts(name.into(), Shape::Nullary, Box::new(move || body().into_outcome()))
    }

    pub fn with_arg<A, F, R>(name: impl Into<Name>, arg: A, body: F) -> Self
    where
        A: 'a,
        F: FnOnce(A) -> R + 'a,
        R: IntoOutcome,
    {
        let shape = Shape::WithArg {
            arg_type: type_name::<A>(),
        };
        Self::from_parts(name.into(), shape, Box::new(move || body(arg).into_outcome()))
    }

    pub fn typed<T, B>(name: impl Into<Name>, body: B) -> Self
    where
        T: 'static,
        B: TypedBody + 'a,
    {
        let shape = Shape::Typed {
            type_name: type_name::<T>(),
        };
        Self::from_parts(name.into(), shape, Box::new(move || body.call::<T>().into_outcome()))
    }

    fn from_parts(name: Name, shape: Shape, body: Body<'a>) -> Self {
        Self {
            name,
            categories: BTreeSet::new(),
            shape,
            body,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn begin(&self) -> TestBegin {
        TestBegin {
            name: self.name.clone(),
        }
    }

    pub fn end(&self) -> TestEnd {
        TestEnd {
            name: self.name.clone(),
        }
    }

    pub fn skip(&self) -> TestSkip {
        TestSkip {
            name: self.name.clone(),
        }
    }

    /// Invoke the body. Fatal aborts and unrelated errors propagate.
    pub fn run(self) -> Outcome {
        (self.body)()
    }
}

impl fmt::Debug for Test<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.name)
            .field("categories", &self.categories)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Full suite descriptor
pub struct Suite<'a> {
    name: Name,
    body: Body<'a>,
}

impl<'a> Suite<'a> {
    pub fn new<F, R>(name: impl Into<Name>, body: F) -> Self
    where
        F: FnOnce() -> R + 'a,
        R: IntoOutcome,
    {
        Self {
            name: name.into(),
            body: Box::new(move || body().into_outcome()),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn begin(&self) -> SuiteBegin {
        SuiteBegin {
            name: self.name.clone(),
        }
    }

    pub fn end(&self) -> SuiteEnd {
        SuiteEnd {
            name: self.name.clone(),
        }
    }

    pub fn run(self) -> Outcome {
        (self.body)()
    }
}

impl fmt::Debug for Suite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::error::FatalAbort;
    use crate::events::SourceLocation;

    #[test]
    fn test_projections_are_pure() {
        let ran = Cell::new(false);
        let test = Test::new("projection", || ran.set(true));

        assert_eq!(test.begin(), test.begin());
        assert_eq!(test.end(), test.end());
        assert_eq!(test.skip().name.as_str(), "projection");
        assert_eq!(test.begin().name, test.end().name);
        assert!(!ran.get());

        test.run().unwrap();
        assert!(ran.get());
    }

    #[test]
    fn test_invocation_shapes() {
        let seen = Cell::new(0);

        let nullary = Test::new("nullary", || seen.set(seen.get() + 1));
        assert_eq!(nullary.shape(), Shape::Nullary);
        nullary.run().unwrap();

        let unary = Test::with_arg("unary", 41, |n: i32| seen.set(seen.get() + n));
        assert_eq!(unary.shape(), Shape::WithArg { arg_type: "i32" });
        unary.run().unwrap();

        struct SizeOf<'c>(&'c Cell<i32>);

        impl TypedBody for SizeOf<'_> {
            type Output = ();

            fn call<T: 'static>(self) -> Self::Output {
                self.0.set(self.0.get() + std::mem::size_of::<T>() as i32);
            }
        }

        let typed = Test::typed::<u64, _>("typed", SizeOf(&seen));
        assert_eq!(typed.shape().type_name(), Some("u64"));
        typed.run().unwrap();

        assert_eq!(seen.get(), 1 + 41 + 8);
    }

    #[test]
    fn test_run_propagates_errors() {
        let fatal = Test::new("fatal", || -> anyhow::Result<()> {
            Err(FatalAbort::new(SourceLocation::new("unit.rs", 1, 1)).into())
        });
        let err = fatal.run().unwrap_err();
        assert!(FatalAbort::is_abort(&err));

        let io = Test::new("io", || -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing fixture"))
        });
        let err = io.run().unwrap_err();
        assert!(!FatalAbort::is_abort(&err));
        assert_eq!(err.to_string(), "missing fixture");
    }

    #[test]
    fn test_categories() {
        let test = Test::new("tagged", || {})
            .category("slow")
            .categories(["io", "slow"]);
        let tags: Vec<_> = test.tags().iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["io", "slow"]);
    }

    #[test]
    fn test_suite_projections() {
        let suite = Suite::new("suite", || {});
        assert_eq!(suite.begin().name.as_str(), "suite");
        assert_eq!(suite.end(), suite.end());
        suite.run().unwrap();
    }
}
