//! Outcome classification
//!
//! Decides, for each attempt, whether the call is finished or should run
//! again. Error predicates see the error as `&dyn Error`, so one classifier
//! serves every decorated shape, including boxed errors from checked
//! computations. Type-based predicates walk the `source()` chain.

use std::any::{type_name, Any};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use rebound_common::error::{chain_contains, find_in_chain, ErrorClassification};
use tracing::debug;

/// Predicate over a failed attempt's error
pub type ErrorPredicate = Arc<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;

/// Predicate over a successful attempt's value, type-erased
pub type ResultPredicate = Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// How a finished attempt is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Accepted value
    Success,
    /// Error configured to count as success; not retried
    Ignored,
    /// Failure that may be retried while attempts remain
    Retryable,
    /// Failure that ends the call immediately
    Terminal,
}

/// Ignore and retry-on predicate sets
///
/// Ignore predicates take precedence. With no retry-on predicates every
/// non-ignored error is retryable; otherwise an error must match one of them.
#[derive(Clone, Default)]
pub struct OutcomeClassifier {
    retry_on: Vec<ErrorPredicate>,
    ignore: Vec<ErrorPredicate>,
}

impl OutcomeClassifier {
    /// Classifier that retries on any error
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an attempt. `None` means the attempt produced a value.
    #[must_use]
    pub fn classify(&self, error: Option<&(dyn StdError + 'static)>) -> Outcome {
        let Some(error) = error else {
            return Outcome::Success;
        };
        if self.ignore.iter().any(|p| p(error)) {
            Outcome::Ignored
        } else if self.retry_on.is_empty() || self.retry_on.iter().any(|p| p(error)) {
            Outcome::Retryable
        } else {
            Outcome::Terminal
        }
    }

    /// Whether any retry-on predicate has been configured
    #[must_use]
    pub fn is_selective(&self) -> bool {
        !self.retry_on.is_empty()
    }

    pub(crate) fn push_retry_on(&mut self, predicate: ErrorPredicate) {
        self.retry_on.push(predicate);
    }

    pub(crate) fn push_ignore(&mut self, predicate: ErrorPredicate) {
        self.ignore.push(predicate);
    }
}

impl fmt::Debug for OutcomeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeClassifier")
            .field("retry_on", &self.retry_on.len())
            .field("ignore", &self.ignore.len())
            .finish()
    }
}

pub(crate) fn predicate<F>(f: F) -> ErrorPredicate
where
    F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn type_predicate<T>() -> ErrorPredicate
where
    T: StdError + 'static,
{
    predicate(chain_contains::<T>)
}

pub(crate) fn typed_predicate<T, F>(f: F) -> ErrorPredicate
where
    T: StdError + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    predicate(move |error| find_in_chain::<T>(error).is_some_and(&f))
}

pub(crate) fn classified_predicate<T>() -> ErrorPredicate
where
    T: StdError + ErrorClassification + 'static,
{
    predicate(|error| find_in_chain::<T>(error).is_some_and(|found| found.is_retryable()))
}

pub(crate) fn result_predicate<T, F>(f: F) -> ResultPredicate
where
    T: 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(move |value: &dyn Any| match value.downcast_ref::<T>() {
        Some(value) => f(value),
        None => {
            debug!(
                predicate_type = type_name::<T>(),
                "result predicate skipped for value of another type"
            );
            false
        }
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for outcome classification.
    use std::io;

    use rebound_common::CommonError;

    use super::*;

    #[derive(Debug)]
    struct Outer(io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    /// Validates the default classifier.
    ///
    /// Assertions:
    /// - No error is success.
    /// - Any error is retryable.
    #[test]
    fn test_default_retries_everything() {
        let classifier = OutcomeClassifier::new();
        let err = io::Error::other("boom");
        assert_eq!(classifier.classify(None), Outcome::Success);
        assert_eq!(classifier.classify(Some(&err)), Outcome::Retryable);
        assert!(!classifier.is_selective());
    }

    /// Validates that ignore wins over retry-on.
    ///
    /// Assertions:
    /// - An error matching both sets is ignored.
    #[test]
    fn test_ignore_takes_precedence() {
        let mut classifier = OutcomeClassifier::new();
        classifier.push_retry_on(type_predicate::<io::Error>());
        classifier.push_ignore(typed_predicate::<io::Error, _>(|e| {
            e.kind() == io::ErrorKind::NotFound
        }));

        let missing = io::Error::from(io::ErrorKind::NotFound);
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(classifier.classify(Some(&missing)), Outcome::Ignored);
        assert_eq!(classifier.classify(Some(&reset)), Outcome::Retryable);
    }

    /// Validates that a selective classifier treats unmatched errors as
    /// terminal.
    ///
    /// Assertions:
    /// - A `CommonError` is terminal when only `io::Error` is retried.
    #[test]
    fn test_unmatched_error_is_terminal() {
        let mut classifier = OutcomeClassifier::new();
        classifier.push_retry_on(type_predicate::<io::Error>());

        let err = CommonError::config("bad");
        assert_eq!(classifier.classify(Some(&err)), Outcome::Terminal);
    }

    /// Validates type predicates through wrapped errors.
    ///
    /// Assertions:
    /// - An `io::Error` nested as a source still matches.
    #[test]
    fn test_type_predicate_walks_sources() {
        let mut classifier = OutcomeClassifier::new();
        classifier.push_retry_on(type_predicate::<io::Error>());

        let wrapped = Outer(io::Error::other("inner"));
        assert_eq!(classifier.classify(Some(&wrapped)), Outcome::Retryable);
    }

    /// Validates classification via `ErrorClassification`.
    ///
    /// Assertions:
    /// - Retryable `CommonError`s match; non-retryable ones do not.
    #[test]
    fn test_classified_predicate() {
        let mut classifier = OutcomeClassifier::new();
        classifier.push_retry_on(classified_predicate::<CommonError>());

        let timeout = CommonError::timeout("op", std::time::Duration::from_millis(1));
        let config = CommonError::config("bad");
        assert_eq!(classifier.classify(Some(&timeout)), Outcome::Retryable);
        assert_eq!(classifier.classify(Some(&config)), Outcome::Terminal);
    }

    /// Validates type-erased result predicates.
    ///
    /// Assertions:
    /// - Matching type and predicate returns true.
    /// - Values of other types are never rejected.
    #[test]
    fn test_result_predicate_downcasts() {
        let reject_empty = result_predicate::<String, _>(String::is_empty);
        assert!(reject_empty(&String::new() as &dyn Any));
        assert!(!reject_empty(&"ok".to_string() as &dyn Any));
        assert!(!reject_empty(&42_u32 as &dyn Any));
    }
}
