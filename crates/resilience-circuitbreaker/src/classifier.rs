//! Error classification for circuit breaker decisions.
//!
//! The core never sees the caller's success value or the body of their
//! error — it only learns about outcomes through `on_success`/`on_error`.
//! An [`ErrorClassifier`] lets the caller decide, given the error they are
//! about to report through `on_error`, whether it should count toward the
//! failure rate at all. This is how business exceptions ("not found",
//! validation errors) are kept from tripping the breaker while transport
//! and timeout errors still do.

use std::sync::Arc;

/// How a reported error should be treated by the sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// Count this call as a failure.
    Failed,
    /// Discard this call entirely; it affects neither the failure rate nor
    /// the total call count.
    Ignored,
}

/// Classifies a caller-supplied error as a counted failure or an ignored
/// outcome.
pub trait ErrorClassifier<E>: Send + Sync {
    /// Determines how `error` should be recorded.
    ///
    /// Called through `catch_unwind` by the breaker, so a panicking
    /// implementation cannot poison the breaker's internal lock -- the
    /// breaker treats a panic here the same as [`CallOutcome::Ignored`].
    fn classify(&self, error: &E) -> CallOutcome;
}

/// The default classifier: every error is a counted failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<E> ErrorClassifier<E> for DefaultClassifier {
    fn classify(&self, _error: &E) -> CallOutcome {
        CallOutcome::Failed
    }
}

/// An error classifier backed by a closure.
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    /// Creates a new `FnClassifier` from the given closure.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, E> ErrorClassifier<E> for FnClassifier<F>
where
    F: Fn(&E) -> CallOutcome + Send + Sync,
{
    fn classify(&self, error: &E) -> CallOutcome {
        (self.f)(error)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NotFound;
    #[derive(Debug)]
    struct Timeout;

    #[test]
    fn default_classifier_always_counts_as_failure() {
        let classifier = DefaultClassifier;
        assert_eq!(classifier.classify(&NotFound), CallOutcome::Failed);
        assert_eq!(classifier.classify(&Timeout), CallOutcome::Failed);
    }

    #[test]
    fn fn_classifier_can_ignore_selected_errors() {
        #[derive(Debug)]
        enum AppError {
            NotFound,
            Timeout,
        }

        let classifier = FnClassifier::new(|e: &AppError| match e {
            AppError::NotFound => CallOutcome::Ignored,
            AppError::Timeout => CallOutcome::Failed,
        });

        assert_eq!(
            classifier.classify(&AppError::NotFound),
            CallOutcome::Ignored
        );
        assert_eq!(classifier.classify(&AppError::Timeout), CallOutcome::Failed);
    }
}
