//! Bounded retry for generate-then-insert loops.
//!
//! Generated identifiers are only candidates; the store's unique constraints
//! decide. A store conflict is retried with a fresh candidate, every other
//! error is returned at once.

use std::future::Future;

use serde_json::json;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use super::code_generator::MAX_GENERATION_ATTEMPTS;
use crate::error::AppError;

/// Runs `action` until it succeeds, fails with a non-conflict error, or
/// [`MAX_GENERATION_ATTEMPTS`] attempts have collided.
///
/// # Errors
///
/// Returns [`AppError::Internal`] once all attempts collided; any other error
/// from `action` is returned unchanged.
pub async fn retry_on_conflict<T, A, F>(what: &'static str, action: A) -> Result<T, AppError>
where
    A: FnMut() -> F,
    F: Future<Output = Result<T, AppError>>,
{
    let strategy = FixedInterval::from_millis(0).take(MAX_GENERATION_ATTEMPTS - 1);

    RetryIf::spawn(strategy, action, |e: &AppError| {
        let collided = e.is_conflict();
        if collided {
            tracing::warn!(what, constraint = ?e.constraint(), "identifier collision, retrying");
        }
        collided
    })
    .await
    .map_err(|e| {
        if e.is_conflict() {
            AppError::internal(
                format!("Failed to generate unique {what}"),
                json!({ "reason": "Too many collisions", "attempts": MAX_GENERATION_ATTEMPTS }),
            )
        } else {
            e
        }
    })
}
