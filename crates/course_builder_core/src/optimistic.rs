//! crates/course_builder_core/src/optimistic.rs
//!
//! The snapshot / apply / confirm / restore cycle shared by every mutation the
//! controller performs ahead of storage.

use std::future::Future;

use tokio::sync::Mutex;

/// What happened to an optimistic mutation.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<E> {
    /// `apply` found nothing to change; no remote call was made.
    Skipped,
    /// The remote call succeeded and the local change stands.
    Confirmed,
    /// The remote call failed and the snapshot was put back.
    RolledBack(E),
}

/// Applies a local change, publishes it, then confirms it remotely.
///
/// `apply` mutates the state and returns the snapshot needed to undo the change
/// together with the request for `remote`, or `None` to skip. The lock is only
/// held while applying and restoring, never across the remote call, so other
/// intents keep flowing while it is in flight.
pub async fn apply_optimistically<S, Snap, Req, Fut, E>(
    state: &Mutex<S>,
    apply: impl FnOnce(&mut S) -> Option<(Snap, Req)>,
    publish: impl Fn(&S),
    remote: impl FnOnce(Req) -> Fut,
    restore: impl FnOnce(&mut S, Snap),
) -> Outcome<E>
where
    Fut: Future<Output = Result<(), E>>,
{
    let (snapshot, request) = {
        let mut guard = state.lock().await;
        match apply(&mut *guard) {
            Some(applied) => {
                publish(&*guard);
                applied
            }
            None => return Outcome::Skipped,
        }
    };

    match remote(request).await {
        Ok(()) => Outcome::Confirmed,
        Err(e) => {
            let mut guard = state.lock().await;
            restore(&mut *guard, snapshot);
            publish(&*guard);
            Outcome::RolledBack(e)
        }
    }
}
