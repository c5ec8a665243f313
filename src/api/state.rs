use std::future::Future;
use std::time::Duration;

use derive_new::new;
use snafu::ResultExt as _;

use super::error::{ApiError, StorageUnavailableSnafu};
use crate::config::Deadlines;
use crate::store::{self, ClickStore, TimeoutSnafu};

/// Shared state of every handler: the store handle and the per-operation deadlines.
///
/// Holds no mutable state of its own, the store is the only synchronization point.
#[derive(Debug, Clone, new)]
pub struct App<S> {
    pub store: S,
    #[new(default)]
    pub deadlines: Deadlines,
}

impl<S: ClickStore> App<S> {
    pub fn with_deadlines(store: S, deadlines: Deadlines) -> Self {
        Self { store, deadlines }
    }
}

/// Run a store call with an upper bound on its duration. An expired bound is reported as an
/// unavailable store, the abandoned call is not retried.
pub(super) async fn bounded<T>(
    operation: &'static str, after: Duration, call: impl Future<Output = store::Result<T>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(after, call)
        .await
        .unwrap_or_else(|_| TimeoutSnafu { operation, after }.fail())
        .context(StorageUnavailableSnafu)
}
