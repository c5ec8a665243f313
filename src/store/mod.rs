use std::future::Future;
use std::num::NonZeroU64;

use serde::Serialize;
use snafu::{Location, Snafu};

use crate::time::{serialize_rfc3339, Timestamp};

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

/// In-process store backed by a concurrent hash map.
pub mod memory;

/// Durable store backed by SurrealDB.
pub mod surreal;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("cannot connect to the store `{url}` at {location}: {source}"))]
    Connect {
        url: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot sign in to the store as `{username}` at {location}: {source}"))]
    SignIn {
        username: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("store did not pass its health check at {location}: {source}"))]
    UnhealthyStore {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot apply the schema for table `{table}` at {location}: {source}"))]
    Schema {
        table: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{table}` is not a valid table name, expected [A-Za-z_][A-Za-z0-9_]*"))]
    InvalidTable {
        table: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to query the store at {location}: {source}"))]
    Query {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to deserialize the store response at {location}: {source}"))]
    Deserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("store operation `{operation}` did not finish within {}", humantime::format_duration(*after)))]
    Timeout {
        operation: &'static str,
        after: std::time::Duration,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Count of clicks for a single banner inside one minute bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatPoint {
    #[serde(rename = "ts", serialize_with = "serialize_rfc3339")]
    pub bucket: Timestamp,
    #[serde(rename = "v")]
    pub count: u64,
}

/// Count of clicks for any banner inside one minute bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerStatPoint {
    #[serde(rename = "bannerId")]
    pub banner_id: String,
    #[serde(rename = "ts", serialize_with = "serialize_rfc3339")]
    pub bucket: Timestamp,
    #[serde(rename = "v")]
    pub count: u64,
}

/// Durable mapping from `(banner, minute bucket)` to a click count.
///
/// Implementations must make [ClickStore::increment] a single atomic create-or-increment so
/// that concurrent clicks on the same banner never undercount. Range bounds are half-open:
/// `from` is inclusive and `to` is exclusive.
pub trait ClickStore: Clone + Send + Sync + 'static {
    /// Add `delta` to the counter of `banner` in `bucket`, creating the counter if it does not exist yet.
    fn increment(
        &self, banner: &str, bucket: Timestamp, delta: NonZeroU64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Counters of a single banner with `from <= bucket < to`, ascending by bucket.
    fn range(
        &self, banner: &str, from: Timestamp, to: Timestamp,
    ) -> impl Future<Output = Result<Vec<StatPoint>>> + Send;

    /// Counters of every banner with `from <= bucket < to`, ascending by banner then bucket.
    fn range_all(
        &self, from: Timestamp, to: Timestamp,
    ) -> impl Future<Output = Result<Vec<BannerStatPoint>>> + Send;

    /// Release the underlying connection.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}
