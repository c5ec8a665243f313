use std::num::NonZeroU64;

use serde::Deserialize;
use snafu::{ensure, ResultExt as _};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth;
use surrealdb::sql::Datetime;
use surrealdb::Surreal;
use tracing::instrument;

use super::*;
use crate::config::StoreConfig;

/// Creates the record if it does not exist, otherwise adds `$delta` to it. The record id is the
/// `[banner, bucket]` pair so one statement is all it takes and the store serializes concurrent writers.
const INCREMENT: &str = "UPDATE type::thing($table, [$banner, $bucket]) \
     SET banner = $banner, bucket = $bucket, count += $delta \
     RETURN NONE";

const RANGE: &str = "SELECT bucket, count FROM type::table($table) \
     WHERE banner = $banner AND bucket >= $from AND bucket < $to \
     ORDER BY bucket ASC";

const RANGE_ALL: &str = "SELECT banner, bucket, count FROM type::table($table) \
     WHERE bucket >= $from AND bucket < $to \
     ORDER BY banner ASC, bucket ASC";

/// A [ClickStore] persisted in a SurrealDB table.
#[derive(Debug, Clone)]
pub struct SurrealStore {
    database: Surreal<Any>,
    table: String,
}

impl SurrealStore {
    /// Connects to the store described by `config` and makes sure the table's unique index exists.
    ///
    /// The whole handshake is bounded by [StoreConfig::connect_timeout].
    #[instrument(skip_all, fields(url = %config.url, ns = %config.namespace, db = %config.database, table = %config.table))]
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let after = config.connect_timeout;

        tokio::time::timeout(after, Self::handshake(config))
            .await
            .map_err(|_| {
                TimeoutSnafu {
                    operation: "connect",
                    after,
                }
                .build()
            })?
    }

    async fn handshake(config: &StoreConfig) -> Result<Self> {
        let table = config.table.clone();
        ensure!(is_identifier(&table), InvalidTableSnafu { table });

        let database = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .context(ConnectSnafu {
                url: config.url.to_string(),
            })?;

        if let Some(credentials) = &config.credentials {
            database
                .signin(auth::Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &credentials.username,
                    password: &credentials.password,
                })
                .await
                .context(SignInSnafu {
                    username: credentials.username.clone(),
                })?;
        }

        database
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context(ConnectSnafu {
                url: config.url.to_string(),
            })?;

        database.health().await.context(UnhealthyStoreSnafu)?;

        let store = Self { database, table };
        store.define_schema().await?;

        tracing::info!("connected to the store");
        Ok(store)
    }

    async fn define_schema(&self) -> Result<()> {
        let table = &self.table;
        let schema = format!(
            "DEFINE TABLE {table} SCHEMALESS;\n\
             DEFINE INDEX {table}_banner_bucket ON TABLE {table} COLUMNS banner, bucket UNIQUE;"
        );

        self.database
            .query(schema)
            .await
            .and_then(|response| response.check())
            .context(SchemaSnafu {
                table: table.clone(),
            })?;

        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Deserialize)]
struct BucketRow {
    bucket: Datetime,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct BannerBucketRow {
    banner: String,
    bucket: Datetime,
    count: u64,
}

impl ClickStore for SurrealStore {
    #[instrument(skip(self))]
    async fn increment(&self, banner: &str, bucket: Timestamp, delta: NonZeroU64) -> Result<()> {
        self.database
            .query(INCREMENT)
            .bind(("table", &self.table))
            .bind(("banner", banner))
            .bind(("bucket", Datetime::from(bucket)))
            .bind(("delta", delta.get()))
            .await
            .and_then(|response| response.check())
            .context(QuerySnafu)?;

        tracing::debug!("incremented counter");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn range(&self, banner: &str, from: Timestamp, to: Timestamp) -> Result<Vec<StatPoint>> {
        let mut response = self
            .database
            .query(RANGE)
            .bind(("table", &self.table))
            .bind(("banner", banner))
            .bind(("from", Datetime::from(from)))
            .bind(("to", Datetime::from(to)))
            .await
            .context(QuerySnafu)?;

        let rows: Vec<BucketRow> = response.take(0).context(DeserializeSnafu)?;
        tracing::debug!(rows = rows.len(), "fetched banner stats");

        Ok(rows
            .into_iter()
            .map(|row| StatPoint {
                bucket: row.bucket.0,
                count: row.count,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn range_all(&self, from: Timestamp, to: Timestamp) -> Result<Vec<BannerStatPoint>> {
        let mut response = self
            .database
            .query(RANGE_ALL)
            .bind(("table", &self.table))
            .bind(("from", Datetime::from(from)))
            .bind(("to", Datetime::from(to)))
            .await
            .context(QuerySnafu)?;

        let rows: Vec<BannerBucketRow> = response.take(0).context(DeserializeSnafu)?;
        tracing::debug!(rows = rows.len(), "fetched stats of all banners");

        Ok(rows
            .into_iter()
            .map(|row| BannerStatPoint {
                banner_id: row.banner,
                bucket: row.bucket.0,
                count: row.count,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<()> {
        self.database.invalidate().await.context(QuerySnafu)?;
        tracing::info!("closed the store connection");
        Ok(())
    }
}
