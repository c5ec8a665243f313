pub mod api;
pub mod config;
pub mod error;
pub mod logger;
pub mod server;
pub mod store;
pub mod time;

pub mod prelude {
    pub use crate::api::{create_router, App};
    pub use crate::config::Config;
    pub use crate::store::{ClickStore, MemoryStore, SurrealStore};
    pub use crate::time::{minute_bucket, Timestamp};
}
