use dotenvy::dotenv;
use snafu::ResultExt as _;

use clickstats::error::{ApplicationError, ConfigLoadSnafu, ConnectStoreSnafu};
use clickstats::prelude::*;
use clickstats::{logger, server};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env().context(ConfigLoadSnafu)?;

    let _guard = logger::init(&config.server)?;

    let store = SurrealStore::connect(&config.store)
        .await
        .context(ConnectStoreSnafu)?;
    tracing::info!(table = store.table(), "store is ready");

    let app = App::with_deadlines(store.clone(), config.server.deadlines);
    let router = create_router(app);

    let listener = server::bind(config.server.http_addr).await?;
    tracing::info!(address = %config.server.http_addr, "listening");

    let served = server::serve(
        listener,
        router,
        server::shutdown_signal(),
        config.server.shutdown_grace,
    )
    .await;

    if let Err(error) = store.close().await {
        tracing::error!(%error, "failed to close the store");
    }

    tracing::info!("shutdown complete");
    served
}
