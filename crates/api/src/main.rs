use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;

use kopontren_auth::Hs256Jwt;
use kopontren_infra::config::{Config, LogFormat};
use kopontren_infra::notify::StoreNotifier;
use kopontren_infra::services::{ServiceSettings, Services};
use kopontren_infra::store::{Journal, MemoryJournal, PostgresJournal, Store};
use kopontren_infra::uploads::ImageStore;
use kopontren_observability::LogOutput;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kopontren_observability::init(match LogFormat::from_env() {
        LogFormat::Json => LogOutput::Json,
        LogFormat::Pretty => LogOutput::Pretty,
    });

    let config = Config::from_env().context("loading configuration")?;

    let journal: Arc<dyn Journal> = match &config.database_url {
        Some(url) => {
            let journal = PostgresJournal::connect(url, config.database_max_connections)
                .await
                .context("connecting to postgres")?;
            journal.ensure_schema().await.context("preparing database schema")?;
            tracing::info!("using postgres journal");
            Arc::new(journal)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; data lives in memory only and is lost on restart");
            Arc::new(MemoryJournal::default())
        }
    };
    let store = Store::open(journal).await.context("restoring store")?;

    let (realtime_tx, _) = broadcast::channel(256);
    let services = Services::new(
        store.clone(),
        Arc::new(Hs256Jwt::new(
            config.jwt_secret.as_bytes(),
            chrono::Duration::minutes(config.jwt_ttl_minutes),
        )),
        Arc::new(StoreNotifier::new(store, realtime_tx.clone())),
        realtime_tx,
        ImageStore::new(config.upload_dir.clone(), config.max_upload_bytes),
        ServiceSettings {
            low_stock_notify: config.low_stock_notify,
        },
    );
    services
        .bootstrap_admin(&config.admin_username, &config.admin_password)
        .await
        .context("creating bootstrap administrator")?;

    let app = kopontren_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")
}
