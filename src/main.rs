use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use mongodb::Client;

use cryptoalert::{
    AppState,
    config::{self, StoreBackend},
    controllers::commands_controller,
    routes,
    services::{
        alert_monitor,
        alert_store::{AlertStore, MemoryAlertStore, MongoAlertStore},
        db_init,
        price_source::CoinGeckoClient,
        telegram::TelegramClient,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let settings = match config::load() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn AlertStore> = match settings.store_backend {
        StoreBackend::Mongo => {
            let client = match Client::with_uri_str(&settings.mongodb_uri).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "failed to connect to MongoDB");
                    return ExitCode::FAILURE;
                }
            };
            let db = client.database(&settings.mongodb_db);
            if let Err(e) = db_init::ensure_indexes(&db).await {
                tracing::error!(error = %e, "failed to initialise the alert collection");
                return ExitCode::FAILURE;
            }
            tracing::info!(db = %settings.mongodb_db, "alert store ready (mongodb)");
            Arc::new(MongoAlertStore::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory alert store, alerts are lost on restart");
            Arc::new(MemoryAlertStore::new())
        }
    };

    let prices = match CoinGeckoClient::new(
        &settings.price_api_base,
        &settings.price_currency,
        settings.price_assets.clone(),
        settings.quote_timeout,
    ) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!(error = %e, "failed to build price client");
            return ExitCode::FAILURE;
        }
    };

    let telegram = TelegramClient::new(&settings.telegram_api_base, &settings.telegram_token);
    match telegram.get_me().await {
        Ok(me) => tracing::info!(
            id = me.id,
            username = me.username.as_deref().unwrap_or("?"),
            "authorized"
        ),
        Err(e) => tracing::warn!(error = %e, "getMe failed, continuing"),
    }

    let state = AppState::new(
        settings.clone(),
        store,
        prices,
        Arc::new(telegram.clone()),
    );

    alert_monitor::spawn_price_alert_monitor(state.clone());
    tokio::spawn(commands_controller::run_dispatcher(
        state.clone(),
        telegram.receive(),
    ));

    let ip = match settings.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            tracing::error!(host = %settings.host, error = %e, "invalid HOST");
            return ExitCode::FAILURE;
        }
    };
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("health endpoint on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind health endpoint");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, routes::app(state)).await {
        tracing::error!(error = %e, "health server stopped");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
