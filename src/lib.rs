//! Library entrypoint for the crypto alert bot.
//!
//! `main.rs` only wires things together; everything else lives here so
//! integration tests under `tests/` can build an `AppState` with in-memory
//! collaborators.

use std::sync::Arc;

use tokio::sync::RwLock;

pub mod config;
pub mod error;
pub mod models;
pub mod templates;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{
    alert_monitor::TickReport, alert_store::AlertStore, price_source::PriceSource,
    telegram::Transport,
};

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub settings: config::Settings,
    pub store: Arc<dyn AlertStore>,
    pub prices: Arc<dyn PriceSource>,
    pub transport: Arc<dyn Transport>,
    pub last_tick: Arc<RwLock<Option<TickReport>>>,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        store: Arc<dyn AlertStore>,
        prices: Arc<dyn PriceSource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            hbs: templates::build_handlebars(),
            settings,
            store,
            prices,
            transport,
            last_tick: Arc::new(RwLock::new(None)),
        }
    }
}
