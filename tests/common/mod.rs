#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cryptoalert::{
    AppState,
    config::{Settings, StoreBackend},
    error::{DeliveryError, QuoteError, StorageError},
    models::{Recipient, Subscription},
    services::{
        alert_store::{AlertStore, MemoryAlertStore},
        price_source::PriceSource,
        telegram::Transport,
    },
};

/// Price source answering from a fixed table. Unknown assets fail.
#[derive(Default)]
pub struct FakePrices {
    prices: Mutex<HashMap<String, f64>>,
    failing: Mutex<HashSet<String>>,
    slow: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakePrices {
    pub fn set(&self, asset: &str, price: f64) {
        self.prices.lock().unwrap().insert(asset.to_string(), price);
    }

    pub fn fail(&self, asset: &str) {
        self.failing.lock().unwrap().insert(asset.to_string());
    }

    pub fn hang(&self, asset: &str) {
        self.slow.lock().unwrap().insert(asset.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn quote(&self, asset: &str) -> Result<f64, QuoteError> {
        self.calls.lock().unwrap().push(asset.to_string());

        let hang = self.slow.lock().unwrap().contains(asset);
        if hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing.lock().unwrap().contains(asset) {
            return Err(QuoteError::Connection("upstream down".to_string()));
        }

        self.prices
            .lock()
            .unwrap()
            .get(asset)
            .copied()
            .ok_or_else(|| QuoteError::UnsupportedAsset(asset.to_string()))
    }
}

/// Transport that records every message it accepts.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Recipient, String)>>,
    down: Mutex<bool>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(Recipient, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, recipient: Recipient, text: &str) -> Result<(), DeliveryError> {
        if *self.down.lock().unwrap() {
            return Err(DeliveryError::Connection("chat api unreachable".to_string()));
        }
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }
}

/// Store whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl AlertStore for BrokenStore {
    async fn upsert(&self, _sub: &Subscription) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn list_by_recipient(
        &self,
        _recipient: Recipient,
    ) -> Result<Vec<Subscription>, StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn list_all(&self) -> Result<Vec<Subscription>, StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn remove(&self, _recipient: Recipient, _asset: &str) -> Result<bool, StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn remove_exact(&self, _sub: &Subscription) -> Result<bool, StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryAlertStore>,
    pub prices: Arc<FakePrices>,
    pub transport: Arc<RecordingTransport>,
}

pub fn settings() -> Settings {
    let mut settings = Settings::with_token("test-token");
    settings.store_backend = StoreBackend::Memory;
    settings.quote_timeout = Duration::from_millis(200);
    settings
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryAlertStore::new());
    let prices = Arc::new(FakePrices::default());
    let transport = Arc::new(RecordingTransport::default());

    let state = AppState::new(
        settings(),
        store.clone(),
        prices.clone(),
        transport.clone(),
    );

    Harness {
        state,
        store,
        prices,
        transport,
    }
}

pub fn broken_state() -> (AppState, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let state = AppState::new(
        settings(),
        Arc::new(BrokenStore),
        Arc::new(FakePrices::default()),
        transport.clone(),
    );
    (state, transport)
}
