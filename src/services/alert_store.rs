use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::doc,
    options::ReplaceOptions,
};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::models::{Recipient, Subscription};
use crate::services::db_init::ALERTS_COLLECTION;

/// Durable set of subscriptions keyed by `(recipient, asset)`.
///
/// Every method is atomic on its own; callers must not assume atomicity
/// across calls.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Inserts or fully replaces the row for `(recipient, asset)`.
    async fn upsert(&self, sub: &Subscription) -> Result<(), StorageError>;

    async fn list_by_recipient(&self, recipient: Recipient)
    -> Result<Vec<Subscription>, StorageError>;

    async fn list_all(&self) -> Result<Vec<Subscription>, StorageError>;

    /// Returns whether a row was deleted. Absent rows are not an error.
    async fn remove(&self, recipient: Recipient, asset: &str) -> Result<bool, StorageError>;

    /// Deletes the row only if threshold and direction still match `sub`,
    /// so a replace that lands after a sweep read it survives.
    async fn remove_exact(&self, sub: &Subscription) -> Result<bool, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct MongoAlertStore {
    db: Database,
    alerts: Collection<Subscription>,
}

impl MongoAlertStore {
    pub fn new(db: Database) -> Self {
        let alerts = db.collection::<Subscription>(ALERTS_COLLECTION);
        Self { db, alerts }
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn upsert(&self, sub: &Subscription) -> Result<(), StorageError> {
        let opts = ReplaceOptions::builder().upsert(true).build();

        self.alerts
            .replace_one(
                doc! { "recipient": sub.recipient(), "asset": sub.asset() },
                sub,
                opts,
            )
            .await?;

        Ok(())
    }

    async fn list_by_recipient(
        &self,
        recipient: Recipient,
    ) -> Result<Vec<Subscription>, StorageError> {
        let cursor = self
            .alerts
            .find(doc! { "recipient": recipient }, None)
            .await?;

        let items: Vec<Subscription> = cursor.try_collect().await?;
        Ok(items)
    }

    async fn list_all(&self) -> Result<Vec<Subscription>, StorageError> {
        let cursor = self.alerts.find(doc! {}, None).await?;

        let items: Vec<Subscription> = cursor.try_collect().await?;
        Ok(items)
    }

    async fn remove(&self, recipient: Recipient, asset: &str) -> Result<bool, StorageError> {
        let res = self
            .alerts
            .delete_one(doc! { "recipient": recipient, "asset": asset }, None)
            .await?;

        Ok(res.deleted_count > 0)
    }

    async fn remove_exact(&self, sub: &Subscription) -> Result<bool, StorageError> {
        let res = self
            .alerts
            .delete_one(
                doc! {
                    "recipient": sub.recipient(),
                    "asset": sub.asset(),
                    "threshold": sub.threshold(),
                    "direction": sub.direction().as_str(),
                },
                None,
            )
            .await?;

        Ok(res.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryAlertStore {
    rows: RwLock<HashMap<(Recipient, String), Subscription>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn upsert(&self, sub: &Subscription) -> Result<(), StorageError> {
        self.rows
            .write()
            .await
            .insert((sub.recipient(), sub.asset().to_string()), sub.clone());
        Ok(())
    }

    async fn list_by_recipient(
        &self,
        recipient: Recipient,
    ) -> Result<Vec<Subscription>, StorageError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|s| s.recipient() == recipient)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Subscription>, StorageError> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn remove(&self, recipient: Recipient, asset: &str) -> Result<bool, StorageError> {
        Ok(self
            .rows
            .write()
            .await
            .remove(&(recipient, asset.to_string()))
            .is_some())
    }

    async fn remove_exact(&self, sub: &Subscription) -> Result<bool, StorageError> {
        let mut rows = self.rows.write().await;
        let key = (sub.recipient(), sub.asset().to_string());

        if rows.get(&key).is_some_and(|current| current == sub) {
            rows.remove(&key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
