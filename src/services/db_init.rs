use mongodb::{Database, IndexModel, bson::doc, options::IndexOptions};

use crate::error::StorageError;

pub const ALERTS_COLLECTION: &str = "user_alerts";

pub async fn ensure_indexes(db: &Database) -> Result<(), StorageError> {
    // user_alerts: unique per (recipient, asset)
    let col = db.collection::<mongodb::bson::Document>(ALERTS_COLLECTION);
    let model = IndexModel::builder()
        .keys(doc! { "recipient": 1, "asset": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    col.create_index(model, None).await?;

    Ok(())
}
