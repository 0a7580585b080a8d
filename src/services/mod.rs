pub mod alert_store;
pub mod db_init;
pub mod price_source;
pub mod telegram;
pub mod alert_monitor;
