use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::ValidationError;
use crate::models::{Command, InboundCommand, Recipient, Subscription};
use crate::{AppState, templates};

/// Consumes the inbound command stream until the transport closes it.
///
/// Each command runs on its own task so a slow quote for one chat does not
/// hold up replies to others; replies within one chat are not ordered.
/// Returns once the stream is closed and every in-flight command finished.
pub async fn run_dispatcher(state: AppState, mut rx: mpsc::UnboundedReceiver<InboundCommand>) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                tasks.spawn(dispatch_one(state.clone(), cmd));
            }
            Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = res {
                    tracing::error!(error = %e, "command task failed");
                }
            }
            else => break,
        }
    }

    tracing::info!("inbound command stream closed");
}

async fn dispatch_one(state: AppState, cmd: InboundCommand) {
    let recipient = cmd.recipient;
    tracing::debug!(recipient, command = %cmd.name, "command received");

    let reply = handle_command(&state, &cmd).await;

    if let Err(e) = state.transport.send(recipient, &reply).await {
        tracing::warn!(recipient, error = %e, "failed to send reply");
    }
}

/// Turns one command into its reply text. Never fails: validation, quote
/// and storage errors all become user-facing messages.
pub async fn handle_command(state: &AppState, cmd: &InboundCommand) -> String {
    let command = match Command::parse(cmd) {
        Ok(c) => c,
        Err(e) => return validation_reply(&e),
    };

    match command {
        Command::Start => templates::start(&state.hbs),
        Command::Price { asset } => get_price(state, &asset).await,
        Command::SetAlert(sub) => set_alert(state, sub).await,
        Command::ListAlerts => list_alerts(state, cmd.recipient).await,
        Command::RemoveAlert { asset } => remove_alert(state, cmd.recipient, &asset).await,
    }
}

fn validation_reply(e: &ValidationError) -> String {
    tracing::debug!(error = %e, "rejected command");
    e.user_message().to_string()
}

async fn get_price(state: &AppState, asset: &str) -> String {
    let res = tokio::time::timeout(state.settings.quote_timeout, state.prices.quote(asset)).await;

    match res {
        Ok(Ok(price)) => templates::price(&state.hbs, asset, price),
        Ok(Err(e)) => {
            tracing::warn!(asset, error = %e, "price lookup failed");
            templates::QUOTE_UNAVAILABLE.to_string()
        }
        Err(_) => {
            tracing::warn!(asset, "price lookup timed out");
            templates::QUOTE_UNAVAILABLE.to_string()
        }
    }
}

async fn set_alert(state: &AppState, sub: Subscription) -> String {
    match state.store.upsert(&sub).await {
        Ok(()) => {
            tracing::info!(
                recipient = sub.recipient(),
                asset = %sub.asset(),
                threshold = sub.threshold(),
                direction = %sub.direction(),
                "alert saved"
            );
            templates::alert_set(&state.hbs, &sub)
        }
        Err(e) => {
            tracing::error!(recipient = sub.recipient(), error = %e, "failed to save alert");
            templates::STORAGE_FAILURE.to_string()
        }
    }
}

async fn list_alerts(state: &AppState, recipient: Recipient) -> String {
    match state.store.list_by_recipient(recipient).await {
        Ok(mut subs) => {
            subs.sort_by(|a, b| a.asset().cmp(b.asset()));
            templates::alerts_list(&state.hbs, &subs)
        }
        Err(e) => {
            tracing::error!(recipient, error = %e, "failed to list alerts");
            templates::STORAGE_FAILURE.to_string()
        }
    }
}

async fn remove_alert(state: &AppState, recipient: Recipient, asset: &str) -> String {
    match state.store.remove(recipient, asset).await {
        Ok(removed) => templates::alert_removed(&state.hbs, asset, removed),
        Err(e) => {
            tracing::error!(recipient, asset, error = %e, "failed to remove alert");
            templates::STORAGE_FAILURE.to_string()
        }
    }
}
