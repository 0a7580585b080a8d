use handlebars::Handlebars;
use serde_json::json;
use std::sync::Arc;

use crate::models::{Direction, Subscription};

pub type Hbs = Arc<Handlebars<'static>>;

const START: &str = "Hi! I'm your crypto bot 🤖\n\
I can show current cryptocurrency prices and ping you when a price crosses a level.\n\n\
Commands:\n\
/price [ticker] - current price\n\
/alert [ticker] [price] [above/below] - set an alert\n\
/alerts - list your alerts\n\
/unalert [ticker] - remove an alert\n\
Example: /alert BTC 50000 above";

const PRICE: &str = "💰 {{asset}}: ${{price}}";

const ALERT_SET: &str =
    "✅ Alert set! I'll tell you when {{asset}} goes {{direction}} ${{threshold}}.";

const ALERTS_LIST: &str = "{{#if alerts}}Your alerts:\n\
{{#each alerts}}• {{asset}} {{direction}} ${{threshold}}\n{{/each}}\
{{else}}You have no alerts. Set one with /alert BTC 50000 above{{/if}}";

const ALERT_REMOVED: &str = "{{#if removed}}🗑 Alert for {{asset}} removed.\
{{else}}You had no alert for {{asset}}.{{/if}}";

const FIRED_ABOVE: &str = "🚀 {{asset}} reached ${{threshold}} (current: ${{price}})";
const FIRED_BELOW: &str = "🔻 {{asset}} dropped to ${{threshold}} (current: ${{price}})";

pub const QUOTE_UNAVAILABLE: &str = "Sorry, I can't get the price right now 😕 Try again later.";
pub const STORAGE_FAILURE: &str = "Something went wrong while saving. Please try again.";

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();
    // Chat messages are plain text, not HTML.
    hb.register_escape_fn(handlebars::no_escape);

    let templates = [
        ("start", START),
        ("price", PRICE),
        ("alert_set", ALERT_SET),
        ("alerts_list", ALERTS_LIST),
        ("alert_removed", ALERT_REMOVED),
        ("fired_above", FIRED_ABOVE),
        ("fired_below", FIRED_BELOW),
    ];
    for (name, src) in templates {
        if let Err(e) = hb.register_template_string(name, src) {
            tracing::error!(template = name, error = %e, "template failed to compile");
        }
    }

    Arc::new(hb)
}

/// Two decimals from 1 up; below that, enough decimals for five
/// significant digits with trailing zeros dropped (`0.0000213`).
fn fmt_price(x: f64) -> String {
    if !x.is_finite() || x <= 0.0 || x >= 1.0 {
        return format!("{:.2}", x);
    }

    let decimals = (-x.log10().floor()) as usize + 4;
    let s = format!("{:.*}", decimals, x);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn render(hb: &Hbs, tpl: &str, ctx: serde_json::Value) -> String {
    hb.render(tpl, &ctx)
        .unwrap_or_else(|e| format!("template error: {e}"))
}

pub fn start(hb: &Hbs) -> String {
    render(hb, "start", json!({}))
}

pub fn price(hb: &Hbs, asset: &str, price: f64) -> String {
    render(hb, "price", json!({ "asset": asset, "price": fmt_price(price) }))
}

pub fn alert_set(hb: &Hbs, sub: &Subscription) -> String {
    render(
        hb,
        "alert_set",
        json!({
            "asset": sub.asset(),
            "direction": sub.direction().as_str(),
            "threshold": fmt_price(sub.threshold()),
        }),
    )
}

pub fn alerts_list(hb: &Hbs, subs: &[Subscription]) -> String {
    let items: Vec<serde_json::Value> = subs
        .iter()
        .map(|s| {
            json!({
                "asset": s.asset(),
                "direction": s.direction().as_str(),
                "threshold": fmt_price(s.threshold()),
            })
        })
        .collect();

    render(hb, "alerts_list", json!({ "alerts": items }))
}

pub fn alert_removed(hb: &Hbs, asset: &str, removed: bool) -> String {
    render(
        hb,
        "alert_removed",
        json!({ "asset": asset, "removed": removed }),
    )
}

/// Notification for a fired subscription: names the asset, the threshold
/// and the observed price.
pub fn alert_fired(hb: &Hbs, sub: &Subscription, price: f64) -> String {
    let tpl = match sub.direction() {
        Direction::Above => "fired_above",
        Direction::Below => "fired_below",
    };

    render(
        hb,
        tpl,
        json!({
            "asset": sub.asset(),
            "threshold": fmt_price(sub.threshold()),
            "price": fmt_price(price),
        }),
    )
}
