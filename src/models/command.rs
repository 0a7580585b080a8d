use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::models::alert::{Direction, Recipient, Subscription, normalize_asset};

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    // (?s): arguments may span lines
    Regex::new(r"(?s)^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s+(.*))?$").expect("command regex")
});

/// Ticker used by `/price` when none is given.
pub const DEFAULT_ASSET: &str = "BTC";

/// One inbound chat command as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub recipient: Recipient,
    pub name: String,
    pub args: String,
}

impl InboundCommand {
    /// Splits `/name@bot rest of line` into name and argument text.
    /// Returns `None` for anything that is not a command.
    pub fn from_text(recipient: Recipient, text: &str) -> Option<Self> {
        let caps = COMMAND_RE.captures(text.trim())?;
        let name = caps.get(1)?.as_str().to_lowercase();
        let args = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Some(Self {
            recipient,
            name,
            args,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Price { asset: String },
    SetAlert(Subscription),
    ListAlerts,
    RemoveAlert { asset: String },
}

impl Command {
    pub fn parse(cmd: &InboundCommand) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = cmd.args.split_whitespace().collect();

        match cmd.name.as_str() {
            "start" | "help" => Ok(Command::Start),
            "price" | "p" => {
                let asset = parts
                    .first()
                    .map(|s| normalize_asset(s))
                    .unwrap_or_else(|| DEFAULT_ASSET.to_string());
                Ok(Command::Price { asset })
            }
            "alert" => {
                let [asset, price, direction, ..] = parts.as_slice() else {
                    return Err(ValidationError::MissingArgument("ticker, price, direction"));
                };

                let threshold: f64 = price
                    .parse()
                    .map_err(|_| ValidationError::InvalidThreshold(price.to_string()))?;
                let direction: Direction = direction.parse()?;

                Subscription::new(cmd.recipient, asset, threshold, direction).map(Command::SetAlert)
            }
            "alerts" => Ok(Command::ListAlerts),
            "unalert" => match parts.first() {
                Some(asset) => Ok(Command::RemoveAlert {
                    asset: normalize_asset(asset),
                }),
                None => Err(ValidationError::MissingArgument("ticker")),
            },
            other => Err(ValidationError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(text: &str) -> InboundCommand {
        InboundCommand::from_text(42, text).expect("command")
    }

    #[test]
    fn splits_name_and_args() {
        let c = cmd("/alert BTC 50000 above");
        assert_eq!(c.name, "alert");
        assert_eq!(c.args, "BTC 50000 above");
    }

    #[test]
    fn arguments_may_span_lines() {
        let c = cmd("/alert BTC 50000 above\nthanks!");
        assert_eq!(c.name, "alert");
        assert_eq!(c.args, "BTC 50000 above\nthanks!");
        assert!(matches!(Command::parse(&c), Ok(Command::SetAlert(_))));

        let c = cmd("/alert BTC\n50000 above");
        assert_eq!(c.args, "BTC\n50000 above");
        assert!(matches!(Command::parse(&c), Ok(Command::SetAlert(_))));

        // broken input over several lines still reaches validation
        let c = cmd("/alert BTC\nlots");
        assert!(matches!(
            Command::parse(&c),
            Err(ValidationError::MissingArgument(_))
        ));
    }

    #[test]
    fn strips_bot_mention() {
        let c = cmd("/Price@my_alert_bot eth");
        assert_eq!(c.name, "price");
        assert_eq!(c.args, "eth");
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert!(InboundCommand::from_text(1, "hello there").is_none());
        assert!(InboundCommand::from_text(1, "").is_none());
    }

    #[test]
    fn price_defaults_to_btc() {
        assert_eq!(
            Command::parse(&cmd("/p")),
            Ok(Command::Price {
                asset: "BTC".to_string()
            })
        );
    }

    #[test]
    fn alert_parses_all_fields() {
        assert_eq!(
            Command::parse(&cmd("/alert sol 150.5 BELOW")),
            Ok(Command::SetAlert(
                Subscription::new(42, "SOL", 150.5, Direction::Below).unwrap()
            ))
        );
    }

    #[test]
    fn alert_validation_errors() {
        assert!(matches!(
            Command::parse(&cmd("/alert BTC 50000")),
            Err(ValidationError::MissingArgument(_))
        ));
        assert!(matches!(
            Command::parse(&cmd("/alert BTC lots above")),
            Err(ValidationError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Command::parse(&cmd("/alert BTC -1 above")),
            Err(ValidationError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Command::parse(&cmd("/alert BTC 50000 sideways")),
            Err(ValidationError::InvalidDirection(_))
        ));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            Command::parse(&cmd("/moon")),
            Err(ValidationError::UnknownCommand("moon".to_string()))
        );
    }
}
