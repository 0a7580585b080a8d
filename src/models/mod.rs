pub mod alert;
pub mod command;

pub use alert::{Direction, Recipient, Subscription};
pub use command::{Command, InboundCommand};
