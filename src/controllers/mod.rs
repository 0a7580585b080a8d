pub mod commands_controller;
pub mod health_controller;
