pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod module;
pub mod queue;
