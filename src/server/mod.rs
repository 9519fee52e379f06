pub mod config;
mod entry_routes;
mod http_layers;
pub mod metrics;
pub mod server;
pub mod state;
mod trackback_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::run_server;
