pub mod config;
pub mod prompt;
pub mod routes;
pub mod server;

pub use config::AppConfig;
pub use routes::{build_router, AppState};
pub use server::{start, ServerConfig, ServerHandle};
