pub mod api;
pub mod config;
pub mod db;
pub mod events;
pub mod models;
pub mod node;
pub mod state;
pub mod sync;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::route::create_router;
pub use config::Config;
pub use db::connection;
pub use models::{Address, Receivable, Transaction};
pub use node::{HttpNodeClient, NodeClient};
pub use state::AppState;
pub use sync::{spawn_synchronizers, AccountRegistry, ReceivableTracker};
pub use validation::{validate_address, ValidationError};
