pub mod client;
pub mod http;

// Re-exports for convenience
pub use client::{AccountHeightSearch, HeightSearch, NodeClient, NodeError, NodeStream};
pub use http::HttpNodeClient;
