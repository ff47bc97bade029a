//! auth-core: Shared infrastructure for the phone-auth client subsystem.
pub mod config;
pub mod error;
pub mod kv;
pub mod observability;
pub mod utils;

pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
