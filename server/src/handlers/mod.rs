//! HTTP request handlers for API endpoints.

pub mod generate;
pub mod health;
pub mod info;

pub use generate::handle_generate;
pub use health::handle_health;
pub use info::{handle_root, handle_stats};
