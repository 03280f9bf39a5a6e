//! # korag-server
//!
//! HTTP front-end for [`korag_generation::ResponseGenerator`]: a service
//! descriptor, health and stats endpoints, and `POST /generate`.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::ServerError;
pub use server::{bind_listener, create_router, run_server};
pub use state::AppState;
