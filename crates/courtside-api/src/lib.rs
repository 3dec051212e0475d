//! Courtside API crate - HTTP surface over the AI flows and tools.
//!
//! Exposes registered flows as JSON endpoints, runs the aggregation tools
//! for the admin dashboard, and maps flow failures to HTTP status codes.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
