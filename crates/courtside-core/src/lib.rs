pub mod config;
pub mod error;
pub mod seed;
pub mod store;
pub mod types;

pub use config::CourtsideConfig;
pub use error::{CourtsideError, Result};
pub use store::{DataSource, Dataset, InMemoryStore};
pub use types::*;
