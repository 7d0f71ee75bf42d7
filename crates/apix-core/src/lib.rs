pub mod cache;
pub mod config;
pub mod content_type;
pub mod deref;
pub mod error;
pub mod fetch;
pub mod index;
pub mod lookup;
pub mod store;
pub mod tools;

pub use config::{ApixConfig, DerefLimits};
pub use error::{ErrorCode, ToolError};
pub use store::OpenApiStore;
