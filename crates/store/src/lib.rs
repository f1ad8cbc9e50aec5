//! Store and persistence implementations for Labeler.

pub mod noop;
pub mod in_memory;
pub mod file_backend;

#[cfg(feature = "http")]
pub mod http;

pub use noop::NoopGateway;
pub use in_memory::{InMemoryGateway, InMemoryGlobalStore, InMemoryUserStore};
pub use file_backend::FileGateway;

#[cfg(feature = "http")]
pub use http::HttpGateway;
