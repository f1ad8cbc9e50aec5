//! # Labeler Core
//!
//! Domain types, traits, and error definitions for the Labeler
//! domain-classification engine. This crate defines the model that every
//! other crate implements against.
//!
//! ## Design Philosophy
//!
//! Storage, persistence and randomness are traits here. Implementations live
//! in their respective crates. This enables:
//! - Swapping persistence backends via configuration
//! - Deterministic tests with seeded or scripted randomness
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod record;
pub mod history;
pub mod category;
pub mod store;
pub mod persistence;
pub mod random;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use record::{CategoryEntry, ClassificationEvent, GlobalEntry, UserRecord};
pub use history::{RecentHistory, HISTORY_LIMIT};
pub use category::CategorySet;
pub use store::{GlobalAggregateStore, UserStore};
pub use persistence::{PersistedState, PersistedUser, PersistenceGateway};
pub use random::{RandomSource, SeededRandom, ThreadRandom, shuffle};
pub use event::{EngineEvent, EventBus};
