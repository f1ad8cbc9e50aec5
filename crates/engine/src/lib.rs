//! # Labeler Engine
//!
//! The labeling session: catalog loading, per-user work queues, the
//! classify/aggregate cycle, reporting exports and the background
//! persistence writer.

pub mod catalog;
pub mod export;
pub mod identity;
pub mod queue;
pub mod session;
pub mod writer;

pub use catalog::{Catalog, browse_url};
pub use export::{GlobalExport, GlobalPair, UserExport, UserExportEntry, export_global, export_users};
pub use identity::IdentityRule;
pub use queue::WorkQueue;
pub use session::{Classification, SessionController, SessionState, SessionStats};
pub use writer::{PersistenceHandle, PersistenceWriter, WriterStats};
