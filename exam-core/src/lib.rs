pub mod cache;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod error;
pub mod event_store;
pub mod models;
pub mod protocol;
pub mod scorer;
pub mod state_store;

pub use cache::{compute_key, MemoryResponseCache, PgResponseCache, ResponseCache};
pub use config::{ExamConfig, StorageBackend};
pub use dialogue::{transition, Transition};
pub use error::ExamError;
pub use event_store::{EventStore, MemoryEventStore, PgEventStore};
pub use state_store::{ConversationStateStore, MemoryStateStore, PgStateStore};
