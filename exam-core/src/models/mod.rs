pub mod conversation;
pub mod evaluation;
pub mod event;

pub use conversation::{ConversationContext, ConversationState, DialogueState};
pub use evaluation::{Board, CacheEntry, ScoringInput, ScoringResult};
pub use event::EventRecord;
