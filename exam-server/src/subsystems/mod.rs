pub mod chat;
pub mod evaluate;
pub mod events;
pub mod sweep;
