pub mod manager;
pub mod types;

pub use manager::SessionManager;
pub use types::{ChatSession, Message};
