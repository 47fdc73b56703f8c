// najot-bot/src/lib.rs

pub mod api;
pub mod chat;
pub mod config;
pub mod document;
pub mod knowledge_base;
pub mod llm_worker;
pub mod memory;
pub mod metrics;
pub mod prompt;
pub mod server;
pub mod shared_state;
pub mod telemetry;
pub mod vector_store;

// Public API exports
pub use config::Config;
pub use knowledge_base::KnowledgeBase;
pub use memory::{ArchivedChat, Message, Role};
pub use server::{build_router, run_server};
pub use shared_state::{SessionStore, UnifiedAppState};
