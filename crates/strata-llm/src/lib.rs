//! Chat and embedding provider abstraction and backend implementations.

pub mod any;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
mod retry;

pub use any::AnyProvider;
pub use error::{LlmError, Result};
pub use provider::{LlmProvider, Message, Role, StatusTx};
