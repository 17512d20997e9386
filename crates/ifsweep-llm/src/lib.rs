//! ifsweep-llm: talking to model backends.
//!
//! - [`ResilientCaller`]: retry + single parameter fallback for data generation
//! - [`HttpChatBackend`]: OpenAI-compatible chat endpoint client
//! - [`InferenceWorker`]: per-model response generation over the corpus
//! - [`DataGenerator`]: combined-instruction synthetic corpus generation

pub mod backend;
pub mod caller;
pub mod config;
pub mod error;
pub mod generate;
pub mod worker;

pub use backend::{ChatBackend, ChatMessage, ChatRequest, HttpChatBackend};
pub use caller::{CallAttempt, ResilientCaller, RetryPolicy};
pub use config::{reasoning_flag, ChatConfig, ChatParams};
pub use error::{CallError, GenerateError, WorkerError};
pub use generate::{
    is_infeasible, DataGenerator, GenerateReport, InstructionCatalog, InstructionSpec,
    JsonCatalog, DEFAULT_START_KEY,
};
pub use worker::{ChatGenerator, InferenceWorker, TextGenerator, WorkerReport};
