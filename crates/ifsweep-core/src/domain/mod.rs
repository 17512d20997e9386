//! Domain models for ifsweep.
//!
//! - `ModelDescriptor` / `SafeName`: model identity and its file-naming form
//! - `CorpusRecord`: one benchmark input example
//! - `ResponseRecord`: a prompt paired with a model response

pub mod error;
pub mod model;
pub mod record;

pub use error::{Result, SweepError};
pub use model::{ModelDescriptor, SafeName};
pub use record::{
    extract_prompt, CorpusRecord, ResponseRecord, PROMPT_FALLBACK_FIELDS, PROMPT_FIELD,
    RESPONSE_FIELD,
};
