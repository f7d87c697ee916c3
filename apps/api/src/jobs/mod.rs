// Job applications, their question banks, and single-question practice.
// All LLM calls go through llm_client; transcription goes through speech.

pub mod handlers;
pub mod practice;
pub mod prompts;
pub mod questions;
pub mod store;
