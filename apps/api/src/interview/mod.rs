// Mock interview sessions.
// Implements: session lifecycle, the voice turn pipeline (speech-to-text → LLM → text-to-speech),
// and the end-of-session analysis report.

pub mod analysis;
pub mod conversation;
pub mod handlers;
pub mod prompts;
pub mod store;
