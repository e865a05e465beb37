// Record generation: random fields from the value pools, prompt composition,
// and the model-backed narrative stages.
// All model calls go through llm_client; nothing here talks HTTP directly.

pub mod demographics;
pub mod experience;
pub mod narrative;
pub mod prompts;
pub mod response_parser;
