// Bando ranking: response document → candidates → sheet text → relevance → top-N.
// External services (HTTP, embeddings, LLM, PDF decoding) are reached only
// through the traits in `document` and `scoring`.

pub mod candidates;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod scoring;
pub mod xml;
