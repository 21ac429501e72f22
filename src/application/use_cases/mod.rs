pub mod answer_synthesizer;
pub mod pipeline;
pub mod prompt_builder;
pub mod query_executor;
pub mod query_sanitizer;
pub mod schema_introspector;
