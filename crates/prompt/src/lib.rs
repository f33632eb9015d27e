//! Prompt system for marquee.
//!
//! - Built-in prompt definitions for recommendations and similar-movie lookups
//! - Workspace overrides from `.marquee/prompts/<id>.yml`
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use builtin::{builtin_prompt, RECOMMEND_PROMPT_ID, SIMILAR_PROMPT_ID};
pub use loader::{load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
