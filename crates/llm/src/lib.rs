//! Text generation crate for marquee.
//!
//! Provides a provider-agnostic [`LlmClient`] trait used by the recommender to
//! turn retrieved movie context into a natural-language answer.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Azure OpenAI**: Chat completions on an Azure deployment
//!
//! # Example
//! ```no_run
//! use marquee_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Recommend a heist movie", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{AzureOpenAiClient, OllamaClient};
pub use types::ProviderType;
