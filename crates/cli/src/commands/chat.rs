//! Chat command handler.
//!
//! Interactive recommendation session: one free-text request per line until
//! `quit`, end of input, or Ctrl-C. A failed request is reported and the
//! session carries on.

use super::{open_index, recommender, RetrievalArgs};
use clap::Args;
use marquee_core::{config::AppConfig, AppResult};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const QUIT: &str = "quit";
const QUERY_FAILED: &str = "Sorry, I encountered an error. Please try a different query.";

/// Interactive recommendation session
#[derive(Args, Debug)]
pub struct ChatCommand {
    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting chat session");

        let index = open_index(config, &self.retrieval).await?;
        let bot = recommender(config, index.clone(), &self.retrieval)?;

        println!("\nMovie Recommendation Chatbot");
        println!("Type '{}' to exit", QUIT);
        println!("{}", "=".repeat(50));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("\nWhat kind of movie are you looking for? ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted");
                    println!();
                    break;
                }
            };

            let Some(line) = line else {
                tracing::debug!("End of input");
                break;
            };
            let query = line.trim();
            if query.eq_ignore_ascii_case(QUIT) {
                break;
            }
            if query.is_empty() {
                continue;
            }

            match bot.recommend(query).await {
                Ok(response) => {
                    println!("\nRecommendations:");
                    println!("{}", response);
                }
                Err(e) => {
                    tracing::error!("Error processing query: {}", e);
                    println!("{}", QUERY_FAILED);
                }
            }
        }

        index.cleanup().await?;
        tracing::info!("Chat session closed");
        Ok(())
    }
}
