//! Search agent demo
//!
//! Asks a question, then a follow-up on the same thread, and prints the
//! conversation the agent remembers.
//!
//! ```bash
//! cargo run -p search-agent
//! cargo run -p search-agent -- --show-first --thread-id my-thread
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tripgraph_sdk::prelude::*;
use tripgraph_sdk::search::{DEFAULT_THREAD_ID, FIRST_QUESTION, FOLLOW_UP_QUESTION};

#[derive(Parser)]
#[command(name = "search-agent")]
#[command(about = "ReAct web-search agent with thread memory")]
struct Args {
    /// Conversation thread shared by both questions
    #[arg(short, long, default_value = DEFAULT_THREAD_ID)]
    thread_id: String,

    /// First question
    #[arg(long, default_value = FIRST_QUESTION)]
    question: String,

    /// Follow-up asked on the same thread
    #[arg(long, default_value = FOLLOW_UP_QUESTION)]
    follow_up: String,

    /// Also print the messages after the first question
    #[arg(long)]
    show_first: bool,
}

fn print_messages(state: &MessagesState) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&state.messages)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,search_agent=info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_env()?;

    println!("Thread id: {}", args.thread_id);

    let agent = build_search_agent(
        settings.chat_model()?,
        vec![settings.search_tool()?],
        Some(Arc::new(InMemoryCheckpointer::new())),
    )?;

    let results = ask_in_thread(&agent, &args.thread_id, [args.question, args.follow_up]).await?;

    if let (true, Some(first)) = (args.show_first, results.first()) {
        print_messages(first)?;
    }
    if let Some(last) = results.last() {
        print_messages(last)?;
    }
    Ok(())
}
