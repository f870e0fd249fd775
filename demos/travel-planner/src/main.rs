//! Travel planner demo
//!
//! Streams the planner graph for a destination, stops after the hotel search,
//! and optionally resumes with the traveller's picks.
//!
//! ```bash
//! # In-memory checkpoints, stop at the interrupt
//! cargo run -p travel-planner -- --destination Dubai
//!
//! # Hosted checkpoints, pick and continue
//! cargo run -p travel-planner -- --backend convo \
//!     --hotel "Hilton Dubai Al Habtoor City" --flight "EK 501"
//!
//! # Resume an earlier thread (needs a persistent backend)
//! cargo run -p travel-planner --features redis -- --backend redis \
//!     --thread-id <id> --resume --hotel "Atlantis The Palm"
//! ```

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;
use tripgraph_sdk::prelude::*;
use tripgraph_sdk::travel::{DEFAULT_DESTINATION, DEFAULT_ORIGIN};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Memory,
    Convo,
    Redis,
}

#[derive(Parser)]
#[command(name = "travel-planner")]
#[command(about = "Flights, hotels and a trip plan with a pause for your choice")]
struct Args {
    /// Where to travel
    #[arg(short, long, default_value = DEFAULT_DESTINATION)]
    destination: String,

    /// Flight search origin
    #[arg(short, long, default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// Checkpoint store
    #[arg(short, long, value_enum, default_value = "memory")]
    backend: Backend,

    /// Redis connection URL for the redis backend
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Existing thread to use instead of creating one
    #[arg(short, long)]
    thread_id: Option<String>,

    /// Skip the search phase and continue a paused thread
    #[arg(long, requires = "thread_id")]
    resume: bool,

    /// Hotel to book; continues past the interrupt
    #[arg(long)]
    hotel: Option<String>,

    /// Flight to book; continues past the interrupt
    #[arg(long)]
    flight: Option<String>,
}

/// Rejects flag combinations that cannot resume anything.
fn validate(args: &Args) -> anyhow::Result<()> {
    if !args.resume {
        return Ok(());
    }
    anyhow::ensure!(
        !matches!(args.backend, Backend::Memory),
        "--resume needs a persistent backend (convo or redis); the memory store starts empty"
    );
    anyhow::ensure!(
        args.hotel.is_some() || args.flight.is_some(),
        "--resume needs --hotel or --flight"
    );
    Ok(())
}

async fn checkpointer_and_thread(
    args: &Args,
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn Checkpointer>, String)> {
    match args.backend {
        Backend::Memory => {
            let thread_id = args
                .thread_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            Ok((Arc::new(InMemoryCheckpointer::new()), thread_id))
        }
        Backend::Convo => {
            let convo = ConvoClient::new(settings.convo_config()?)?;
            let thread_id = match &args.thread_id {
                Some(thread_id) => thread_id.clone(),
                None => convo.new_thread().await?,
            };
            Ok((Arc::new(convo.checkpointer()), thread_id))
        }
        #[cfg(feature = "redis")]
        Backend::Redis => {
            use tripgraph_sdk::stores::RedisCheckpointer;
            let thread_id = args
                .thread_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            Ok((Arc::new(RedisCheckpointer::new(&args.redis_url).await?), thread_id))
        }
        #[cfg(not(feature = "redis"))]
        Backend::Redis => {
            anyhow::bail!(
                "redis backend ({}) requires building with --features redis",
                args.redis_url
            )
        }
    }
}

/// Prints every streamed state; returns true when the run paused.
async fn print_stream(
    graph: &CompiledGraph<TripState>,
    input: Option<TripUpdate>,
    config: &RunConfig,
) -> anyhow::Result<bool> {
    let mut stream = graph.stream(input, config.clone(), StreamMode::Values);
    let mut interrupted = false;
    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Values(state) => {
                println!("--------------------------");
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            StreamChunk::Interrupted(interrupt) => {
                tracing::info!(node = %interrupt.node, next = ?interrupt.next, "Run paused");
                interrupted = true;
            }
            StreamChunk::Updates { .. } => {}
        }
    }
    Ok(interrupted)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,travel_planner=info")),
        )
        .init();

    let args = Args::parse();
    validate(&args)?;
    let settings = Settings::from_env()?;

    let (checkpointer, thread_id) = checkpointer_and_thread(&args, &settings).await?;
    println!("Thread id: {thread_id}");

    let graph = build_travel_graph(
        settings.chat_model()?,
        vec![settings.search_tool()?],
        TravelOptions::default()
            .with_origin(args.origin.clone())
            .with_checkpointer(checkpointer),
    )?;
    let config = RunConfig::for_thread(thread_id);

    if !args.resume {
        let interrupted = print_stream(
            &graph,
            Some(TripUpdate::destination(args.destination.clone())),
            &config,
        )
        .await?;
        if !interrupted {
            return Ok(());
        }
        println!("=============== Interrupted ===============");

        if args.hotel.is_none() && args.flight.is_none() {
            return Ok(());
        }
    }
    record_selection(&graph, &config, args.hotel.clone(), args.flight.clone()).await?;
    print_stream(&graph, None, &config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("travel-planner").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn resume_rejects_the_memory_backend() {
        let args = parse(&["--thread-id", "t", "--resume", "--hotel", "Hilton"]);
        let err = validate(&args).unwrap_err();
        assert!(err.to_string().contains("persistent backend"));
    }

    #[test]
    fn resume_needs_a_selection() {
        let args = parse(&["--backend", "convo", "--thread-id", "t", "--resume"]);
        assert!(validate(&args).is_err());

        let args = parse(&[
            "--backend", "convo", "--thread-id", "t", "--resume", "--flight", "EK 501",
        ]);
        validate(&args).unwrap();
    }

    #[test]
    fn fresh_runs_need_no_selection() {
        validate(&parse(&[])).unwrap();
        validate(&parse(&["--hotel", "Hilton"])).unwrap();
    }
}
