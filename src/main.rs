use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use solace::api;
use solace::config::AppConfig;
use solace::models::PipelineEvent;
use solace::models::Tradition;
use solace::pipeline::Pipeline;
use solace::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "solace")]
#[command(about = "Comfort-passage recommendation service with streamed explanations")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Disable permissive CORS
        #[arg(long)]
        no_cors: bool,
    },
    /// Run one recommendation from the terminal
    Ask {
        /// The concern to find passages for
        issue: String,
        /// Tradition: christian, jewish, harry_potter, social_media
        #[arg(short, long, default_value = "christian")]
        tradition: String,
    },
    /// Query a running server's health endpoint
    Health {
        /// Server base URL
        #[arg(long, default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;

    if cli.verbose {
        solace::logging::init_logging_with_config(None)?;
    } else {
        solace::logging::init_logging_with_config(Some(&config))?;
    }

    match cli.command {
        Commands::Serve { host, port, no_cors } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let enable_cors = !no_cors && config.server.enable_cors;
            api::serve_api(&config, host, port, enable_cors).await?;
        }
        Commands::Ask { issue, tradition } => {
            let tradition: Tradition = tradition.parse()?;
            ask(&config, &issue, tradition).await?;
        }
        Commands::Health { url } => {
            health(&url).await?;
        }
    }

    Ok(())
}

/// One-shot pipeline run printing passages and the streamed explanation.
async fn ask(config: &AppConfig, issue: &str, tradition: Tradition) -> Result<()> {
    info!("Running one-shot query: {}", issue);

    let pipeline = Arc::new(Pipeline::from_config(config)?);
    let (tx, mut rx) = tokio::sync::mpsc::channel(32);

    let runner = {
        let pipeline = Arc::clone(&pipeline);
        let issue = issue.to_string();
        tokio::spawn(async move {
            pipeline.run(&issue, tradition, tx).await;
        })
    };

    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::Crisis(message) => {
                println!("\n{message}");
            }
            PipelineEvent::Verses(passages) => {
                println!("Passages:");
                for passage in &passages {
                    println!("  {} (score {:.2})", passage.reference, passage.score);
                    println!("    {}", passage.text);
                }
                println!("\nExplanation:");
            }
            PipelineEvent::ExplanationChunk(chunk) => {
                use std::io::Write;
                print!("{chunk}");
                std::io::stdout().flush()?;
            }
            PipelineEvent::Done => {
                println!();
            }
            PipelineEvent::Error(message) => {
                eprintln!("Error: {message}");
            }
        }
    }

    runner
        .await
        .map_err(|e| solace::SolaceError::Config(format!("run task panicked: {e}")))?;

    Ok(())
}

/// Print a running server's readiness state.
async fn health(url: &str) -> Result<()> {
    let endpoint = format!("{}/api/health", url.trim_end_matches('/'));
    let response = reqwest::get(&endpoint).await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    println!("{status}: {}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
