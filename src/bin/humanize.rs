//! Humanizer command-line binary
//!
//! Usage: humanize [--config <file.json>] [<input.txt>]
//! Text comes from the file argument or stdin. Configuration comes from
//! `--config` or the HUMANIZE_CONFIG environment variable (inline JSON).

use anyhow::Context;
use humanizer::config::parse_configuration;
use humanizer::{Configuration, EngineSettings, Humanizer, ServiceEndpoints};
use std::io::Read;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    eprintln!("✍️  Humanizer");
    eprintln!("   Version: {}", env!("CARGO_PKG_VERSION"));
    eprintln!();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = None;
    let mut input_path = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config_path = Some(iter.next().context("--config needs a file path")?.clone()),
            _ => input_path = Some(arg.clone()),
        }
    }

    let cfg = match (config_path, std::env::var("HUMANIZE_CONFIG").ok()) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(&path).context(format!("Failed to read config file {}", path))?;
            parse_configuration(&json)?
        }
        (None, Some(json)) => parse_configuration(&json)?,
        (None, None) => Configuration::default(),
    };

    let text = match input_path {
        Some(path) => std::fs::read_to_string(&path).context(format!("Failed to read input file {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            buf
        }
    };

    let endpoints = ServiceEndpoints::from_env();
    match &endpoints.rewrite_url {
        Some(url) => eprintln!("✓ Rewrite service: {} ({})", url, endpoints.rewrite_model),
        None => eprintln!("✓ Rewrite service: disabled (set REWRITE_SERVICE_URL to enable)"),
    }
    if let Some(url) = &endpoints.lexicon_url {
        eprintln!("✓ Lexical service: {}", url);
    }
    if let Some(url) = &endpoints.embedding_url {
        eprintln!("✓ Embedding service: {} ({})", url, endpoints.embedding_model);
    }

    let engine = Humanizer::from_endpoints(&endpoints, EngineSettings::default());
    eprintln!("✓ Humanizer initialized");
    eprintln!();

    let response = engine.humanize(&text, cfg).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
