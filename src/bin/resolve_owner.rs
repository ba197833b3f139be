//! Ownership resolution CLI
//!
//! Resolves the ultimate owner of a company or brand and prints the ranked
//! candidate chains.
//!
//! # Usage
//!
//! ```bash
//! # Live lookup against Wikidata / Wikipedia
//! resolve_owner "Kitupé"
//!
//! # Offline, against a YAML fixture graph
//! resolve_owner "Acme Co" --fixture demos/acme.yaml --format json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ownership_resolver::providers::fixture::FixtureFile;
use ownership_resolver::{
    CandidatePath, OwnershipResolver, ResolutionResult, ResolveError, ResolverConfig,
};

#[derive(Parser)]
#[command(name = "resolve_owner")]
#[command(version)]
#[command(about = "Find who ultimately owns a company or brand")]
struct Cli {
    /// Company or brand name
    query: String,

    /// YAML resolver configuration
    #[arg(long, short, env = "OWNERSHIP_CONFIG")]
    config: Option<PathBuf>,

    /// Resolve against a YAML fixture graph instead of live services
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", value_enum)]
    format: OutputFormat,

    /// Override the hop limit
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ownership_resolver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(result) => match print_result(&result, cli.format) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(ResolveError::InvalidQuery { reason }) => {
            eprintln!("error: invalid query: {}", reason);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ResolutionResult, ResolveError> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::from_file(path)?,
        None => ResolverConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(depth) = cli.max_depth {
        config.max_depth = depth;
        config.validate()?;
    }

    let resolver = match &cli.fixture {
        Some(path) => OwnershipResolver::from_fixture(&config, FixtureFile::from_file(path)?),
        None => OwnershipResolver::from_config(&config)?,
    };

    resolver.resolve_ownership(&cli.query).await
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_result(result: &ResolutionResult, format: OutputFormat) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(result)
                    .map_err(|e| format!("JSON serialization failed: {}", e))?
            );
        }
        OutputFormat::Text => {
            println!("Query: {}", result.query);
            match &result.best_result {
                Some(best) => {
                    println!("Best:  {}", describe(best));
                    if !result.alternatives.is_empty() {
                        println!("Alternatives:");
                        for (i, alt) in result.alternatives.iter().enumerate() {
                            println!("  [{}] {}", i + 1, describe(alt));
                        }
                    }
                }
                None => println!("No owner found"),
            }
        }
    }
    Ok(())
}

fn describe(path: &CandidatePath) -> String {
    format!(
        "{} ({:?}, {:?} confidence, {}{}, via {})",
        path.labels.join(" -> "),
        path.terminal_kind,
        path.confidence,
        path.relation_type,
        if path.verified { ", verified" } else { "" },
        path.source
    )
}
