use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use deepseek_client::DeepSeek;
use makerscout_common::{normalize_records, Config, CurationPolicy, RawProfile};
use makerscout_curator::cache::JsonFileStore;
use makerscout_curator::pipeline::{curated_vendors, CurationPipeline, RunOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Three-way rules triage with auto-approval.
    Triage,
    /// Reject-only rules with the post-LLM validation gate.
    Gated,
}

/// Curate scraped vendor profiles into directory entries.
#[derive(Debug, Parser)]
#[command(name = "makerscout-curator")]
struct Args {
    /// JSON array of raw scraped profiles.
    #[arg(long)]
    input: PathBuf,

    /// Directory for the scored and curated JSON artifacts.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Curation policy profile.
    #[arg(long, value_enum, default_value_t = PolicyArg::Gated)]
    policy: PolicyArg,

    /// Skip the LLM stage; escalated records are left pending review.
    #[arg(long)]
    skip_llm: bool,

    /// Skip category tagging.
    #[arg(long)]
    skip_categories: bool,

    /// Clear the verdict cache and reprocess everything.
    #[arg(long)]
    full: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let policy = match args.policy {
        PolicyArg::Triage => CurationPolicy::triage(),
        PolicyArg::Gated => CurationPolicy::gated(),
    };

    let raw_json = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let raw: Vec<RawProfile> = serde_json::from_str(&raw_json)
        .with_context(|| format!("parsing {}", args.input.display()))?;
    let records = normalize_records(raw);
    info!(count = records.len(), policy = policy.name, "loaded records");

    let store = JsonFileStore::new(args.output.join("verdict_cache.json"));
    if args.full {
        store.clear()?;
        info!("cleared verdict cache for full rerun");
    }

    // Resolve the credential before any batch work begins; without it the
    // run cannot make progress, so fail here rather than mid-pipeline.
    let client = if args.skip_llm {
        None
    } else {
        let config = Config::from_env()?;
        let mut client = DeepSeek::new(config.api_key, config.model);
        if let Some(base_url) = config.base_url {
            client = client.with_base_url(base_url);
        }
        Some(client)
    };

    let pipeline = CurationPipeline::new(&policy, client.as_ref(), &store);
    let (scored, summary) = pipeline
        .run(
            records,
            RunOptions {
                skip_llm: args.skip_llm,
                skip_categories: args.skip_categories,
            },
        )
        .await?;

    fs::create_dir_all(&args.output)?;
    fs::write(
        args.output.join("full_scored.json"),
        serde_json::to_string_pretty(&scored)?,
    )?;
    let vendors = curated_vendors(&scored);
    fs::write(
        args.output.join("curated_vendors.json"),
        serde_json::to_string_pretty(&vendors)?,
    )?;
    fs::write(
        args.output.join("run_summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    info!(
        approved = vendors.len(),
        total = summary.total,
        elapsed_seconds = summary.elapsed_seconds,
        output = %args.output.display(),
        "wrote curation artifacts"
    );
    Ok(())
}
