//! Harspec CLI: read a HAR capture, write one OpenAPI YAML document per
//! observed domain.
//!
//! Usage:
//!   harspec traffic.har -o specs/
//!   harspec traffic.har --options harspec.yaml --parameterize

use anyhow::Context;
use clap::Parser;
use harspec::{generate_specs, Har, HarSpecConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Synthesize OpenAPI 3 specifications from recorded HAR traffic
#[derive(Parser, Debug)]
#[command(name = "harspec", author, version, about)]
struct Args {
    /// Path to the HAR capture file
    #[arg(required = true)]
    har: PathBuf,

    /// Directory to write the generated YAML documents into
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// YAML file with generator options
    #[arg(short = 'c', long)]
    options: Option<PathBuf>,

    /// Rewrite identifier-like path segments into {name} placeholders
    #[arg(long)]
    parameterize: bool,

    /// Collapse all domains into a single document
    #[arg(long)]
    single_spec: bool,

    /// Drop paths whose operations never saw a 2xx response
    #[arg(long)]
    drop_unsuccessful: bool,

    /// Log entry-level degradations
    #[arg(long)]
    log_errors: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = match &args.options {
        Some(path) => HarSpecConfig::from_file(path)
            .with_context(|| format!("failed to load options from {}", path.display()))?,
        None => HarSpecConfig::default(),
    };
    if args.parameterize {
        config.attempt_to_parameterize_url = true;
    }
    if args.single_spec {
        config.force_all_requests_in_same_spec = true;
    }
    if args.drop_unsuccessful {
        config.drop_paths_without_successful_response = true;
    }
    if args.log_errors {
        config.log_errors = true;
    }

    let contents = std::fs::read_to_string(&args.har)
        .with_context(|| format!("failed to read {}", args.har.display()))?;
    let har: Har = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {} as a HAR capture", args.har.display()))?;

    let specs = generate_specs(har, config).await;
    if specs.is_empty() {
        println!("No qualifying domains found in capture");
        return Ok(());
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    for result in &specs {
        let name = result.domain.as_deref().unwrap_or("spec");
        let path = args.out.join(format!("{name}.yaml"));
        std::fs::write(&path, &result.yaml)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "Wrote {} ({} paths)",
            path.display(),
            result.spec.paths.len()
        );
    }

    Ok(())
}
