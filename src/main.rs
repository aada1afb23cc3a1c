//! Destination Resolver
//!
//! Checks that every role named in a delivery targets file can be assumed
//! with the current identity and settings.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use destination_resolver::{
    config::Settings, logging::init_tracing, schemas::load_targets, services::AdapterRegistry,
    ServiceResolver,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Destination Resolver
///
/// Assumes each distinct role referenced by the targets file and reports how
/// long the resulting session will be cached.
#[derive(Parser, Debug)]
#[command(name = "destination-resolver")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding an array of delivery targets
    #[arg(short, long)]
    targets: PathBuf,

    /// Default region for targets without one (overrides AWS_REGION env var)
    #[arg(long)]
    region: Option<String>,

    /// Role session name (overrides ROLE_SESSION_NAME env var)
    #[arg(long)]
    session_name: Option<String>,

    /// Session duration in seconds (overrides ROLE_SESSION_DURATION env var)
    #[arg(long)]
    duration: Option<i32>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load()?;

    if let Some(region) = args.region {
        settings.aws_region = region;
    }
    if let Some(name) = args.session_name {
        settings.role_session_name = name;
    }
    if let Some(duration) = args.duration {
        settings.session_duration_seconds = duration;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    settings.validate()?;

    init_tracing(settings.effective_log_level(), args.json_logs);

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        region = %settings.aws_region,
        session_name = %settings.role_session_name,
        duration_seconds = settings.session_duration_seconds,
        "Starting role check"
    );

    let targets = load_targets(&args.targets)?;

    // Role ARN -> external ID of the first target naming it
    let mut roles: BTreeMap<&str, Option<&str>> = BTreeMap::new();
    for target in &targets {
        if let Some(role) = target.role() {
            roles.entry(role).or_insert(target.external_id());
        }
    }

    if roles.is_empty() {
        println!("No target in {} assumes a role", args.targets.display());
        return Ok(());
    }

    let resolver: ServiceResolver<()> =
        ServiceResolver::from_settings(&settings, AdapterRegistry::default()).await;

    let mut failures = 0;
    for (role, external_id) in roles {
        match resolver.resolve_session(Some(role), external_id).await {
            Ok(session) => {
                let remaining = session.remaining().unwrap_or_default();
                let refresh_at = chrono::Duration::from_std(remaining)
                    .map(|d| Utc::now() + d)
                    .unwrap_or_else(|_| Utc::now());
                println!(
                    "ok    {}  cached for {}s (refresh at {})",
                    role,
                    remaining.as_secs(),
                    refresh_at.to_rfc3339()
                );
            }
            Err(err) => {
                failures += 1;
                println!("FAIL  {}  {}", role, err);
            }
        }
    }

    let stats = resolver.stats();
    tracing::info!(sessions = stats.sessions, failures, "Role check complete");

    if failures > 0 {
        anyhow::bail!("{} role(s) could not be assumed", failures);
    }

    Ok(())
}
