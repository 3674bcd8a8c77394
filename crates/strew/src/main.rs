use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strew_client::HttpClusterClient;
use strew_scheduler::{Scheduler, SchedulerConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "strew", about = "Strew spread-first workload scheduler")]
struct Cli {
    /// Scheduler name claimed from pod spec.schedulerName
    #[arg(long, default_value = "strew")]
    scheduler_name: String,

    /// Base URL of the cluster API server
    #[arg(long, env = "STREW_API_URL", default_value = "http://127.0.0.1:6443")]
    api_url: String,

    /// Restrict placement to nodes with this label (repeatable)
    #[arg(long = "node-selector", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    node_selector: Vec<(String, String)>,

    /// Pod label grouping workloads for spread scoring
    #[arg(long, default_value = "app")]
    spread_label: String,

    /// Watch inactivity window in seconds before re-establishing
    #[arg(long, default_value_t = 300)]
    watch_timeout_secs: u64,

    /// File containing a bearer token sent with every API request
    #[arg(long)]
    bearer_token_file: Option<PathBuf>,
}

/// Parse a KEY=VALUE argument
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Read a bearer token from a file, dropping surrounding whitespace
fn read_token_file(path: &Path) -> miette::Result<String> {
    let token = std::fs::read_to_string(path).map_err(|e| {
        miette::miette!("Failed to read bearer token file '{}': {}", path.display(), e)
    })?;
    Ok(token.trim().to_string())
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        "Starting strew, claiming pods for scheduler '{}' against {}",
        cli.scheduler_name, cli.api_url
    );

    let mut client = HttpClusterClient::new(&cli.api_url);
    if let Some(path) = &cli.bearer_token_file {
        client = client.with_bearer_token(read_token_file(path)?);
    }

    let node_label_selector = if cli.node_selector.is_empty() {
        None
    } else {
        Some(cli.node_selector.iter().cloned().collect::<BTreeMap<_, _>>())
    };

    let config = SchedulerConfig {
        scheduler_name: cli.scheduler_name,
        node_label_selector,
        spread_label: cli.spread_label,
        watch_timeout: Duration::from_secs(cli.watch_timeout_secs),
        ..Default::default()
    };

    let scheduler = Scheduler::new(Arc::new(client), config);
    let token = CancellationToken::new();

    let scheduler_token = token.clone();
    let mut scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_token).await });

    tokio::select! {
        result = &mut scheduler_handle => {
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(miette::miette!("Scheduler task failed: {}", e)),
            };
        }
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;
            info!("Shutting down gracefully...");
            token.cancel();
        }
    }

    // Wait for the scheduler to finish with a timeout
    let shutdown_timeout = Duration::from_secs(5);
    let _ = tokio::time::timeout(shutdown_timeout, &mut scheduler_handle).await;

    info!("Shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("env=prod").unwrap(),
            ("env".to_string(), "prod".to_string())
        );
        // Values may carry '='
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("no-separator").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn test_read_token_file_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "secret-token\n").unwrap();

        assert_eq!(read_token_file(&path).unwrap(), "secret-token");
    }

    #[test]
    fn test_read_token_file_missing_is_an_error() {
        assert!(read_token_file(Path::new("/nonexistent/token")).is_err());
    }

    #[test]
    fn test_cli_parses_repeated_node_selectors() {
        let cli = Cli::parse_from([
            "strew",
            "--node-selector",
            "env=prod",
            "--node-selector",
            "zone=a",
            "--spread-label",
            "team",
        ]);
        assert_eq!(
            cli.node_selector,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("zone".to_string(), "a".to_string())
            ]
        );
        assert_eq!(cli.spread_label, "team");
        assert_eq!(cli.scheduler_name, "strew");
        assert_eq!(cli.watch_timeout_secs, 300);
    }
}
