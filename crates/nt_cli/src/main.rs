use anyhow::Context;
use clap::Parser;
use nt_core::config::DEFAULT_INDEX;
use nt_core::{PartitionPolicy, RunConfig, StorageKind};
use nt_scrappers::{handle_command, init_logging, HumanDuration, LogFormat, ScraperCommands};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, env = "NT_LOG_FORMAT")]
    log_format: LogFormat,
    /// Where crawled articles are written
    #[arg(long, value_enum, default_value_t = StorageKind::Elastic, env = "NT_STORAGE")]
    storage: StorageKind,
    #[arg(long, default_value = "http://localhost", env = "ELASTICSEARCH_HOST")]
    elasticsearch_host: String,
    #[arg(long, default_value_t = 9200, env = "ELASTICSEARCH_PORT")]
    elasticsearch_port: u16,
    /// Backend request timeout (e.g. 30s, 1m)
    #[arg(long, default_value = "30s", env = "ELASTICSEARCH_TIMEOUT")]
    elasticsearch_timeout: HumanDuration,
    /// Index prefix; documents go to `{index}-{year}`
    #[arg(long, default_value = DEFAULT_INDEX, env = "ELASTICSEARCH_INDEX")]
    index: String,
    /// Which year picks the partition of an article
    #[arg(long, value_enum, default_value_t = PartitionPolicy::IngestYear, env = "NT_PARTITION_POLICY")]
    partition_policy: PartitionPolicy,
    #[command(subcommand)]
    command: ScraperCommands,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let host = self.elasticsearch_host.trim_end_matches('/');
        let host = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };
        RunConfig {
            storage: self.storage,
            backend_url: format!("{}:{}", host, self.elasticsearch_port),
            backend_timeout: self.elasticsearch_timeout.0,
            index: self.index.clone(),
            partition_policy: self.partition_policy,
            ..RunConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; a malformed one is not.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to load .env");
        }
    }

    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = cli.run_config();
    debug!(?config, "configuration loaded");

    if let Err(e) = handle_command(cli.command, config).await {
        error!(kind = e.kind(), "❌ {}", e);
        return Err(e).context("nt failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_from_host_and_port() {
        let cli = Cli::parse_from(["nt", "--elasticsearch-host", "es.internal", "--elasticsearch-port", "9201", "list"]);
        assert_eq!(cli.run_config().backend_url, "http://es.internal:9201");

        let cli = Cli::parse_from(["nt", "--elasticsearch-host", "https://es.internal/", "list"]);
        assert_eq!(cli.run_config().backend_url, "https://es.internal:9200");
    }

    #[test]
    fn test_crawl_flags() {
        let cli = Cli::parse_from([
            "nt",
            "--storage",
            "memory",
            "--partition-policy",
            "published-year",
            "crawl",
            "--source",
            "cnbc",
            "--source",
            "detik",
            "--lookback-days",
            "7",
            "--fetch-timeout",
            "1m",
        ]);
        let config = cli.run_config();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.partition_policy, PartitionPolicy::PublishedYear);

        match cli.command {
            ScraperCommands::Crawl(args) => {
                assert_eq!(args.sources, vec!["cnbc", "detik"]);
                assert_eq!(args.lookback_days, Some(7));
                assert_eq!(args.fetch_timeout.map(|d| d.0.as_secs()), Some(60));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
