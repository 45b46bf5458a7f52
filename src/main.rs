use clap::Parser;
use toolgate::config::{ConfigResult, GatewayConfig};
use toolgate::logging::{LoggingConfig, init_logging};
use toolgate::server;

#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(about = "OpenAI-compatible chat gateway with a tool-augmentation pipeline")]
#[command(long_about = r#"
toolgate - OpenAI-compatible chat gateway with a tool-augmentation pipeline

Accepts chat completion requests, optionally rewrites them through a chain
of named tools, forwards them to the configured upstream model and streams
the answer back with the tool metadata attached.

Example:
  toolgate --config config.json --port 8080 --log-level debug
"#)]
struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(long)]
    config: String,

    /// Host address to bind, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// Directory to store log files
    #[arg(long)]
    log_dir: Option<String>,

    /// Set the logging level
    #[arg(long, value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Upstream timeout in seconds, overrides the config file
    #[arg(long)]
    upstream_timeout_secs: Option<u64>,

    /// Maximum inbound payload size in bytes, overrides the config file
    #[arg(long)]
    max_payload_size: Option<usize>,
}

impl CliArgs {
    fn to_config(&self) -> ConfigResult<GatewayConfig> {
        let mut config = GatewayConfig::load(&self.config)?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
        if self.json_logs {
            config.json_logs = true;
        }
        if let Some(timeout) = self.upstream_timeout_secs {
            config.upstream_timeout_secs = timeout;
        }
        if let Some(limit) = self.max_payload_size {
            config.max_payload_size = limit;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = args.to_config()?;
    config.validate()?;

    let _log_guard = init_logging(LoggingConfig::from(&config));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::startup(config))
}
