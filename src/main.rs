mod app;

use anyhow::{Context, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use truthgraph::analysis::AnalysisLifecycle;
use truthgraph::config::{AnalysisConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_MS};
use truthgraph::physics::Viewport;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Chat-completions endpoint used for analysis and headlines.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Give up on a request after this many milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: u64,

    #[arg(long, env = "TRUTHGRAPH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Keep the built-in headlines instead of asking the backend for fresh ones.
    #[arg(long)]
    no_headlines: bool,
}

impl Args {
    fn analysis_config(&self) -> AnalysisConfig {
        let config = AnalysisConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            timeout_ms: self.timeout_ms,
            ..AnalysisConfig::default()
        };
        match &self.api_key {
            Some(api_key) => config.with_api_key(api_key.as_str()),
            None => config,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("truthgraph=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = args.analysis_config();
    if config.api_key.is_none() {
        info!("no API key configured; analyses will fail until one is provided");
    }

    let lifecycle = AnalysisLifecycle::from_config(config, Viewport::default())
        .context("failed to set up the analysis backend")?;
    let fetch_headlines = !args.no_headlines;

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "truthgraph",
        options,
        Box::new(move |cc| Ok(Box::new(app::TruthGraphApp::new(cc, lifecycle, fetch_headlines)))),
    )
    .map_err(|error| anyhow!("failed to run the window: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_backend_defaults() {
        let args = Args::try_parse_from([
            "truthgraph",
            "--endpoint",
            "http://localhost:8080/v1/chat/completions",
            "--model",
            "local",
            "--timeout-ms",
            "1500",
            "--api-key",
            "sk-local",
            "--no-headlines",
        ])
        .expect("args parse");

        let config = args.analysis_config();

        assert_eq!(config.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.model, "local");
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.api_key.as_deref(), Some("sk-local"));
        assert!(args.no_headlines);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Args::try_parse_from(["truthgraph", "--timeout-ms", "0"]).is_err());
    }
}
