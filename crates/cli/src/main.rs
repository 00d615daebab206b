use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ingestion_kernel::{ApplicationProperties, Environment};

#[derive(Debug, Parser)]
#[command(name = "ingestion", version, about = "Drone delivery ingestion service")]
struct Cli {
    /// Directory holding `base.toml` and `<env>.toml` (defaults to $INGESTION_CONFIG_DIR or ./config)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Deployment environment: local, staging or production (defaults to $INGESTION_ENV or local)
    #[arg(long = "env", global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP service (default)
    Serve,
    /// Print the OpenAPI document without starting the service
    Openapi {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

impl Cli {
    fn load_properties(&self) -> anyhow::Result<ApplicationProperties> {
        let environment = self
            .environment
            .as_deref()
            .map(str::parse::<Environment>)
            .transpose()?;
        ApplicationProperties::load_with(environment, self.config_dir.clone())
    }
}

fn write_openapi(output: Option<PathBuf>) -> anyhow::Result<()> {
    let json = ingestion_http::openapi_document()
        .to_pretty_json()
        .context("failed to render OpenAPI document")?;

    match output {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Openapi { output }) => write_openapi(output),
        Some(Command::Config) => {
            let properties = cli
                .load_properties()
                .with_context(|| "failed to load ingestion settings")?;
            let json = serde_json::to_string_pretty(&properties.redacted())?;
            println!("{json}");
            Ok(())
        }
        Some(Command::Serve) | None => {
            let properties = cli
                .load_properties()
                .with_context(|| "failed to load ingestion settings")?;
            ingestion_app::run(properties).await
        }
    }
}
