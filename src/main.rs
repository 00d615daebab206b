use anyhow::Context;
use ingestion_app::ApplicationProperties;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let properties =
        ApplicationProperties::load().with_context(|| "failed to load ingestion settings")?;

    ingestion_app::run(properties).await
}
