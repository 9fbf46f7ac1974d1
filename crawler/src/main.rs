use std::sync::Arc;

use mdht_crawler::{Config, Spider, SqliteSink};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let db_path = std::env::var("MDHT_DB_PATH").unwrap_or_else(|_| "mdht.sqlite3".to_string());

    let sink: Arc<dyn mdht_crawler::MetadataSink> = Arc::new(
        SqliteSink::open(&db_path).map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?,
    );

    let spider = Spider::start(&config, sink).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("main: shutdown signal received, stopping");
    spider.stop().await;

    Ok(())
}
