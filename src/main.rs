use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weibo_topic_crawler::api::ApiClient;
use weibo_topic_crawler::config::{Config, WriteMode};
use weibo_topic_crawler::crawler::{self, CrawlSession};
use weibo_topic_crawler::media::{self, MediaKind};
use weibo_topic_crawler::models::Post;
use weibo_topic_crawler::sink::{CsvSink, Sink, SqliteSink};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting weibo-topic-crawler");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(topics = config.topics.len(), "Configuration loaded");

    let client = ApiClient::new(&config.api_base_url, &config.cookie)
        .context("Failed to build API client")?;

    // Topics run strictly in list order; one topic's failure never stops
    // the ones after it.
    for topic in &config.topics {
        let mut session = CrawlSession::new(topic.clone());

        let mut sinks = match build_sinks(&config, topic).await {
            Ok(sinks) => sinks,
            Err(e) => {
                error!(topic = %topic, "Could not set up sinks: {e:#}");
                continue;
            }
        };

        if let Err(e) = crawler::crawl_topic(&client, &config, &mut sinks, &mut session).await {
            error!(topic = %topic, "Topic crawl failed: {e:#}");
        }

        info!(
            topic = %topic,
            records = session.fetched_count(),
            flushed = session.flushed_count(),
            "Topic finished"
        );

        download_media(&client, &config, topic, &session).await;
    }

    Ok(())
}

async fn build_sinks(config: &Config, topic: &str) -> Result<Vec<Box<dyn Sink>>> {
    let topic_dir = config.output_dir.join(topic);
    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
    for mode in &config.write_modes {
        match mode {
            WriteMode::Csv => {
                let sink = CsvSink::create(&topic_dir, topic)
                    .await
                    .context("Failed to create CSV sink")?;
                sinks.push(Box::new(sink));
            }
            WriteMode::Sqlite => {
                let sink = SqliteSink::connect(&config.database_path)
                    .await
                    .context("Failed to open SQLite sink")?;
                sinks.push(Box::new(sink));
            }
        }
    }
    Ok(sinks)
}

async fn download_media(client: &ApiClient, config: &Config, topic: &str, session: &CrawlSession) {
    if !config.pic_download && !config.video_download {
        return;
    }

    let posts: Vec<&Post> = session
        .records()
        .iter()
        .filter_map(weibo_topic_crawler::models::Record::as_post)
        .collect();
    let topic_dir = config.output_dir.join(topic);

    if config.pic_download {
        if let Err(e) = media::download_all(client.http(), &posts, &topic_dir, MediaKind::Image).await
        {
            error!(topic = %topic, "Image download failed: {e:#}");
        }
    }
    if config.video_download {
        if let Err(e) = media::download_all(client.http(), &posts, &topic_dir, MediaKind::Video).await
        {
            error!(topic = %topic, "Video download failed: {e:#}");
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,weibo_topic_crawler=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
