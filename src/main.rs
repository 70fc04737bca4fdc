use database::Database;
use embedsync_core::{AppConfig, CoreError, ErrorReporter};
use ingest_service::{Pipeline, PipelineConfig};
use patreon_client::{
    FileTokenStore, HttpLinkValidator, PatreonApiClient, PatreonCredentials, SessionManager,
};
use tracing_subscriber::EnvFilter;
use youtube_client::YouTubeClient;

const DEFAULT_LOG_FILTER: &str =
    "embedsync=info,ingest_service=info,patreon_client=info,youtube_client=info,database=info";

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting embedsync import");

    let reporter = ErrorReporter::new();
    if let Err(e) = run().await {
        reporter.report_error(&e);
        return Err(e);
    }
    Ok(())
}

async fn run() -> Result<(), CoreError> {
    let config = AppConfig::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let timeout = config.request_timeout();

    let patreon = PatreonApiClient::new(&config.patreon_endpoint, timeout, &config.user_agent)?;
    let credentials = PatreonCredentials {
        email: config.patreon_email.clone(),
        password: config.patreon_password.clone(),
    };
    let sessions = SessionManager::new(
        patreon.clone(),
        FileTokenStore::new(&config.session_file),
        credentials,
    );

    let youtube = YouTubeClient::new(
        &config.youtube_endpoint,
        config.youtube_api_key.clone(),
        timeout,
        &config.user_agent,
    )?;
    let validator = HttpLinkValidator::new(timeout, &config.user_agent)?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let pipeline = Pipeline::new(
        sessions,
        patreon,
        youtube,
        validator,
        database,
        PipelineConfig::from(&config),
    );

    pipeline.run().await?;
    Ok(())
}
