//! Bulk SMS: spreadsheet, request, and collection driven SMS dispatch.
//!
//! Main entry point that wires the stores, the provider, and the dispatch
//! engine together and starts the server.

use bulksms_api::{ApiServer, AppState};
use bulksms_channels::{SimulatedSmsSender, SmsSender, TwilioSmsSender};
use bulksms_core::config::{AppConfig, SmsProviderKind};
use bulksms_dispatch::{DispatchEngine, DispatchSettings};
use bulksms_sources::{MongoDocumentStore, RecipientSourceAdapter, UploadDirStore};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderArg {
    Twilio,
    Simulated,
}

impl From<ProviderArg> for SmsProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Twilio => SmsProviderKind::Twilio,
            ProviderArg::Simulated => SmsProviderKind::Simulated,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "bulksms")]
#[command(about = "Bulk SMS dispatch from spreadsheets, request arrays, and document collections")]
#[command(version)]
struct Cli {
    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "BULKSMS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Directory uploaded spreadsheets are stored in
    #[arg(long)]
    uploads_dir: Option<String>,

    /// Messaging provider
    #[arg(long, value_enum)]
    sms_provider: Option<ProviderArg>,

    #[arg(long, env = "TWILIO_ACCOUNT_SID", hide_env_values = true)]
    twilio_account_sid: Option<String>,

    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    twilio_auth_token: Option<String>,

    /// Sender number for outgoing messages
    #[arg(long, env = "TWILIO_PHONE_NUMBER")]
    twilio_from: Option<String>,

    #[arg(long)]
    mongo_uri: Option<String>,

    #[arg(long)]
    mongo_database: Option<String>,

    /// Sends in flight per batch
    #[arg(long)]
    concurrency: Option<usize>,

    /// Do not start the Prometheus exporter
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.api.host = host;
        }
        if let Some(port) = self.http_port {
            config.api.http_port = port;
        }
        if let Some(dir) = self.uploads_dir {
            config.uploads.dir = dir;
        }
        if let Some(provider) = self.sms_provider {
            config.sms.provider = provider.into();
        }
        if let Some(sid) = self.twilio_account_sid {
            config.sms.account_sid = sid;
        }
        if let Some(token) = self.twilio_auth_token {
            config.sms.auth_token = token;
        }
        if let Some(from) = self.twilio_from {
            config.sms.from_number = from;
        }
        if let Some(uri) = self.mongo_uri {
            config.mongo.uri = uri;
        }
        if let Some(database) = self.mongo_database {
            config.mongo.database = database;
        }
        if let Some(concurrency) = self.concurrency {
            config.dispatch.concurrency = concurrency;
        }
        if self.no_metrics {
            config.metrics.enabled = false;
        }
    }
}

fn build_sender(config: &AppConfig, settings: &DispatchSettings) -> anyhow::Result<Arc<dyn SmsSender>> {
    let sender: Arc<dyn SmsSender> = match config.sms.provider {
        SmsProviderKind::Twilio => Arc::new(TwilioSmsSender::new(config.sms.clone(), settings.send_timeout)?),
        SmsProviderKind::Simulated => Arc::new(SimulatedSmsSender::new(config.sms.from_number.clone())),
    };
    Ok(sender)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bulksms=info,bulksms_api=info,bulksms_dispatch=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Bulk SMS starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    cli.apply(&mut config);

    info!(
        http_port = config.api.http_port,
        uploads_dir = %config.uploads.dir,
        provider = ?config.sms.provider,
        mongo_database = %config.mongo.database,
        concurrency = config.dispatch.concurrency,
        "Configuration loaded"
    );

    // Recipient sources
    let files = Arc::new(UploadDirStore::new(&config.uploads.dir)?);
    let documents = Arc::new(MongoDocumentStore::connect(&config.mongo).await?);
    let sources = Arc::new(RecipientSourceAdapter::new(files, documents));

    // Provider and engine
    let settings = DispatchSettings::from(&config.dispatch);
    let sender = build_sender(&config, &settings)?;
    let engine = Arc::new(DispatchEngine::new(sender, settings));

    let state = AppState::new(sources, engine, config.dispatch.strict_pairing);
    let api_server = ApiServer::new(config, state);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Bulk SMS is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
