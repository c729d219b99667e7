use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `BULKSMS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Which messaging provider backs the dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsProviderKind {
    Twilio,
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_sms_provider")]
    pub provider: SmsProviderKind,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub messaging_service_sid: Option<String>,
    #[serde(default)]
    pub status_callback_url: Option<String>,
    #[serde(default = "default_twilio_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    #[serde(default = "default_mongo_uri")]
    pub uri: String,
    #[serde(default = "default_mongo_database")]
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of sends in flight for one batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Reject paired arrays of different lengths instead of truncating.
    #[serde(default)]
    pub strict_pairing: bool,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    5000
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_upload_dir() -> String {
    "uploads".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_sms_provider() -> SmsProviderKind {
    SmsProviderKind::Simulated
}
fn default_twilio_base_url() -> String {
    "https://api.twilio.com".to_string()
}
fn default_mongo_uri() -> String {
    "mongodb://localhost:27017/".to_string()
}
fn default_mongo_database() -> String {
    "sms_database".to_string()
}
fn default_concurrency() -> usize {
    4
}
fn default_send_timeout_ms() -> u64 {
    5000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: default_sms_provider(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            messaging_service_sid: None,
            status_callback_url: None,
            api_base_url: default_twilio_base_url(),
        }
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: default_mongo_uri(),
            database: default_mongo_database(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            send_timeout_ms: default_send_timeout_ms(),
            strict_pairing: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            uploads: UploadConfig::default(),
            sms: SmsConfig::default(),
            mongo: MongoConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl SmsConfig {
    /// Twilio needs credentials and a sender; the simulated provider needs nothing.
    pub fn validate(&self) -> Result<(), String> {
        if self.provider != SmsProviderKind::Twilio {
            return Ok(());
        }
        if self.account_sid.is_empty() {
            return Err("sms.account_sid must be set for the twilio provider".to_string());
        }
        if self.auth_token.is_empty() {
            return Err("sms.auth_token must be set for the twilio provider".to_string());
        }
        if self.from_number.is_empty() && self.messaging_service_sid.is_none() {
            return Err(
                "sms.from_number or sms.messaging_service_sid must be set for the twilio provider"
                    .to_string(),
            );
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("BULKSMS")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 5000);
        assert_eq!(config.uploads.dir, "uploads");
        assert_eq!(config.sms.provider, SmsProviderKind::Simulated);
        assert_eq!(config.mongo.database, "sms_database");
        assert_eq!(config.dispatch.concurrency, 4);
        assert!(!config.dispatch.strict_pairing);
    }

    #[test]
    fn test_simulated_provider_needs_no_credentials() {
        assert!(SmsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_twilio_provider_requires_credentials() {
        let mut sms = SmsConfig {
            provider: SmsProviderKind::Twilio,
            ..SmsConfig::default()
        };
        assert!(sms.validate().unwrap_err().contains("account_sid"));

        sms.account_sid = "AC123".to_string();
        assert!(sms.validate().unwrap_err().contains("auth_token"));

        sms.auth_token = "secret".to_string();
        assert!(sms.validate().unwrap_err().contains("from_number"));

        sms.from_number = "+15550001111".to_string();
        assert!(sms.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_tree() {
        let json = serde_json::json!({
            "sms": { "provider": "twilio", "from_number": "+1555" },
            "dispatch": { "concurrency": 8 }
        });
        let config: AppConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.sms.provider, SmsProviderKind::Twilio);
        assert_eq!(config.sms.api_base_url, "https://api.twilio.com");
        assert_eq!(config.dispatch.concurrency, 8);
        assert_eq!(config.dispatch.send_timeout_ms, 5000);
        assert_eq!(config.api.host, "0.0.0.0");
    }
}
