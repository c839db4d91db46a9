use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Which rule classification strategy the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Deterministic,
    Generative,
}

impl ClassifierKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deterministic" | "rules" | "strict" => Some(Self::Deterministic),
            "generative" | "llm" | "agent" => Some(Self::Generative),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClassifierKind::Deterministic => "deterministic",
            ClassifierKind::Generative => "generative",
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
    pub policy: PolicyConfig,
    pub model: ModelConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let classifier_raw =
            env::var("APP_CLASSIFIER").unwrap_or_else(|_| "deterministic".to_string());
        let classifier = ClassifierKind::parse(&classifier_raw)
            .ok_or(ConfigError::InvalidClassifier(classifier_raw))?;

        let max_concurrency = positive_var("APP_MAX_CONCURRENCY", 4)?;
        let top_k = positive_var("APP_RETRIEVAL_TOP_K", 2)?;

        let source_path = env::var("APP_POLICY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/settlement_policy.md"));
        let index_path = env::var("APP_POLICY_INDEX_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let base_url = env::var("APP_MODEL_BASE_URL")
            .unwrap_or_else(|_| ModelConfig::DEFAULT_BASE_URL.to_string());
        let model_name =
            env::var("APP_MODEL_NAME").unwrap_or_else(|_| ModelConfig::DEFAULT_MODEL.to_string());
        let api_key = env::var("APP_MODEL_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|value| !value.trim().is_empty());
        let timeout_secs = positive_var("APP_MODEL_TIMEOUT_SECS", 30)?;

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineConfig {
                classifier,
                max_concurrency,
            },
            policy: PolicyConfig {
                source_path,
                index_path,
                top_k,
            },
            model: ModelConfig {
                base_url,
                model: model_name,
                api_key,
                timeout: Duration::from_secs(timeout_secs as u64),
            },
        })
    }
}

fn positive_var(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidNumber { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Batch orchestration settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub classifier: ClassifierKind,
    pub max_concurrency: usize,
}

/// Where the policy corpus lives and how much of it each query returns.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub source_path: PathBuf,
    pub index_path: Option<PathBuf>,
    pub top_k: usize,
}

/// OpenAI-compatible completion endpoint used by the generative classifier.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ModelConfig {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/openai";
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash-lite";
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidClassifier(String),
    InvalidNumber { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidClassifier(value) => write!(
                f,
                "APP_CLASSIFIER must be 'deterministic' or 'generative' (got '{value}')"
            ),
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a positive integer (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
