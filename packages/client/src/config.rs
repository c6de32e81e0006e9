use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROJECT_ID: &str = "vocabulary-38f8f";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_PREFETCH_THRESHOLD: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub firebase_api_key: Option<String>,
    pub project_id: String,
    pub database: String,
    pub firestore_base_url: String,
    pub identity_base_url: String,
    pub data_dir: PathBuf,
    pub page_size: usize,
    pub prefetch_threshold: usize,
    pub http_timeout: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        let page_size = env_parse::<usize>("PAGE_SIZE")
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let prefetch_threshold =
            env_parse::<usize>("PREFETCH_THRESHOLD").unwrap_or(DEFAULT_PREFETCH_THRESHOLD);

        let http_timeout = Duration::from_secs(env_parse::<u64>("HTTP_TIMEOUT_SECS").unwrap_or(30));

        let data_dir = env_string("LEXIDECK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Self {
            firebase_api_key: env_string("FIREBASE_API_KEY"),
            project_id: env_string("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
            database: env_string("FIRESTORE_DATABASE").unwrap_or_else(|| "(default)".to_string()),
            firestore_base_url: env_string("FIRESTORE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
            identity_base_url: env_string("IDENTITY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_string()),
            data_dir,
            page_size,
            prefetch_threshold,
            http_timeout,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("lexideck.db")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lexideck")
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|value| value.parse::<T>().ok())
}

impl Default for Config {
    /// Built-in defaults, ignoring the environment.
    fn default() -> Self {
        Self {
            firebase_api_key: None,
            project_id: DEFAULT_PROJECT_ID.to_string(),
            database: "(default)".to_string(),
            firestore_base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            http_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
        }
    }
}
