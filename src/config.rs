// src/config.rs

use std::env;
use dotenvy::dotenv;
use url::Url;

/// Smallest quiz a learner may request.
pub const MIN_QUESTIONS: usize = 3;

/// Largest quiz a learner may request.
pub const MAX_QUESTIONS: usize = 10;

/// Longest per-quiz time limit a learner may pick, in minutes.
pub const MAX_TIME_LIMIT_MINUTES: u64 = 30;

/// Size of the built-in question library used when generation fails.
pub const FALLBACK_QUESTION_COUNT: usize = 5;

/// A quiz at or above this percentage counts as a success.
pub const SUCCESS_THRESHOLD: f64 = 70.0;

/// Topics averaging below this are flagged as the weakest area.
pub const WEAK_TOPIC_THRESHOLD: f64 = 70.0;

/// Trend drop (in percentage points) that flags a topic as declining.
pub const DECLINE_TREND_THRESHOLD: f64 = -10.0;

/// Difficulties averaging below this get a practice recommendation.
pub const WEAK_DIFFICULTY_THRESHOLD: f64 = 60.0;

/// Maximum number of recommendations returned.
pub const MAX_RECOMMENDATIONS: usize = 3;

const DEFAULT_GENERATOR_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Settings for the remote text-generation endpoint.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: Url,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the service keeps history in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Lifetime of a quiz token, in seconds.
    pub quiz_token_ttl: u64,
    pub generator: GeneratorConfig,
    pub bind_addr: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let quiz_token_ttl = env::var("QUIZ_TOKEN_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let base_url = env::var("GENERATOR_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GENERATOR_BASE_URL.to_string());
        let base_url = Url::parse(&base_url)
            .expect("GENERATOR_BASE_URL must be a valid URL");

        let generator = GeneratorConfig {
            base_url,
            model: env::var("GENERATOR_MODEL").unwrap_or_else(|_| "gpt2".to_string()),
            api_key: env::var("HUGGINGFACE_API_KEY").ok().filter(|v| !v.is_empty()),
            timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        };

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            quiz_token_ttl,
            generator,
            bind_addr,
            rust_log,
        }
    }
}
