/// Configuration management for the API server
///
/// Everything is read from environment variables, with a `.env` file honoured
/// in development.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8080`)
/// - `API_PRODUCTION`: enables HSTS (default `false`)
/// - `CORS_ORIGINS`: comma separated origins or `*` (default `*`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
/// - `JWT_SECRET`: bearer token secret, at least 32 bytes (required)
/// - `GEMINI_API_KEY`, `GEMINI_PAID_API_KEY`, `GROQ_API_KEY`: AI tiers; a tier without a key is skipped
/// - `GEMINI_BASE_URL`, `GROQ_BASE_URL`: provider endpoints
/// - `VALIDATOR_POLICY`: `fail_open` (default) or `fail_closed`
/// - `DAILY_FREE_CREDITS`, `MAX_DAILY_CREDIT_CAP`, `CREDITS_PER_REFERRAL`: credit policy
/// - `COURSE_COST`, `EXAM_COST`, `LESSON_COST`: credits per generation
/// - `LESSON_REPORT_THRESHOLD`: reports before a cached lesson is dropped (default 3)
/// - `CA_MAX`, `EXAM_MAX`: grade component weights (default 40 / 60)
/// - `PAYSTACK_SECRET_KEY`, `PAYSTACK_BASE_URL`, `PAYMENT_CALLBACK_URL`: payments
/// - `GENERATION_RATE_LIMIT`: generation requests per user per minute (default 10)
/// - `LOG_FORMAT`: `pretty` (default) or `json`
///
/// # Example
///
/// ```no_run
/// use akili_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use akili_shared::credits::CreditPolicy;
use akili_shared::grading::GradingConfig;
use akili_shared::paystack::client::DEFAULT_BASE_URL as PAYSTACK_DEFAULT_BASE_URL;
use akili_tutor::fallback::ProviderSettings;
use akili_tutor::pipeline::GenerationCosts;
use akili_tutor::providers::{gemini, groq};
use akili_tutor::validator::ValidationPolicy;
use anyhow::{anyhow, bail};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// AI tier credentials and endpoints
    pub providers: ProviderSettings,
    pub validator_policy: ValidationPolicy,
    pub credits: CreditPolicy,
    pub costs: GenerationCosts,
    pub grading: GradingConfig,

    /// Reports after which a cached lesson is deleted
    pub lesson_report_threshold: i32,

    /// `None` when `PAYSTACK_SECRET_KEY` is unset
    pub paystack: Option<PaystackConfig>,

    /// Generation requests allowed per user per minute
    pub generation_rate_limit: u32,
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Enables HSTS
    pub production: bool,

    /// Allowed origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret, at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub base_url: String,
    pub callback_url: Option<String>,
}

impl std::fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("base_url", &self.base_url)
            .field("callback_url", &self.callback_url)
            .finish_non_exhaustive()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Variable lookup; `None` for unset or blank values
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("{key} environment variable is required"))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
            None => Ok(default),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 bytes
    /// - a variable has a value that does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let jwt_secret = vars.require("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }

        let defaults = CreditPolicy::default();
        let credits = CreditPolicy {
            daily_free_credits: vars.parse_or("DAILY_FREE_CREDITS", defaults.daily_free_credits)?,
            max_daily_cap: vars.parse_or("MAX_DAILY_CREDIT_CAP", defaults.max_daily_cap)?,
            credits_per_referral: vars.parse_or("CREDITS_PER_REFERRAL", defaults.credits_per_referral)?,
        };
        if credits.daily_free_credits < 0 || credits.max_daily_cap < credits.daily_free_credits {
            bail!("MAX_DAILY_CREDIT_CAP must be at least DAILY_FREE_CREDITS");
        }

        let default_costs = GenerationCosts::default();
        let costs = GenerationCosts {
            course: vars.parse_or("COURSE_COST", default_costs.course)?,
            exam: vars.parse_or("EXAM_COST", default_costs.exam)?,
            lesson: vars.parse_or("LESSON_COST", default_costs.lesson)?,
        };
        if costs.course <= 0 || costs.exam <= 0 || costs.lesson <= 0 {
            bail!("Generation costs must be positive");
        }

        let default_grading = GradingConfig::default();
        let grading = GradingConfig {
            ca_max: vars.parse_or("CA_MAX", default_grading.ca_max)?,
            exam_max: vars.parse_or("EXAM_MAX", default_grading.exam_max)?,
        };

        let paystack = vars.get("PAYSTACK_SECRET_KEY").map(|secret_key| PaystackConfig {
            secret_key,
            base_url: vars
                .get("PAYSTACK_BASE_URL")
                .unwrap_or_else(|| PAYSTACK_DEFAULT_BASE_URL.to_string()),
            callback_url: vars.get("PAYMENT_CALLBACK_URL"),
        });

        let cors_origins = vars
            .get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: vars.get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: vars.parse_or("API_PORT", 8080)?,
                production: vars.parse_or("API_PRODUCTION", false)?,
                cors_origins,
            },
            database: DatabaseConfig {
                url: vars.require("DATABASE_URL")?,
                max_connections: vars.parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            providers: ProviderSettings {
                gemini_api_key: vars.get("GEMINI_API_KEY"),
                gemini_paid_api_key: vars.get("GEMINI_PAID_API_KEY"),
                groq_api_key: vars.get("GROQ_API_KEY"),
                gemini_base_url: vars
                    .get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
                groq_base_url: vars
                    .get("GROQ_BASE_URL")
                    .unwrap_or_else(|| groq::DEFAULT_BASE_URL.to_string()),
            },
            validator_policy: vars.parse_or("VALIDATOR_POLICY", ValidationPolicy::default())?,
            credits,
            costs,
            grading,
            lesson_report_threshold: vars.parse_or::<i32>("LESSON_REPORT_THRESHOLD", 3)?.max(1),
            paystack,
            generation_rate_limit: vars.parse_or("GENERATION_RATE_LIMIT", 10)?,
            log_format: vars.parse_or("LOG_FORMAT", LogFormat::default())?,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
