use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub api_base_url: Url,
    pub pdf_renderer_url: Option<Url>,
    pub request_timeout_secs: u64,
    pub fetch_concurrency: usize,
    pub list_rps: u32,
    pub certificate_issuer: String,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_CONCURRENCY: usize = 4;
const DEFAULT_LIST_RPS: u32 = 5;
const DEFAULT_CERTIFICATE_ISSUER: &str = "Candidate Portal";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let pdf_renderer_url = match get_env_opt("PDF_RENDERER_URL") {
            Some(raw) => Some(Url::parse(raw.trim()).map_err(|e| {
                Error::Config(format!("Invalid value for PDF_RENDERER_URL: {}", e))
            })?),
            None => None,
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            api_base_url: parse_url("API_BASE_URL", &get_env("API_BASE_URL")?)?,
            pdf_renderer_url,
            request_timeout_secs: get_env_parse_or(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            fetch_concurrency: get_env_parse_or("FETCH_CONCURRENCY", DEFAULT_FETCH_CONCURRENCY)?
                .max(1),
            list_rps: get_env_parse_or("LIST_RPS", DEFAULT_LIST_RPS)?,
            certificate_issuer: get_env_opt("CERTIFICATE_ISSUER")
                .unwrap_or_else(|| DEFAULT_CERTIFICATE_ISSUER.to_string()),
            cors_allowed_origins: get_env_opt("CORS_ALLOWED_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            log_format: match get_env_opt("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    /// Config pointing at the given backend, with every optional knob at its default.
    pub fn for_backend(api_base_url: Url) -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            api_base_url,
            pdf_renderer_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            list_rps: DEFAULT_LIST_RPS,
            certificate_issuer: DEFAULT_CERTIFICATE_ISSUER.to_string(),
            cors_allowed_origins: Vec::new(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    // Url::join drops the last path segment unless the base ends with a slash.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
