use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

const DEFAULT_ORIGINS: &str = "http://localhost:8080,http://localhost:3000,\
http://127.0.0.1:8080,http://127.0.0.1:3000,https://dashboardly-plot.vercel.app";

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub max_file_size: usize,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().with_context(|| format!("Invalid PORT: {}", raw))?,
            Err(_) => 8000,
        };

        let max_file_size = match std::env::var("MAX_FILE_SIZE") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("Invalid MAX_FILE_SIZE: {}", raw))?,
            Err(_) => default_max_file_size(),
        };

        let allowed_origins = parse_origins(
            &std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string()),
        );

        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./csv_analysis.db".to_string()),
            max_file_size,
            allowed_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_path: ":memory:".to_string(),
            max_file_size: default_max_file_size(),
            allowed_origins: parse_origins(DEFAULT_ORIGINS),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
