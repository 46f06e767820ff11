use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub tmdb_rps: u32,
    pub database_url: String,
    pub http_timeout_secs: u64,
    pub firebase_api_key: String,
    pub firebase_auth_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|| "3000".to_string()).parse().context("PORT")?;

        let tmdb_api_key = var("TMDB_API_KEY").unwrap_or_default();
        let tmdb_base_url =
            var("TMDB_BASE_URL").unwrap_or_else(|| "https://api.themoviedb.org/3".to_string());
        let tmdb_image_base_url = var("TMDB_IMAGE_BASE_URL")
            .unwrap_or_else(|| "https://image.tmdb.org/t/p/w500".to_string());

        let tmdb_rps: u32 = var("TMDB_RPS").and_then(|s| s.parse().ok()).unwrap_or(4);

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://moviedeck.db?mode=rwc".to_string());

        let http_timeout_secs: u64 =
            var("HTTP_TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(30);

        let firebase_api_key = var("FIREBASE_API_KEY").unwrap_or_default();
        let firebase_auth_url = var("FIREBASE_AUTH_URL")
            .unwrap_or_else(|| "https://identitytoolkit.googleapis.com/v1".to_string());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            tmdb_api_key,
            tmdb_base_url,
            tmdb_image_base_url,
            tmdb_rps,
            database_url,
            http_timeout_secs,
            firebase_api_key,
            firebase_auth_url,
        })
    }
}
