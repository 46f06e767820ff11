mod auth;
mod cache;
mod config;
mod db;
mod entities;
mod error;
mod mapper;
mod models;
mod repository;
mod routes;
mod tmdb;
mod validation;
mod viewmodel;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{AuthViewModel, FirebaseIdentity},
    cache::CacheManager,
    config::Config,
    repository::MovieRepository,
    tmdb::TmdbClient,
    viewmodel::MoviesViewModel,
};

pub struct AppState {
    pub config: Arc<Config>,
    pub repository: Arc<MovieRepository>,
    pub movies: Arc<MoviesViewModel>,
    pub auth: Arc<AuthViewModel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,moviedeck=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = wreq::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let cache = CacheManager::new(db);

    let tmdb = TmdbClient::new(
        http.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_rps,
    );
    let repository = Arc::new(MovieRepository::new(Arc::new(tmdb), Arc::new(cache)));

    let identity = FirebaseIdentity::new(
        http,
        config.firebase_api_key.clone(),
        config.firebase_auth_url.clone(),
    );
    let auth = Arc::new(AuthViewModel::new(Arc::new(identity)).await);

    let movies = Arc::new(MoviesViewModel::new(repository.clone()));
    tokio::spawn({
        let movies = movies.clone();
        async move { movies.init().await }
    });

    let state = Arc::new(AppState { config: config.clone(), repository, movies, auth });

    let app = Router::new()
        .route("/movies", get(routes::movies))
        .route("/movies/{category}/next", post(routes::next_page))
        .route("/movie/{id}", get(routes::movie))
        .route("/genres", get(routes::genres))
        .route("/auth/sign-in", post(routes::sign_in))
        .route("/auth/sign-up", post(routes::sign_up))
        .route("/auth/sign-out", post(routes::sign_out))
        .route("/auth/me", get(routes::me))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any)),
        );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
