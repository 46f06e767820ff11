use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    auth::{AuthState, AuthUser},
    error::{AppError, AppResult},
    models::{Category, FetchResult, Genre, Movie},
    tmdb::image_url,
    validation::{SignInEvent, SignInForm, SignUpEvent, SignUpForm},
    viewmodel::{CategoryState, MovieDetailsState, MovieDetailsViewModel, MoviesState},
};

#[derive(Debug, Serialize)]
pub struct MovieCard {
    #[serde(flatten)]
    pub movie: Movie,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub page: u32,
    pub is_loading: bool,
    pub movies: Vec<MovieCard>,
}

#[derive(Debug, Serialize)]
pub struct MoviesView {
    pub popular: CategoryView,
    pub upcoming: CategoryView,
    pub now_playing: CategoryView,
}

impl MoviesView {
    fn build(state: MoviesState, image_base: &str) -> Self {
        let view = |cat: CategoryState| CategoryView {
            page: cat.page,
            is_loading: cat.is_loading,
            movies: cat
                .movies
                .into_iter()
                .map(|movie| MovieCard {
                    poster_url: image_url(image_base, &movie.poster_path),
                    backdrop_url: image_url(image_base, &movie.backdrop_path),
                    movie,
                })
                .collect(),
        };
        Self {
            popular: view(state.popular),
            upcoming: view(state.upcoming),
            now_playing: view(state.now_playing),
        }
    }
}

pub async fn movies(State(state): State<Arc<AppState>>) -> Json<MoviesView> {
    Json(MoviesView::build(state.movies.state(), &state.config.tmdb_image_base_url))
}

pub async fn next_page(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> AppResult<Json<MoviesView>> {
    let category = Category::from_path(&category)
        .ok_or_else(|| AppError::bad_request(format!("unknown category: {category}")))?;

    state.movies.paginate(category).await;
    Ok(Json(MoviesView::build(state.movies.state(), &state.config.tmdb_image_base_url)))
}

pub async fn movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Json<MovieDetailsState> {
    let details = MovieDetailsViewModel::new(state.repository.clone());
    details.load(id).await;
    Json(details.state())
}

pub async fn genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Genre>>> {
    let mut results = state.repository.get_genres();
    while let Some(result) = results.next().await {
        match result {
            FetchResult::Loading(_) => {},
            FetchResult::Success(genres) => return Ok(Json(genres)),
            FetchResult::Error(message) => return Err(AppError::bad_gateway(message)),
        }
    }
    Err(anyhow::anyhow!("genre fetch ended without a result").into())
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub async fn sign_in(State(state): State<Arc<AppState>>, Json(req): Json<SignInRequest>) -> Response {
    let mut form = SignInForm::default();
    form.on_event(SignInEvent::EmailChanged(req.email.trim().to_string()));
    form.on_event(SignInEvent::PasswordChanged(req.password));
    if !form.on_event(SignInEvent::Submit) {
        return (StatusCode::BAD_REQUEST, Json(form)).into_response();
    }

    auth_response(state.auth.sign_in(&form.email, &form.password).await)
}

pub async fn sign_up(State(state): State<Arc<AppState>>, Json(req): Json<SignUpRequest>) -> Response {
    let mut form = SignUpForm::default();
    form.on_event(SignUpEvent::EmailChanged(req.email.trim().to_string()));
    form.on_event(SignUpEvent::PasswordChanged(req.password));
    form.on_event(SignUpEvent::ConfirmPasswordChanged(req.confirm_password));
    if !form.on_event(SignUpEvent::Submit) {
        return (StatusCode::BAD_REQUEST, Json(form)).into_response();
    }

    auth_response(state.auth.sign_up(&form.email, &form.password).await)
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> Json<AuthState> {
    state.auth.logout().await;
    Json(state.auth.state())
}

pub async fn me(State(state): State<Arc<AppState>>) -> Json<Option<AuthUser>> {
    Json(state.auth.current_user().await)
}

fn auth_response(auth: AuthState) -> Response {
    let status = match &auth {
        AuthState::SignedIn(_) => StatusCode::OK,
        AuthState::Failure(_) => StatusCode::UNAUTHORIZED,
        AuthState::SignedOut | AuthState::Loading => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(auth)).into_response()
}
