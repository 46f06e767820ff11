use std::sync::Arc;

use futures::{StreamExt, future};
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    models::{Category, FetchResult, Movie, MovieDetails},
    repository::MovieRepository,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryState {
    pub page: u32,
    pub movies: Vec<Movie>,
    pub is_loading: bool,
}

impl Default for CategoryState {
    fn default() -> Self {
        Self { page: 1, movies: Vec::new(), is_loading: false }
    }
}

impl CategoryState {
    fn apply(&mut self, result: FetchResult<Vec<Movie>>) {
        match result {
            FetchResult::Loading(flag) => self.is_loading = flag,
            FetchResult::Success(movies) => {
                self.movies.extend(movies);
                self.page += 1;
            },
            FetchResult::Error(_) => self.is_loading = false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MoviesState {
    pub popular: CategoryState,
    pub upcoming: CategoryState,
    pub now_playing: CategoryState,
}

impl MoviesState {
    pub fn category(&self, category: Category) -> &CategoryState {
        match category {
            Category::Popular => &self.popular,
            Category::Upcoming => &self.upcoming,
            Category::NowPlaying => &self.now_playing,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryState {
        match category {
            Category::Popular => &mut self.popular,
            Category::Upcoming => &mut self.upcoming,
            Category::NowPlaying => &mut self.now_playing,
        }
    }
}

/// Paginated movie lists, one per category.
pub struct MoviesViewModel {
    repository: Arc<MovieRepository>,
    state: watch::Sender<MoviesState>,
}

impl MoviesViewModel {
    pub fn new(repository: Arc<MovieRepository>) -> Self {
        let (state, _) = watch::channel(MoviesState::default());
        Self { repository, state }
    }

    pub fn state(&self) -> MoviesState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MoviesState> {
        self.state.subscribe()
    }

    /// First load of every category. Served from cache when it has rows.
    pub async fn init(&self) {
        future::join_all(Category::ALL.map(|category| self.load(category, false))).await;
    }

    /// Next page of one category. Always goes to the remote source. Ignored
    /// while that category is still loading.
    pub async fn paginate(&self, category: Category) {
        self.load(category, true).await;
    }

    /// Claims the category and reads its page in one step. A category that is
    /// already loading is left alone, so a page is never requested twice.
    async fn load(&self, category: Category, force_refresh: bool) {
        let mut claimed = None;
        self.state.send_if_modified(|state| {
            let cat = state.category_mut(category);
            if cat.is_loading {
                return false;
            }
            cat.is_loading = true;
            claimed = Some(cat.page);
            true
        });
        let Some(page) = claimed else {
            tracing::debug!(category = %category, "category already loading, skipping");
            return;
        };

        let mut results = self.repository.get_movie_list(force_refresh, category, page);
        while let Some(result) = results.next().await {
            self.state.send_modify(|state| state.category_mut(category).apply(result));
        }

        tracing::debug!(category = %category, page = page, "category load finished");
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MovieDetailsState {
    pub is_loading: bool,
    pub movie: Option<Movie>,
    pub details: Option<MovieDetails>,
}

/// Detail screen for one movie: the cached summary plus fresh details.
pub struct MovieDetailsViewModel {
    repository: Arc<MovieRepository>,
    state: watch::Sender<MovieDetailsState>,
}

impl MovieDetailsViewModel {
    pub fn new(repository: Arc<MovieRepository>) -> Self {
        let (state, _) = watch::channel(MovieDetailsState::default());
        Self { repository, state }
    }

    pub fn state(&self) -> MovieDetailsState {
        self.state.borrow().clone()
    }

    pub async fn load(&self, id: i32) {
        future::join(self.load_details(id), self.load_movie(id)).await;
    }

    async fn load_details(&self, id: i32) {
        self.state.send_modify(|state| state.is_loading = true);
        let mut results = self.repository.get_movie_details(id);
        while let Some(result) = results.next().await {
            self.state.send_modify(|state| match result {
                FetchResult::Loading(flag) => state.is_loading = flag,
                FetchResult::Success(details) => state.details = Some(details),
                FetchResult::Error(_) => state.is_loading = false,
            });
        }
    }

    async fn load_movie(&self, id: i32) {
        self.state.send_modify(|state| state.is_loading = true);
        let mut results = self.repository.get_movie(id);
        while let Some(result) = results.next().await {
            self.state.send_modify(|state| match result {
                FetchResult::Loading(flag) => state.is_loading = flag,
                FetchResult::Success(movie) => state.movie = Some(movie),
                FetchResult::Error(_) => state.is_loading = false,
            });
        }
    }
}
