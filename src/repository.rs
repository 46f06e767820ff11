//! Cache-aside fetch pipeline.
//!
//! Every operation returns a stream of exactly three emissions:
//! `Loading(true)`, then one `Success` or `Error`, then `Loading(false)`.
//! Failures never escape; they are logged with their class and collapsed
//! into a fixed message.

use std::{future::Future, sync::Arc};

use futures::{
    StreamExt, future,
    stream::{self, BoxStream},
};
use tracing::{debug, warn};

use crate::{
    cache::{self, MovieStore},
    mapper,
    models::{Category, FetchResult, Genre, Movie, MovieDetails},
    tmdb::MovieSource,
};

pub type FetchStream<'a, T> = BoxStream<'a, FetchResult<T>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Error loading movies")]
    LoadMovies,
    #[error("Error no such movie")]
    NoSuchMovie,
    #[error("Error loading genres")]
    LoadGenres,
}

#[derive(Clone)]
pub struct MovieRepository {
    source: Arc<dyn MovieSource>,
    store: Arc<dyn MovieStore>,
}

impl MovieRepository {
    pub fn new(source: Arc<dyn MovieSource>, store: Arc<dyn MovieStore>) -> Self {
        Self { source, store }
    }

    pub fn get_movie_list(
        &self,
        force_refresh: bool,
        category: Category,
        page: u32,
    ) -> FetchStream<'_, Vec<Movie>> {
        staged(self.load_movie_list(force_refresh, category, page))
    }

    /// Cache only. Relies on an earlier list fetch having stored the movie.
    pub fn get_movie(&self, id: i32) -> FetchStream<'_, Movie> {
        staged(self.load_movie(id))
    }

    pub fn get_movie_details(&self, id: i32) -> FetchStream<'_, MovieDetails> {
        staged(self.load_movie_details(id))
    }

    pub fn get_genres(&self) -> FetchStream<'_, Vec<Genre>> {
        staged(self.load_genres())
    }

    async fn load_movie_list(
        &self,
        force_refresh: bool,
        category: Category,
        page: u32,
    ) -> Result<Vec<Movie>, FetchError> {
        let cached = self.store.get_movies_by_category(category).await.map_err(|err| {
            warn!(category = %category, error = %err, "failed to read movie cache");
            FetchError::LoadMovies
        })?;

        if !cached.is_empty() && !force_refresh {
            debug!(category = %category, rows = cached.len(), "serving movies from cache");
            return Ok(cached.into_iter().map(|row| mapper::to_movie(row, category)).collect());
        }

        debug!(category = %category, page = page, force_refresh, "fetching movies from remote");
        let list = self.source.movie_list(category, page).await.map_err(|err| {
            warn!(category = %category, page = page, class = err.class(), error = %err, "failed to load movies");
            FetchError::LoadMovies
        })?;

        let cached_at = cache::now_sec();
        let rows: Vec<_> = list
            .results
            .into_iter()
            .map(|dto| mapper::to_cache_row(dto, category, cached_at))
            .collect();

        self.store.upsert_movies(rows.clone()).await.map_err(|err| {
            warn!(category = %category, error = %err, "failed to store movies");
            FetchError::LoadMovies
        })?;

        Ok(rows.into_iter().map(|row| mapper::to_movie(row, category)).collect())
    }

    async fn load_movie(&self, id: i32) -> Result<Movie, FetchError> {
        let row = match self.store.get_movie(id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!(id = id, "movie not cached");
                return Err(FetchError::NoSuchMovie);
            },
            Err(err) => {
                warn!(id = id, error = %err, "failed to read movie cache");
                return Err(FetchError::NoSuchMovie);
            },
        };

        let Some(category) = Category::from_path(&row.category) else {
            warn!(id = id, category = %row.category, "cached movie has unknown category");
            return Err(FetchError::NoSuchMovie);
        };

        Ok(mapper::to_movie(row, category))
    }

    async fn load_movie_details(&self, id: i32) -> Result<MovieDetails, FetchError> {
        let dto = self.source.movie_details(id).await.map_err(|err| {
            warn!(id = id, class = err.class(), error = %err, "failed to load movie details");
            FetchError::LoadMovies
        })?;
        Ok(mapper::to_movie_details(dto))
    }

    async fn load_genres(&self) -> Result<Vec<Genre>, FetchError> {
        let list = self.source.genres().await.map_err(|err| {
            warn!(class = err.class(), error = %err, "failed to load genres");
            FetchError::LoadGenres
        })?;
        Ok(list.genres.into_iter().map(mapper::to_genre).collect())
    }
}

/// Brackets one unit of work with `Loading(true)` / `Loading(false)`. The
/// work is not polled until the opening emission has been consumed.
fn staged<'a, T, F>(work: F) -> FetchStream<'a, T>
where
    T: Send + 'a,
    F: Future<Output = Result<T, FetchError>> + Send + 'a,
{
    stream::once(future::ready(FetchResult::Loading(true)))
        .chain(stream::once(work).map(|outcome| match outcome {
            Ok(value) => FetchResult::Success(value),
            Err(err) => FetchResult::Error(err.to_string()),
        }))
        .chain(stream::once(future::ready(FetchResult::Loading(false))))
        .boxed()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        cache::CacheManager,
        db,
        entities::movie,
        error::RemoteError,
        tmdb::{GenreDto, GenreListDto, MovieDetailsDto, MovieDto, MovieListDto},
    };

    /// Remote source double that counts calls and can be told to fail. With a
    /// `gate`, list calls wait for a notification before answering.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub ids: Vec<i32>,
        pub failure: Option<RemoteError>,
        pub gate: Option<Arc<tokio::sync::Notify>>,
        pub list_calls: AtomicUsize,
        pub detail_calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn with_ids(ids: &[i32]) -> Self {
            Self { ids: ids.to_vec(), ..Default::default() }
        }

        pub fn failing(err: RemoteError) -> Self {
            Self { failure: Some(err), ..Default::default() }
        }

        pub fn calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst) + self.detail_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl MovieSource for FakeSource {
        async fn movie_list(
            &self,
            category: Category,
            page: u32,
        ) -> Result<MovieListDto, RemoteError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            // Ids are distinct per (category, page) so lists never collide in the cache.
            let band = match category {
                Category::Popular => 0,
                Category::Upcoming => 100,
                Category::NowPlaying => 200,
            };
            let offset = i32::try_from(page).unwrap_or(0) * 1_000 + band;
            let results = self
                .ids
                .iter()
                .map(|id| MovieDto {
                    id: Some(id + offset),
                    title: Some(format!("Movie {}", id + offset)),
                    genre_ids: Some(vec![28, 12]),
                    ..Default::default()
                })
                .collect();
            Ok(MovieListDto { page: page as i32, results, ..Default::default() })
        }

        async fn movie_details(&self, id: i32) -> Result<MovieDetailsDto, RemoteError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            Ok(MovieDetailsDto {
                id: Some(id),
                title: Some("Detailed".to_string()),
                runtime: Some(120),
                ..Default::default()
            })
        }

        async fn genres(&self) -> Result<GenreListDto, RemoteError> {
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            Ok(GenreListDto {
                genres: vec![
                    GenreDto { id: Some(28), name: Some("Action".to_string()) },
                    GenreDto { id: None, name: None },
                ],
            })
        }
    }

    /// Cache double whose writes always fail. Reads fail too when `fail_reads` is set.
    #[derive(Default)]
    pub(crate) struct FailingStore {
        pub fail_reads: bool,
    }

    impl FailingStore {
        fn error() -> sea_orm::DbErr {
            sea_orm::DbErr::Custom("disk I/O error".to_string())
        }
    }

    #[async_trait::async_trait]
    impl MovieStore for FailingStore {
        async fn upsert_movies(&self, _rows: Vec<movie::Model>) -> Result<(), sea_orm::DbErr> {
            Err(Self::error())
        }

        async fn get_movie(&self, _id: i32) -> Result<Option<movie::Model>, sea_orm::DbErr> {
            if self.fail_reads { Err(Self::error()) } else { Ok(None) }
        }

        async fn get_movies_by_category(
            &self,
            _category: Category,
        ) -> Result<Vec<movie::Model>, sea_orm::DbErr> {
            if self.fail_reads { Err(Self::error()) } else { Ok(Vec::new()) }
        }
    }

    async fn setup(
        source: FakeSource,
    ) -> Result<(MovieRepository, Arc<FakeSource>, Arc<CacheManager>), sea_orm::DbErr> {
        let source = Arc::new(source);
        let store = Arc::new(CacheManager::new(db::memory().await?));
        let repo = MovieRepository::new(source.clone(), store.clone());
        Ok((repo, source, store))
    }

    async fn seed(store: &CacheManager, ids: &[i32], category: Category) -> Result<(), sea_orm::DbErr> {
        let rows = ids
            .iter()
            .map(|id| {
                let dto = MovieDto { id: Some(*id), title: Some(format!("Cached {id}")), ..Default::default() };
                mapper::to_cache_row(dto, category, 0)
            })
            .collect();
        store.upsert_movies(rows).await
    }

    fn success<T: Clone>(emissions: &[FetchResult<T>]) -> Option<T> {
        emissions.iter().find_map(|e| match e {
            FetchResult::Success(value) => Some(value.clone()),
            _ => None,
        })
    }

    #[tokio::test]
    async fn non_empty_cache_short_circuits_remote() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, source, store) = setup(FakeSource::with_ids(&[1, 2])).await?;
        seed(&store, &[10, 11, 12], Category::Popular).await?;

        let expected: Vec<Movie> = store
            .get_movies_by_category(Category::Popular)
            .await?
            .into_iter()
            .map(|row| mapper::to_movie(row, Category::Popular))
            .collect();

        let emissions: Vec<_> = repo.get_movie_list(false, Category::Popular, 1).collect().await;

        assert_eq!(
            emissions,
            vec![
                FetchResult::Loading(true),
                FetchResult::Success(expected),
                FetchResult::Loading(false)
            ]
        );
        assert_eq!(source.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, source, store) = setup(FakeSource::with_ids(&[1, 2])).await?;
        seed(&store, &[10, 11, 12], Category::Popular).await?;

        let emissions: Vec<_> = repo.get_movie_list(true, Category::Popular, 2).collect().await;

        assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(emissions.len(), 3);
        assert_eq!(emissions.last(), Some(&FetchResult::Loading(false)));

        let fetched = success(&emissions).ok_or("no success emitted")?;
        let ids: Vec<i32> = fetched.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2001, 2002]);
        assert!(fetched.iter().all(|m| m.genre_ids == vec![28, 12]));

        let mut stored: Vec<i32> = store
            .get_movies_by_category(Category::Popular)
            .await?
            .iter()
            .map(|row| row.id)
            .collect();
        stored.sort_unstable();
        assert_eq!(stored, vec![10, 11, 12, 2001, 2002]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_cache_fetches_remote_without_force() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, source, store) = setup(FakeSource::with_ids(&[5])).await?;

        let emissions: Vec<_> = repo.get_movie_list(false, Category::Upcoming, 1).collect().await;

        assert_eq!(source.calls(), 1);
        let fetched = success(&emissions).ok_or("no success emitted")?;
        assert_eq!(fetched[0].category, Category::Upcoming);
        assert_eq!(store.get_movies_by_category(Category::Upcoming).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn every_remote_failure_collapses_to_one_message() -> Result<(), Box<dyn std::error::Error>> {
        let failures = [
            RemoteError::Transport("connection refused".to_string()),
            RemoteError::Status(500),
            RemoteError::Decode("expected value at line 1".to_string()),
        ];

        for failure in failures {
            let (repo, _source, store) = setup(FakeSource::failing(failure)).await?;
            let emissions: Vec<_> = repo.get_movie_list(true, Category::NowPlaying, 1).collect().await;

            assert_eq!(
                emissions,
                vec![
                    FetchResult::Loading(true),
                    FetchResult::Error("Error loading movies".to_string()),
                    FetchResult::Loading(false)
                ]
            );
            assert!(store.get_movies_by_category(Category::NowPlaying).await?.is_empty());
        }
        Ok(())
    }

    #[tokio::test]
    async fn missing_movie_never_contacts_remote() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, source, _store) = setup(FakeSource::with_ids(&[1])).await?;

        let emissions: Vec<_> = repo.get_movie(42).collect().await;

        assert_eq!(
            emissions,
            vec![
                FetchResult::Loading(true),
                FetchResult::Error("Error no such movie".to_string()),
                FetchResult::Loading(false)
            ]
        );
        assert_eq!(source.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn cached_movie_keeps_stored_category() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, _source, store) = setup(FakeSource::default()).await?;
        seed(&store, &[7], Category::Popular).await?;
        seed(&store, &[7], Category::Upcoming).await?;

        let emissions: Vec<_> = repo.get_movie(7).collect().await;
        let movie = success(&emissions).ok_or("no success emitted")?;
        assert_eq!(movie.category, Category::Upcoming);
        assert_eq!(movie.title, "Cached 7");
        Ok(())
    }

    #[tokio::test]
    async fn details_always_hit_remote() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, source, _store) = setup(FakeSource::default()).await?;

        let first: Vec<_> = repo.get_movie_details(550).collect().await;
        let second: Vec<_> = repo.get_movie_details(550).collect().await;

        assert_eq!(source.detail_calls.load(Ordering::SeqCst), 2);
        let details = success(&first).ok_or("no success emitted")?;
        assert_eq!(details.id, 550);
        assert_eq!(details.runtime, 120);
        assert_eq!(details.belongs_to_collection.id, -1);
        assert_eq!(first, second);

        let (repo, _source, _store) = setup(FakeSource::failing(RemoteError::Status(404))).await?;
        let failed: Vec<_> = repo.get_movie_details(550).collect().await;
        assert_eq!(failed[1], FetchResult::Error("Error loading movies".to_string()));
        assert_eq!(failed[2], FetchResult::Loading(false));
        Ok(())
    }

    #[tokio::test]
    async fn genres_default_missing_fields() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, _source, _store) = setup(FakeSource::default()).await?;
        let emissions: Vec<_> = repo.get_genres().collect().await;
        let genres = success(&emissions).ok_or("no success emitted")?;
        assert_eq!(genres[0], Genre { id: 28, name: "Action".to_string() });
        assert_eq!(genres[1], Genre { id: -1, name: String::new() });
        Ok(())
    }

    #[tokio::test]
    async fn loading_is_emitted_before_remote_call() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, source, _store) = setup(FakeSource::with_ids(&[1])).await?;
        let mut stream = repo.get_movie_list(true, Category::Popular, 1);

        assert_eq!(stream.next().await, Some(FetchResult::Loading(true)));
        assert_eq!(source.calls(), 0);

        assert!(matches!(stream.next().await, Some(FetchResult::Success(_))));
        assert_eq!(source.calls(), 1);
        assert_eq!(stream.next().await, Some(FetchResult::Loading(false)));
        assert_eq!(stream.next().await, None);
        Ok(())
    }

    fn failed_with(message: &str) -> Vec<FetchResult<Vec<Movie>>> {
        vec![
            FetchResult::Loading(true),
            FetchResult::Error(message.to_string()),
            FetchResult::Loading(false),
        ]
    }

    #[tokio::test]
    async fn unreadable_cache_fails_list_without_remote_call() {
        let source = Arc::new(FakeSource::with_ids(&[1]));
        let store = Arc::new(FailingStore { fail_reads: true });
        let repo = MovieRepository::new(source.clone(), store);

        let emissions: Vec<_> = repo.get_movie_list(false, Category::Popular, 1).collect().await;

        assert_eq!(emissions, failed_with("Error loading movies"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn failed_upsert_discards_fetched_page() {
        let source = Arc::new(FakeSource::with_ids(&[1, 2]));
        let store = Arc::new(FailingStore::default());
        let repo = MovieRepository::new(source.clone(), store);

        let emissions: Vec<_> = repo.get_movie_list(true, Category::Upcoming, 1).collect().await;

        assert_eq!(emissions, failed_with("Error loading movies"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn unreadable_cache_reports_no_such_movie() {
        let source = Arc::new(FakeSource::default());
        let store = Arc::new(FailingStore { fail_reads: true });
        let repo = MovieRepository::new(source.clone(), store);

        let emissions: Vec<_> = repo.get_movie(7).collect().await;

        assert_eq!(
            emissions,
            vec![
                FetchResult::Loading(true),
                FetchResult::Error("Error no such movie".to_string()),
                FetchResult::Loading(false)
            ]
        );
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_stored_category_is_treated_as_absent() -> Result<(), Box<dyn std::error::Error>> {
        let (repo, source, store) = setup(FakeSource::default()).await?;
        let mut row = mapper::to_cache_row(
            MovieDto { id: Some(9), title: Some("Orphan".to_string()), ..Default::default() },
            Category::Popular,
            0,
        );
        row.category = "top_rated".to_string();
        store.upsert_movies(vec![row]).await?;
        assert!(store.get_movie(9).await?.is_some());

        let emissions: Vec<_> = repo.get_movie(9).collect().await;

        assert_eq!(
            emissions,
            vec![
                FetchResult::Loading(true),
                FetchResult::Error("Error no such movie".to_string()),
                FetchResult::Loading(false)
            ]
        );
        assert_eq!(source.calls(), 0);
        Ok(())
    }
}
