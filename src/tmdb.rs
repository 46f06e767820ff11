use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{error::RemoteError, models::Category};

/// Remote movie catalog. Implemented by [`TmdbClient`] and by test fakes.
#[async_trait::async_trait]
pub trait MovieSource: Send + Sync {
    async fn movie_list(&self, category: Category, page: u32) -> Result<MovieListDto, RemoteError>;

    async fn movie_details(&self, id: i32) -> Result<MovieDetailsDto, RemoteError>;

    async fn genres(&self) -> Result<GenreListDto, RemoteError>;
}

pub struct TmdbClient {
    client: wreq::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: wreq::Client, api_key: String, base_url: String, rps: u32) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("Using mock TMDB data - no TMDB_API_KEY provided");
        }

        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        Self { client, api_key, base_url, limiter }
    }

    fn is_mock(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        tracing::debug!(path = %path, "requesting TMDB");

        let resp = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MovieSource for TmdbClient {
    async fn movie_list(&self, category: Category, page: u32) -> Result<MovieListDto, RemoteError> {
        if self.is_mock() {
            return Ok(mock::movie_list(category, page));
        }
        self.get(&format!("movie/{}", category.as_path()), &[("page", page.to_string())]).await
    }

    async fn movie_details(&self, id: i32) -> Result<MovieDetailsDto, RemoteError> {
        if self.is_mock() {
            return mock::movie_details(id).ok_or(RemoteError::Status(404));
        }
        self.get(&format!("movie/{id}"), &[]).await
    }

    async fn genres(&self) -> Result<GenreListDto, RemoteError> {
        if self.is_mock() {
            return Ok(mock::genres());
        }
        self.get("genre/movie/list", &[]).await
    }
}

/// Resolves an image path fragment against the image base URL.
pub fn image_url(base: &str, fragment: &str) -> Option<String> {
    if fragment.is_empty() {
        return None;
    }
    Some(format!("{}/{}", base.trim_end_matches('/'), fragment.trim_start_matches('/')))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieListDto {
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub results: Vec<MovieDto>,
    #[serde(default)]
    pub total_pages: i32,
    #[serde(default)]
    pub total_results: i32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieDto {
    pub id: Option<i32>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub original_language: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i32>,
    pub adult: Option<bool>,
    pub video: Option<bool>,
    pub genre_ids: Option<Vec<i32>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenreListDto {
    #[serde(default)]
    pub genres: Vec<GenreDto>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenreDto {
    pub id: Option<i32>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieDetailsDto {
    pub id: Option<i32>,
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub original_language: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub status: Option<String>,
    pub homepage: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub adult: Option<bool>,
    pub video: Option<bool>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub runtime: Option<i32>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i32>,
    pub genres: Option<Vec<GenreDto>>,
    pub production_companies: Option<Vec<ProductionCompanyDto>>,
    pub production_countries: Option<Vec<ProductionCountryDto>>,
    pub spoken_languages: Option<Vec<SpokenLanguageDto>>,
    pub belongs_to_collection: Option<BelongsToCollectionDto>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductionCompanyDto {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub logo_path: Option<String>,
    pub origin_country: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductionCountryDto {
    pub iso_3166_1: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SpokenLanguageDto {
    pub iso_639_1: Option<String>,
    pub english_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BelongsToCollectionDto {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

mod mock {
    use super::*;

    const TITLES: [&str; 5] =
        ["Fight Club", "Arrival", "Heat", "Spirited Away", "The Thing"];
    const PAGE_SIZE: i32 = 5;

    fn base_id(category: Category) -> i32 {
        match category {
            Category::Popular => 1_000,
            Category::Upcoming => 2_000,
            Category::NowPlaying => 3_000,
        }
    }

    pub(super) fn movie_list(category: Category, page: u32) -> MovieListDto {
        let page = i32::try_from(page.max(1)).unwrap_or(i32::MAX);
        let start = base_id(category) + (page - 1) * PAGE_SIZE;
        let results = (0..PAGE_SIZE)
            .map(|i| {
                let id = start + i;
                let title = TITLES[(id as usize) % TITLES.len()];
                MovieDto {
                    id: Some(id),
                    title: Some(format!("{title} #{id}")),
                    original_title: Some(title.to_string()),
                    original_language: Some("en".to_string()),
                    overview: Some(format!("Mock {category} movie")),
                    release_date: Some("2024-01-01".to_string()),
                    poster_path: Some(format!("/mock-poster-{id}.jpg")),
                    backdrop_path: Some(format!("/mock-backdrop-{id}.jpg")),
                    popularity: Some(f64::from(100 - i)),
                    vote_average: Some(7.5),
                    vote_count: Some(1_000),
                    adult: Some(false),
                    video: Some(false),
                    genre_ids: Some(vec![28, 18]),
                }
            })
            .collect();

        MovieListDto { page, results, total_pages: 10, total_results: 10 * PAGE_SIZE }
    }

    pub(super) fn movie_details(id: i32) -> Option<MovieDetailsDto> {
        if id < 0 {
            return None;
        }
        let title = TITLES[(id as usize) % TITLES.len()];
        Some(MovieDetailsDto {
            id: Some(id),
            title: Some(format!("{title} #{id}")),
            original_title: Some(title.to_string()),
            original_language: Some("en".to_string()),
            overview: Some("Mock movie details".to_string()),
            status: Some("Released".to_string()),
            release_date: Some("2024-01-01".to_string()),
            budget: Some(63_000_000),
            revenue: Some(100_853_753),
            runtime: Some(139),
            genres: Some(vec![GenreDto { id: Some(18), name: Some("Drama".to_string()) }]),
            spoken_languages: Some(vec![SpokenLanguageDto {
                iso_639_1: Some("en".to_string()),
                english_name: Some("English".to_string()),
                name: Some("English".to_string()),
            }]),
            ..Default::default()
        })
    }

    pub(super) fn genres() -> GenreListDto {
        let genres = [(28, "Action"), (12, "Adventure"), (16, "Animation"), (18, "Drama")]
            .into_iter()
            .map(|(id, name)| GenreDto { id: Some(id), name: Some(name.to_string()) })
            .collect();
        GenreListDto { genres }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_url_joins_fragment() {
        assert_eq!(
            image_url("https://image.tmdb.org/t/p/w500/", "/abc.jpg").as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(image_url("https://image.tmdb.org/t/p/w500", ""), None);
    }

    #[test]
    fn list_dto_tolerates_missing_fields() {
        let json = r#"{"page":1,"results":[{"id":550,"title":"Fight Club","genre_ids":[18]},{}]}"#;
        let dto: MovieListDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.results.len(), 2);
        assert_eq!(dto.results[0].id, Some(550));
        assert_eq!(dto.results[1].title, None);
        assert_eq!(dto.total_pages, 0);
    }

    #[test]
    fn mock_pages_do_not_overlap() {
        let first = mock::movie_list(Category::Popular, 1);
        let second = mock::movie_list(Category::Popular, 2);
        let upcoming = mock::movie_list(Category::Upcoming, 1);
        let ids = |dto: &MovieListDto| dto.results.iter().filter_map(|m| m.id).collect::<Vec<_>>();
        assert!(ids(&first).iter().all(|id| !ids(&second).contains(id)));
        assert!(ids(&first).iter().all(|id| !ids(&upcoming).contains(id)));
    }

    #[tokio::test]
    async fn mock_client_serves_without_network() {
        let client = TmdbClient::new(wreq::Client::new(), String::new(), String::new(), 4);
        let list = client.movie_list(Category::NowPlaying, 1).await.unwrap();
        assert_eq!(list.results.len(), 5);
        assert!(client.movie_details(-1).await.is_err());
        assert!(!client.genres().await.unwrap().genres.is_empty());
    }

    /// Answers a single request on a local port with a canned HTTP response.
    async fn serve_once(response: &'static str) -> std::io::Result<String> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok(format!("http://{addr}"))
    }

    fn live_client(base_url: String) -> TmdbClient {
        TmdbClient::new(wreq::Client::new(), "test-key".to_string(), base_url, 4)
    }

    #[tokio::test]
    async fn server_error_is_classed_as_status() -> Result<(), Box<dyn std::error::Error>> {
        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await?;

        let err = live_client(base).genres().await.unwrap_err();
        assert!(matches!(err, RemoteError::Status(500)), "got {err:?}");
        assert_eq!(err.class(), "status");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_classed_as_decode() -> Result<(), Box<dyn std::error::Error>> {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 9\r\nconnection: close\r\n\r\nnot json!",
        )
        .await?;

        let err = live_client(base).movie_list(Category::Popular, 1).await.unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)), "got {err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn refused_connection_is_classed_as_transport() -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let err = live_client(format!("http://{addr}")).movie_details(550).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)), "got {err:?}");
        Ok(())
    }
}
