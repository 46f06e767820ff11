use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel genre list substituted when stored genre ids can't be parsed.
pub const GENRE_SENTINEL: [i32; 2] = [-1, -2];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Popular,
    Upcoming,
    NowPlaying,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Popular, Category::Upcoming, Category::NowPlaying];

    /// Path segment used by the remote list endpoint and stored in the cache.
    pub fn as_path(self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::Upcoming => "upcoming",
            Category::NowPlaying => "now_playing",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "popular" => Some(Category::Popular),
            "upcoming" => Some(Category::Upcoming),
            "now_playing" => Some(Category::NowPlaying),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub original_title: String,
    pub original_language: String,
    pub overview: String,
    pub release_date: String,
    pub poster_path: String,
    pub backdrop_path: String,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i32,
    pub adult: bool,
    pub video: bool,
    pub genre_ids: Vec<i32>,
    pub category: Category,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductionCompany {
    pub id: i32,
    pub name: String,
    pub logo_path: String,
    pub origin_country: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpokenLanguage {
    pub iso_639_1: String,
    pub english_name: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BelongsToCollection {
    pub id: i32,
    pub name: String,
    pub poster_path: String,
    pub backdrop_path: String,
}

/// Request-scoped detail projection. Never cached.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieDetails {
    pub id: i32,
    pub imdb_id: String,
    pub title: String,
    pub original_title: String,
    pub original_language: String,
    pub overview: String,
    pub tagline: String,
    pub status: String,
    pub homepage: String,
    pub release_date: String,
    pub poster_path: String,
    pub backdrop_path: String,
    pub adult: bool,
    pub video: bool,
    pub budget: i64,
    pub revenue: i64,
    pub runtime: i32,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i32,
    pub genres: Vec<Genre>,
    pub production_companies: Vec<ProductionCompany>,
    pub production_countries: Vec<ProductionCountry>,
    pub spoken_languages: Vec<SpokenLanguage>,
    pub belongs_to_collection: BelongsToCollection,
}

/// One emission of a fetch pipeline invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum FetchResult<T> {
    Loading(bool),
    Success(T),
    Error(String),
}
