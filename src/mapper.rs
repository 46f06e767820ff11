//! Conversions between wire records, cache rows and domain records.
//!
//! Every function here is total: absent fields take fixed defaults (`""`,
//! `false`, `0`, id `-1`) and unparseable genre strings become
//! [`GENRE_SENTINEL`].

use crate::{
    entities::movie,
    models::{
        BelongsToCollection, Category, GENRE_SENTINEL, Genre, Movie, MovieDetails,
        ProductionCompany, ProductionCountry, SpokenLanguage,
    },
    tmdb::{
        BelongsToCollectionDto, GenreDto, MovieDetailsDto, MovieDto, ProductionCompanyDto,
        ProductionCountryDto, SpokenLanguageDto,
    },
};

pub fn encode_genre_ids(ids: &[i32]) -> String {
    ids.iter().map(i32::to_string).collect::<Vec<_>>().join(",")
}

pub fn decode_genre_ids(stored: &str) -> Vec<i32> {
    stored
        .split(',')
        .map(str::parse::<i32>)
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|_| GENRE_SENTINEL.to_vec())
}

pub fn to_cache_row(dto: MovieDto, category: Category, cached_at: i64) -> movie::Model {
    let genre_ids = match dto.genre_ids {
        Some(ids) => encode_genre_ids(&ids),
        None => encode_genre_ids(&GENRE_SENTINEL),
    };

    movie::Model {
        id: dto.id.unwrap_or(-1),
        title: dto.title.unwrap_or_default(),
        original_title: dto.original_title.unwrap_or_default(),
        original_language: dto.original_language.unwrap_or_default(),
        overview: dto.overview.unwrap_or_default(),
        release_date: dto.release_date.unwrap_or_default(),
        poster_path: dto.poster_path.unwrap_or_default(),
        backdrop_path: dto.backdrop_path.unwrap_or_default(),
        popularity: dto.popularity.unwrap_or(0.0),
        vote_average: dto.vote_average.unwrap_or(0.0),
        vote_count: dto.vote_count.unwrap_or(0),
        adult: dto.adult.unwrap_or(false),
        video: dto.video.unwrap_or(false),
        genre_ids,
        category: category.as_path().to_string(),
        cached_at,
    }
}

/// The domain record takes the caller's category, not the stored one.
pub fn to_movie(row: movie::Model, category: Category) -> Movie {
    Movie {
        genre_ids: decode_genre_ids(&row.genre_ids),
        id: row.id,
        title: row.title,
        original_title: row.original_title,
        original_language: row.original_language,
        overview: row.overview,
        release_date: row.release_date,
        poster_path: row.poster_path,
        backdrop_path: row.backdrop_path,
        popularity: row.popularity,
        vote_average: row.vote_average,
        vote_count: row.vote_count,
        adult: row.adult,
        video: row.video,
        category,
    }
}

pub fn to_genre(dto: GenreDto) -> Genre {
    Genre { id: dto.id.unwrap_or(-1), name: dto.name.unwrap_or_default() }
}

pub fn to_movie_details(dto: MovieDetailsDto) -> MovieDetails {
    MovieDetails {
        id: dto.id.unwrap_or(-1),
        imdb_id: dto.imdb_id.unwrap_or_default(),
        title: dto.title.unwrap_or_default(),
        original_title: dto.original_title.unwrap_or_default(),
        original_language: dto.original_language.unwrap_or_default(),
        overview: dto.overview.unwrap_or_default(),
        tagline: dto.tagline.unwrap_or_default(),
        status: dto.status.unwrap_or_default(),
        homepage: dto.homepage.unwrap_or_default(),
        release_date: dto.release_date.unwrap_or_default(),
        poster_path: dto.poster_path.unwrap_or_default(),
        backdrop_path: dto.backdrop_path.unwrap_or_default(),
        adult: dto.adult.unwrap_or(false),
        video: dto.video.unwrap_or(false),
        budget: dto.budget.unwrap_or(0),
        revenue: dto.revenue.unwrap_or(0),
        runtime: dto.runtime.unwrap_or(0),
        popularity: dto.popularity.unwrap_or(0.0),
        vote_average: dto.vote_average.unwrap_or(0.0),
        vote_count: dto.vote_count.unwrap_or(0),
        genres: dto.genres.unwrap_or_default().into_iter().map(to_genre).collect(),
        production_companies: dto
            .production_companies
            .unwrap_or_default()
            .into_iter()
            .map(to_production_company)
            .collect(),
        production_countries: dto
            .production_countries
            .unwrap_or_default()
            .into_iter()
            .map(to_production_country)
            .collect(),
        spoken_languages: dto
            .spoken_languages
            .unwrap_or_default()
            .into_iter()
            .map(to_spoken_language)
            .collect(),
        belongs_to_collection: to_collection(dto.belongs_to_collection.unwrap_or_default()),
    }
}

fn to_production_company(dto: ProductionCompanyDto) -> ProductionCompany {
    ProductionCompany {
        id: dto.id.unwrap_or(-1),
        name: dto.name.unwrap_or_default(),
        logo_path: dto.logo_path.unwrap_or_default(),
        origin_country: dto.origin_country.unwrap_or_default(),
    }
}

fn to_production_country(dto: ProductionCountryDto) -> ProductionCountry {
    ProductionCountry {
        iso_3166_1: dto.iso_3166_1.unwrap_or_default(),
        name: dto.name.unwrap_or_default(),
    }
}

fn to_spoken_language(dto: SpokenLanguageDto) -> SpokenLanguage {
    SpokenLanguage {
        iso_639_1: dto.iso_639_1.unwrap_or_default(),
        english_name: dto.english_name.unwrap_or_default(),
        name: dto.name.unwrap_or_default(),
    }
}

fn to_collection(dto: BelongsToCollectionDto) -> BelongsToCollection {
    BelongsToCollection {
        id: dto.id.unwrap_or(-1),
        name: dto.name.unwrap_or_default(),
        poster_path: dto.poster_path.unwrap_or_default(),
        backdrop_path: dto.backdrop_path.unwrap_or_default(),
    }
}
