use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};

use crate::{entities::movie, models::Category};

/// Local movie cache keyed by movie id.
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    async fn upsert_movies(&self, rows: Vec<movie::Model>) -> Result<(), DbErr>;

    async fn get_movie(&self, id: i32) -> Result<Option<movie::Model>, DbErr>;

    async fn get_movies_by_category(&self, category: Category)
    -> Result<Vec<movie::Model>, DbErr>;
}

#[derive(Clone)]
pub struct CacheManager {
    db: DatabaseConnection,
}

impl CacheManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl MovieStore for CacheManager {
    async fn upsert_movies(&self, rows: Vec<movie::Model>) -> Result<(), DbErr> {
        if rows.is_empty() {
            return Ok(());
        }

        let count = rows.len();
        let models = rows.into_iter().map(active_row);

        movie::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(movie::Column::Id)
                    .update_columns([
                        movie::Column::Title,
                        movie::Column::OriginalTitle,
                        movie::Column::OriginalLanguage,
                        movie::Column::Overview,
                        movie::Column::ReleaseDate,
                        movie::Column::PosterPath,
                        movie::Column::BackdropPath,
                        movie::Column::Popularity,
                        movie::Column::VoteAverage,
                        movie::Column::VoteCount,
                        movie::Column::Adult,
                        movie::Column::Video,
                        movie::Column::GenreIds,
                        movie::Column::Category,
                        movie::Column::CachedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        tracing::debug!(rows = count, "upserted movies");
        Ok(())
    }

    async fn get_movie(&self, id: i32) -> Result<Option<movie::Model>, DbErr> {
        movie::Entity::find_by_id(id).one(&self.db).await
    }

    async fn get_movies_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<movie::Model>, DbErr> {
        movie::Entity::find()
            .filter(movie::Column::Category.eq(category.as_path()))
            .all(&self.db)
            .await
    }
}

fn active_row(row: movie::Model) -> movie::ActiveModel {
    movie::ActiveModel {
        id: Set(row.id),
        title: Set(row.title),
        original_title: Set(row.original_title),
        original_language: Set(row.original_language),
        overview: Set(row.overview),
        release_date: Set(row.release_date),
        poster_path: Set(row.poster_path),
        backdrop_path: Set(row.backdrop_path),
        popularity: Set(row.popularity),
        vote_average: Set(row.vote_average),
        vote_count: Set(row.vote_count),
        adult: Set(row.adult),
        video: Set(row.video),
        genre_ids: Set(row.genre_ids),
        category: Set(row.category),
        cached_at: Set(row.cached_at),
    }
}

pub fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
