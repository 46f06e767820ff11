use sea_orm::entity::prelude::*;

/// Cache-format movie row. Keyed by movie id alone, so the latest upsert
/// wins the `category` column.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movie")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub genre_ids: String,
    pub category: String,
    pub cached_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
