use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(integer(Movie::Id).primary_key())
                    .col(string(Movie::Title))
                    .col(string(Movie::OriginalTitle))
                    .col(string(Movie::OriginalLanguage))
                    .col(text(Movie::Overview))
                    .col(string(Movie::ReleaseDate))
                    .col(string(Movie::PosterPath))
                    .col(string(Movie::BackdropPath))
                    .col(double(Movie::Popularity))
                    .col(double(Movie::VoteAverage))
                    .col(integer(Movie::VoteCount))
                    .col(boolean(Movie::Adult))
                    .col(boolean(Movie::Video))
                    .col(string(Movie::GenreIds))
                    .col(string(Movie::Category))
                    .col(big_integer(Movie::CachedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_category")
                    .table(Movie::Table)
                    .col(Movie::Category)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Title,
    OriginalTitle,
    OriginalLanguage,
    Overview,
    ReleaseDate,
    PosterPath,
    BackdropPath,
    Popularity,
    VoteAverage,
    VoteCount,
    Adult,
    Video,
    GenreIds,
    Category,
    CachedAt,
}
