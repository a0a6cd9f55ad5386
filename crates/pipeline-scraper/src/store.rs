//! Transactional `article` upsert + `story` link (spec.md §4.6).

use sqlx::{PgPool, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewArticle<'a> {
    pub language: &'a str,
    pub html: Option<&'a str>,
    pub text: &'a str,
    pub word_count: i32,
    pub content_hash: &'a str,
}

/// Insert-or-read-existing on `content_hash` uniqueness, then link the
/// story to the resulting article id, all inside a single transaction.
/// Returns the article id (new or pre-existing).
pub async fn upsert_article_and_link(
    pool: &PgPool,
    story_id: &str,
    article: NewArticle<'_>,
    domain: Option<&str>,
    author: Option<&str>,
) -> Result<uuid::Uuid, StoreError> {
    let mut tx = pool.begin().await?;

    let article_id = upsert_article(&mut tx, &article).await?;
    link_story(&mut tx, story_id, article_id, domain, author).await?;

    tx.commit().await?;
    Ok(article_id)
}

async fn upsert_article(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    article: &NewArticle<'_>,
) -> Result<uuid::Uuid, StoreError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO article (language, html, text, word_count, content_hash)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (content_hash) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(article.language)
    .bind(article.html)
    .bind(article.text)
    .bind(article.word_count)
    .bind(article.content_hash)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(row) = inserted {
        return Ok(row.get("id"));
    }

    // Conflict: the row already exists, so DO NOTHING returned no row. Read
    // back the existing id instead.
    let existing = sqlx::query("SELECT id FROM article WHERE content_hash = $1")
        .bind(article.content_hash)
        .fetch_one(&mut **tx)
        .await?;
    Ok(existing.get("id"))
}

/// Sets `story.article_id` and fills `domain`/`author` only when currently
/// null (`COALESCE` semantics) — re-linking an already-linked story is a
/// no-op on the success path.
async fn link_story(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    story_id: &str,
    article_id: uuid::Uuid,
    domain: Option<&str>,
    author: Option<&str>,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE story
        SET article_id = $2,
            domain = COALESCE(domain, $3),
            author = COALESCE(author, $4)
        WHERE id = $1
        "#,
    )
    .bind(story_id)
    .bind(article_id)
    .bind(domain)
    .bind(author)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn connect_pool(dsn: &str) -> Result<PgPool, StoreError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        .connect(dsn)
        .await?;
    Ok(pool)
}
