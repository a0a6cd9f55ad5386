//! Dispatcher persistence: the `article`/`story` touch-points shared with
//! the scraper's own store, plus the `tag`/`story_tag`/`rank_signals`/
//! `embedding_model`/`summary`/`embedding` tables that only the dispatcher's
//! task handlers need (grounded on `worker-py/app/db.py` and
//! `summarizer-py/app/db.py`).

use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use pipeline_core::normalize::content_hash;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0}")]
    NotFound(&'static str),
}

pub async fn get_story_url_title(
    pool: &PgPool,
    story_id: &str,
) -> Result<(String, Option<String>), StoreError> {
    let row = sqlx::query("SELECT url, title FROM story WHERE id = $1")
        .bind(story_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::NotFound("story_not_found"))?;
    Ok((row.get("url"), row.get("title")))
}

pub async fn link_story_article(
    pool: &PgPool,
    story_id: &str,
    article_id: Uuid,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE story SET article_id = $2 WHERE id = $1")
        .bind(story_id)
        .bind(article_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Same `content_hash` invariant the scraper's store uses (spec.md §3.1),
/// so a row written here dedups correctly against one the scraper's own
/// fetch→extract→persist pipeline produced for the same (language, domain,
/// text) — the two call sites share one `article.content_hash` column and
/// must agree on the hash function, unlike the plain `sha1(text)` the
/// dispatcher's original source computed on its own.
pub async fn upsert_article_from_text(
    pool: &PgPool,
    text: &str,
    language: &str,
) -> Result<Uuid, StoreError> {
    let norm: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let word_count = norm.split_whitespace().count() as i32;
    let hash = content_hash(language, "", &norm);

    let inserted = sqlx::query(
        r#"
        INSERT INTO article(language, html, text, word_count, content_hash)
        VALUES ($1, NULL, $2, $3, $4)
        ON CONFLICT (content_hash) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(language)
    .bind(&norm)
    .bind(word_count)
    .bind(&hash)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        return Ok(row.get("id"));
    }

    let existing = sqlx::query("SELECT id FROM article WHERE content_hash = $1")
        .bind(&hash)
        .fetch_one(pool)
        .await?;
    Ok(existing.get("id"))
}

pub async fn get_or_create_tag(
    pool: &PgPool,
    slug: &str,
    name: Option<&str>,
) -> Result<Uuid, StoreError> {
    if let Some(row) = sqlx::query("SELECT id FROM tag WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?
    {
        return Ok(row.get("id"));
    }

    let display_name = name.map(str::to_string).unwrap_or_else(|| title_case(slug));
    let row = sqlx::query(
        "INSERT INTO tag(slug, name, kind) VALUES ($1, $2, 'tech') RETURNING id",
    )
    .bind(slug)
    .bind(&display_name)
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

fn title_case(slug: &str) -> String {
    slug.split(['-', '_'])
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn attach_tag_to_story(
    pool: &PgPool,
    story_id: &str,
    tag_id: Uuid,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO story_tag(story_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(story_id)
    .bind(tag_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// `INSERT ... SELECT ... ON CONFLICT (story_id) DO UPDATE`, delegating the
/// hot-score formula itself to the `compute_hot_score` SQL function (out of
/// scope to author here — spec.md §1).
pub async fn refresh_recent_hot_scores(pool: &PgPool, hours: i64) -> Result<u64, StoreError> {
    let rows = sqlx::query(
        r#"
        INSERT INTO rank_signals(story_id, hot_score, decay_ts, click_count, dwell_ms_avg, updated_at)
        SELECT s.id,
               compute_hot_score(COALESCE(s.points, 0), COALESCE(s.comments_count, 0),
                   EXTRACT(EPOCH FROM (now() - s.created_at)) / 3600.0),
               now(),
               rs.click_count,
               rs.dwell_ms_avg,
               now()
        FROM story s
        LEFT JOIN rank_signals rs ON rs.story_id = s.id
        WHERE s.created_at >= now() - (make_interval(hours => $1::int))
        ON CONFLICT (story_id) DO UPDATE
          SET hot_score = EXCLUDED.hot_score, decay_ts = EXCLUDED.decay_ts, updated_at = now()
        RETURNING story_id
        "#,
    )
    .bind(hours)
    .fetch_all(pool)
    .await?;
    Ok(rows.len() as u64)
}

pub async fn fetch_article_text(
    pool: &PgPool,
    article_id: &str,
) -> Result<(String, String), StoreError> {
    let row = sqlx::query("SELECT text, language FROM article WHERE id = $1")
        .bind(article_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::NotFound("article_not_found"))?;
    Ok((row.get("text"), row.get("language")))
}

pub async fn get_embedding_dims(pool: &PgPool, model_key: &str) -> Result<i32, StoreError> {
    let row = sqlx::query("SELECT dimensions FROM embedding_model WHERE key = $1")
        .bind(model_key)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::NotFound("embedding_model_not_found"))?;
    Ok(row.get("dimensions"))
}

/// No unique constraint on `summary`: idempotency is emulated with
/// delete-then-insert, matching `summarizer-py/app/db.py::upsert_summary`.
pub async fn upsert_summary(
    pool: &PgPool,
    article_id: &str,
    model: &str,
    lang: &str,
    summary: &str,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM summary WHERE article_id = $1 AND model = $2 AND lang = $3")
        .bind(article_id)
        .bind(model)
        .bind(lang)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO summary(article_id, model, lang, summary) VALUES ($1, $2, $3, $4)")
        .bind(article_id)
        .bind(model)
        .bind(lang)
        .bind(summary)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// `UNIQUE (article_id, model_key)` backs this one directly.
pub async fn upsert_embedding(
    pool: &PgPool,
    article_id: &str,
    model_key: &str,
    vector: &[f64],
) -> Result<(), StoreError> {
    let vector_json = serde_json::to_value(vector).unwrap_or(serde_json::Value::Null);
    sqlx::query(
        r#"
        INSERT INTO embedding(article_id, model_key, vector)
        VALUES ($1, $2, $3)
        ON CONFLICT (article_id, model_key)
        DO UPDATE SET vector = EXCLUDED.vector, created_at = now()
        "#,
    )
    .bind(article_id)
    .bind(model_key)
    .bind(vector_json)
    .execute(pool)
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
