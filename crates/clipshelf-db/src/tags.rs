//! Tag repository implementation.
//!
//! Tags are keyed by name and created lazily on first use. All writes
//! go through upsert-by-name (`ON CONFLICT DO NOTHING`): the
//! primary-key constraint on `tag.name` resolves concurrent creation
//! of the same name to a single row.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use clipshelf_core::{normalize_tag, Error, Result, Tag, TagRepository};

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Upsert a tag and associate it with a video inside an existing
    /// transaction. `position` records association insertion order.
    ///
    /// The name is normalized (trimmed, lowercased) here: persistence
    /// is the boundary where tag casing is made canonical. Duplicate
    /// raw inputs collapse via the association's conflict clause.
    pub async fn add_to_video_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        video_id: Uuid,
        raw_name: &str,
        position: i32,
    ) -> Result<()> {
        let name = normalize_tag(raw_name);
        if name.is_empty() {
            return Ok(());
        }

        let now = Utc::now();

        sqlx::query("INSERT INTO tag (name, created_at_utc) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(&name)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO video_tag (video_id, tag_name, position) VALUES ($1, $2, $3)
             ON CONFLICT (video_id, tag_name) DO NOTHING",
        )
        .bind(video_id)
        .bind(&name)
        .bind(position)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, name: &str) -> Result<()> {
        let name = normalize_tag(name);
        if name.is_empty() {
            return Err(Error::Validation({
                let mut errors = clipshelf_core::ValidationErrors::new();
                errors.push("name", "Tag name cannot be empty");
                errors
            }));
        }

        let now = Utc::now();
        sqlx::query("INSERT INTO tag (name, created_at_utc) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(&name)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.name,
                t.created_at_utc,
                COUNT(vt.video_id) as video_count
            FROM tag t
            LEFT JOIN video_tag vt ON t.name = vt.tag_name
            GROUP BY t.name, t.created_at_utc
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows
            .into_iter()
            .map(|row| Tag {
                name: row.get("name"),
                created_at_utc: row.get("created_at_utc"),
                video_count: row.get("video_count"),
            })
            .collect();

        Ok(tags)
    }

    async fn get_for_video(&self, video_id: Uuid) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT tag_name FROM video_tag WHERE video_id = $1 ORDER BY position",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows.into_iter().map(|row| row.get("tag_name")).collect();
        Ok(tags)
    }
}
