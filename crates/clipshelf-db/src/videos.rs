//! Video repository implementation: the query executor and the
//! record creator.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use clipshelf_core::{
    CreateVideoRequest, Error, ListCriteria, Result, SortOrder, Video, VideoRepository,
};

use crate::escape_like;
use crate::tags::PgTagRepository;

/// PostgreSQL implementation of VideoRepository.
#[derive(Clone)]
pub struct PgVideoRepository {
    pool: Pool<Postgres>,
    tags: PgTagRepository,
}

const SELECT_SHAPED: &str = r#"
    SELECT
        v.id, v.title, v.thumbnail_url, v.duration_seconds, v.views,
        v.created_at_utc, v.updated_at_utc,
        COALESCE(
            (SELECT string_agg(vt.tag_name, ',' ORDER BY vt.position)
             FROM video_tag vt WHERE vt.video_id = v.id),
            ''
        ) as tags
    FROM video v
"#;

impl PgVideoRepository {
    /// Create a new PgVideoRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        let tags = PgTagRepository::new(pool.clone());
        Self { pool, tags }
    }

    fn map_row(row: PgRow) -> Video {
        let tags: String = row.get("tags");
        Video {
            id: row.get("id"),
            title: row.get("title"),
            thumbnail_url: row.get("thumbnail_url"),
            duration_seconds: row.get("duration_seconds"),
            views: row.get("views"),
            created_at_utc: row.get("created_at_utc"),
            updated_at_utc: row.get("updated_at_utc"),
            tags: tags.split(',').filter(|t| !t.is_empty()).map(String::from).collect(),
        }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn list(&self, criteria: ListCriteria) -> Result<Vec<Video>> {
        // Never trust callers to have normalized; the rules are
        // idempotent so this is free for well-behaved input.
        let criteria = criteria.normalized();
        let start = Instant::now();

        let mut query = format!("{} WHERE v.title ILIKE $1", SELECT_SHAPED);
        if !criteria.tags.is_empty() {
            // Union semantics: a video matches when it carries at
            // least one of the requested tags.
            query.push_str(
                " AND EXISTS (SELECT 1 FROM video_tag vt
                   WHERE vt.video_id = v.id AND vt.tag_name = ANY($2))",
            );
        }
        query.push_str(match criteria.order_by {
            SortOrder::Newest => " ORDER BY v.created_at_utc DESC",
            SortOrder::Oldest => " ORDER BY v.created_at_utc ASC",
        });

        let pattern = format!("%{}%", escape_like(&criteria.search_query));
        let mut q = sqlx::query(&query).bind(pattern);
        if !criteria.tags.is_empty() {
            q = q.bind(&criteria.tags);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        let videos: Vec<Video> = rows.into_iter().map(Self::map_row).collect();

        debug!(
            subsystem = "db",
            component = "videos",
            op = "list",
            query = %criteria.search_query,
            tag_count = criteria.tags.len(),
            result_count = videos.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed videos"
        );
        Ok(videos)
    }

    async fn fetch(&self, id: Uuid) -> Result<Video> {
        let query = format!("{} WHERE v.id = $1", SELECT_SHAPED);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::map_row).ok_or(Error::VideoNotFound(id))
    }

    async fn create(&self, req: CreateVideoRequest) -> Result<Video> {
        // The store assigns identity and timestamps; v7 ids keep the
        // primary key time-ordered.
        let video_id = Uuid::now_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO video (id, title, thumbnail_url, duration_seconds, views, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(video_id)
        .bind(&req.title)
        .bind(&req.thumbnail_url)
        .bind(req.duration_seconds)
        .bind(req.views)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        for (position, raw_name) in req.tags.iter().enumerate() {
            self.tags
                .add_to_video_tx(&mut tx, video_id, raw_name, position as i32)
                .await?;
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "videos",
            op = "create",
            video_id = %video_id,
            tag_count = req.tags.len(),
            "Created video"
        );

        self.fetch(video_id).await
    }
}
