//! Harvested video cache and statistics.

use crate::error::DatabaseError;
use crate::types::{CacheStats, ScoredVideo};
use crate::{Error, Result};
use chrono::Utc;

use super::{CachedVideo, CachedVideoRow, ChannelAggregate, Database};

impl Database {
    /// Save a batch of scored videos into the local cache.
    ///
    /// Each row is an idempotent upsert keyed on the item identifier.
    /// Individual row failures are logged and skipped; the call returns the
    /// number of rows actually written.
    pub async fn save_videos_batch(&self, videos: &[ScoredVideo]) -> Result<u64> {
        let mut saved = 0u64;

        for video in videos {
            match self.save_video(video).await {
                Ok(()) => saved += 1,
                Err(e) => {
                    tracing::warn!(
                        video_id = %video.details.video_id,
                        error = %e,
                        "Failed to cache video, skipping"
                    );
                }
            }
        }

        tracing::info!(saved, total = videos.len(), "Saved videos to cache");
        Ok(saved)
    }

    async fn save_video(&self, video: &ScoredVideo) -> Result<()> {
        let details = &video.details;
        let tags = serde_json::to_string(&details.tags)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO videos (
                video_id, title, description, channel_id, channel_title,
                published_at, view_count, like_count, comment_count, duration,
                tags, category, detected_language, relevance_score,
                quality_score, engagement_score, spam_score, composite_score,
                is_relevant, search_query, video_url, extracted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&details.video_id)
        .bind(&details.title)
        .bind(&details.description)
        .bind(&details.channel_id)
        .bind(&details.channel_title)
        .bind(details.published_at.map(|p| p.to_rfc3339()))
        .bind(details.view_count as i64)
        .bind(details.like_count as i64)
        .bind(details.comment_count as i64)
        .bind(&details.duration)
        .bind(tags)
        .bind(&video.analysis.content_category)
        .bind(&video.analysis.detected_language)
        .bind(video.relevance_score)
        .bind(video.quality_score)
        .bind(video.engagement_score)
        .bind(video.spam_score)
        .bind(video.composite_score)
        .bind(video.is_relevant as i64)
        .bind(&video.search_query)
        .bind(&video.video_url)
        .bind(video.extracted_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to save video: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Search the cache by free-text filter over title, description and
    /// channel name.
    pub async fn search_videos(
        &self,
        query: &str,
        relevant_only: bool,
        limit: u32,
    ) -> Result<Vec<CachedVideo>> {
        let pattern = format!("%{}%", query);
        let relevance_floor = if relevant_only { 1 } else { 0 };

        let rows = sqlx::query_as::<_, CachedVideoRow>(
            r#"
            SELECT
                video_id, title, description, channel_id, channel_title,
                published_at, view_count, like_count, comment_count, duration,
                tags, category, detected_language, relevance_score,
                quality_score, engagement_score, spam_score, composite_score,
                is_relevant, search_query, video_url, extracted_at
            FROM videos
            WHERE (title LIKE ? OR description LIKE ? OR channel_title LIKE ?)
              AND is_relevant >= ?
            ORDER BY extracted_at DESC
            LIMIT ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(relevance_floor)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to search videos: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(CachedVideo::from).collect())
    }

    /// Channels ranked by total views, for the analytics surface.
    pub async fn top_channels(
        &self,
        relevant_only: bool,
        limit: u32,
    ) -> Result<Vec<ChannelAggregate>> {
        let relevance_floor = if relevant_only { 1 } else { 0 };

        let rows = sqlx::query_as::<_, ChannelAggregate>(
            r#"
            SELECT
                channel_id,
                channel_title,
                COUNT(*) AS video_count,
                COALESCE(SUM(view_count), 0) AS total_views,
                COALESCE(AVG(composite_score), 0.0) AS avg_composite_score
            FROM videos
            WHERE is_relevant >= ?
            GROUP BY channel_id, channel_title
            HAVING video_count >= 2
            ORDER BY total_views DESC, avg_composite_score DESC
            LIMIT ?
            "#,
        )
        .bind(relevance_floor)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to aggregate channels: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Aggregate statistics over the cache, for the status surface.
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        let (total_videos, relevant_videos, unique_channels, avg_composite_score): (
            i64,
            i64,
            i64,
            f64,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(is_relevant), 0),
                COUNT(DISTINCT channel_id),
                COALESCE(AVG(composite_score), 0.0)
            FROM videos
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to compute cache stats: {}",
                e
            )))
        })?;

        let cutoff = Utc::now().timestamp() - 24 * 60 * 60;
        let recent_videos_24h: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE extracted_at > ?")
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count recent videos: {}",
                        e
                    )))
                })?;

        let seen_records = self.seen_count().await?;

        Ok(CacheStats {
            total_videos: total_videos.max(0) as u64,
            relevant_videos: relevant_videos.max(0) as u64,
            unique_channels: unique_channels.max(0) as u64,
            seen_records,
            recent_videos_24h: recent_videos_24h.max(0) as u64,
            avg_composite_score: (avg_composite_score * 1000.0).round() / 1000.0,
        })
    }
}
