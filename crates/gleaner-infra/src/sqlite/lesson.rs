//! SQLite lesson repository implementation.
//!
//! Implements `LessonRepository` from `gleaner-core` using sqlx with split
//! read/write pools. Metadata is stored column-wise.

use chrono::{DateTime, SecondsFormat, Utc};
use gleaner_core::lesson::store::LessonRepository;
use gleaner_types::error::RepositoryError;
use gleaner_types::lesson::{LessonEntry, LessonMetadata};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `LessonRepository`.
#[derive(Clone)]
pub struct SqliteLessonRepository {
    pool: DatabasePool,
}

impl SqliteLessonRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct LessonRow {
    id: String,
    content: String,
    kind: String,
    category: String,
    confidence: f64,
    outcome: String,
    extracted_at: String,
    task_id: Option<String>,
    room_id: String,
    entity_id: String,
    created_at: String,
}

impl LessonRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            kind: row.try_get("kind")?,
            category: row.try_get("category")?,
            confidence: row.try_get("confidence")?,
            outcome: row.try_get("outcome")?,
            extracted_at: row.try_get("extracted_at")?,
            task_id: row.try_get("task_id")?,
            room_id: row.try_get("room_id")?,
            entity_id: row.try_get("entity_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_entry(self) -> Result<LessonEntry, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid lesson id: {e}")))?;
        let room_id = Uuid::parse_str(&self.room_id)
            .map_err(|e| RepositoryError::Query(format!("invalid room_id: {e}")))?;
        let entity_id = Uuid::parse_str(&self.entity_id)
            .map_err(|e| RepositoryError::Query(format!("invalid entity_id: {e}")))?;

        Ok(LessonEntry {
            id,
            content: self.content,
            metadata: LessonMetadata {
                kind: self.kind,
                category: self.category,
                confidence: self.confidence,
                outcome: self.outcome,
                extracted_at: parse_datetime(&self.extracted_at)?,
                task_id: self.task_id,
            },
            room_id,
            entity_id,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so that string order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn rows_to_entries(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<LessonEntry>, RepositoryError> {
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let lesson_row =
            LessonRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        entries.push(lesson_row.into_entry()?);
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// LessonRepository implementation
// ---------------------------------------------------------------------------

impl LessonRepository for SqliteLessonRepository {
    async fn save_lesson(&self, entry: &LessonEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO lessons (id, content, kind, category, confidence, outcome, extracted_at, task_id, room_id, entity_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.content)
        .bind(&entry.metadata.kind)
        .bind(&entry.metadata.category)
        .bind(entry.metadata.confidence)
        .bind(&entry.metadata.outcome)
        .bind(format_datetime(&entry.metadata.extracted_at))
        .bind(entry.metadata.task_id.as_deref())
        .bind(entry.room_id.to_string())
        .bind(entry.entity_id.to_string())
        .bind(format_datetime(&entry.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("lesson {} already exists", entry.id))
            }
            other => RepositoryError::Query(other.to_string()),
        })?;

        Ok(())
    }

    async fn get_lessons(
        &self,
        room_id: &Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<LessonEntry>, RepositoryError> {
        // A negative LIMIT means no limit in SQLite.
        let rows = sqlx::query(
            "SELECT * FROM lessons WHERE room_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(room_id.to_string())
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_entries(&rows)
    }

    async fn recent_lessons(&self, limit: i64) -> Result<Vec<LessonEntry>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM lessons ORDER BY created_at DESC, id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_entries(&rows)
    }

    async fn delete_lesson(&self, lesson_id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = ?")
            .bind(lesson_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_all_lessons(&self, room_id: &Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM lessons WHERE room_id = ?")
            .bind(room_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gleaner_types::lesson::CandidateRecord;
    use gleaner_types::turn::Turn;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let url = super::super::pool::database_url(dir.path());
        // Keep the directory alive for the test's duration.
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_entry(turn: &Turn, text: &str, at: DateTime<Utc>) -> LessonEntry {
        let record = CandidateRecord {
            text: text.to_string(),
            category: "error-handling".to_string(),
            confidence: 0.8,
            outcome: "failure".to_string(),
            task_id: Some("t-7".to_string()),
        };
        LessonEntry::from_candidate(&record, turn, at)
    }

    #[tokio::test]
    async fn test_save_and_get_lessons() {
        let repo = SqliteLessonRepository::new(test_pool().await);
        let turn = Turn::new("the build failed", Uuid::now_v7(), Uuid::now_v7());
        let entry = make_entry(&turn, "Run the linter before pushing", Utc::now());

        repo.save_lesson(&entry).await.unwrap();

        let lessons = repo.get_lessons(&turn.room_id, None).await.unwrap();
        assert_eq!(lessons.len(), 1);
        let stored = &lessons[0];
        assert_eq!(stored.id, entry.id);
        assert_eq!(stored.content, "Run the linter before pushing");
        assert_eq!(stored.metadata.kind, "lesson");
        assert_eq!(stored.metadata.category, "error-handling");
        assert!((stored.metadata.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(stored.metadata.outcome, "failure");
        assert_eq!(stored.metadata.task_id.as_deref(), Some("t-7"));
        assert_eq!(stored.entity_id, turn.entity_id);
    }

    #[tokio::test]
    async fn test_get_lessons_newest_first_with_limit() {
        let repo = SqliteLessonRepository::new(test_pool().await);
        let turn = Turn::new("done", Uuid::now_v7(), Uuid::now_v7());
        let now = Utc::now();

        for (i, text) in ["oldest", "middle", "newest"].iter().enumerate() {
            let entry = make_entry(&turn, text, now + Duration::seconds(i as i64));
            repo.save_lesson(&entry).await.unwrap();
        }

        let all = repo.get_lessons(&turn.room_id, None).await.unwrap();
        let texts: Vec<_> = all.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(texts, vec!["newest", "middle", "oldest"]);

        let limited = repo.get_lessons(&turn.room_id, Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].content, "newest");
    }

    #[tokio::test]
    async fn test_lessons_are_scoped_by_room() {
        let repo = SqliteLessonRepository::new(test_pool().await);
        let room_a = Turn::new("done", Uuid::now_v7(), Uuid::now_v7());
        let room_b = Turn::new("done", Uuid::now_v7(), Uuid::now_v7());

        repo.save_lesson(&make_entry(&room_a, "a", Utc::now())).await.unwrap();
        repo.save_lesson(&make_entry(&room_b, "b", Utc::now())).await.unwrap();

        assert_eq!(repo.get_lessons(&room_a.room_id, None).await.unwrap().len(), 1);
        assert_eq!(repo.recent_lessons(10).await.unwrap().len(), 2);
        assert_eq!(repo.recent_lessons(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let repo = SqliteLessonRepository::new(test_pool().await);
        let turn = Turn::new("done", Uuid::now_v7(), Uuid::now_v7());
        let entry = make_entry(&turn, "once", Utc::now());

        repo.save_lesson(&entry).await.unwrap();
        let err = repo.save_lesson(&entry).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_lesson() {
        let repo = SqliteLessonRepository::new(test_pool().await);
        let turn = Turn::new("done", Uuid::now_v7(), Uuid::now_v7());
        let entry = make_entry(&turn, "short-lived", Utc::now());
        repo.save_lesson(&entry).await.unwrap();

        repo.delete_lesson(&entry.id).await.unwrap();
        assert!(repo.get_lessons(&turn.room_id, None).await.unwrap().is_empty());

        let err = repo.delete_lesson(&entry.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_all_lessons_for_room() {
        let repo = SqliteLessonRepository::new(test_pool().await);
        let turn = Turn::new("done", Uuid::now_v7(), Uuid::now_v7());
        let other = Turn::new("done", Uuid::now_v7(), Uuid::now_v7());

        repo.save_lesson(&make_entry(&turn, "one", Utc::now())).await.unwrap();
        repo.save_lesson(&make_entry(&turn, "two", Utc::now())).await.unwrap();
        repo.save_lesson(&make_entry(&other, "keep", Utc::now())).await.unwrap();

        let deleted = repo.delete_all_lessons(&turn.room_id).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.recent_lessons(10).await.unwrap().len(), 1);
    }
}
