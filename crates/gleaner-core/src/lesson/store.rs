//! LessonRepository trait definition.
//!
//! Provides CRUD operations for extracted lessons. Follows the RPITIT
//! pattern used by the model gateway trait.

use gleaner_types::error::RepositoryError;
use gleaner_types::lesson::LessonEntry;
use uuid::Uuid;

/// Repository trait for lesson persistence.
///
/// Implementations live in gleaner-infra (e.g., `SqliteLessonRepository`).
pub trait LessonRepository: Send + Sync {
    /// Save a new lesson. Each call is an independent write.
    fn save_lesson(
        &self,
        entry: &LessonEntry,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get lessons for a room, newest first.
    fn get_lessons(
        &self,
        room_id: &Uuid,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<LessonEntry>, RepositoryError>> + Send;

    /// Get the most recent lessons across all rooms, newest first.
    fn recent_lessons(
        &self,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<LessonEntry>, RepositoryError>> + Send;

    /// Delete a single lesson by ID.
    fn delete_lesson(
        &self,
        lesson_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete all lessons for a room. Returns the count of deleted entries.
    fn delete_all_lessons(
        &self,
        room_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
