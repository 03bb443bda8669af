//! Lesson management CLI commands: list, delete, forget.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use gleaner_core::lesson::store::LessonRepository;
use gleaner_types::error::RepositoryError;
use gleaner_types::lesson::LessonEntry;

use crate::state::AppState;

/// List stored lessons, newest first.
///
/// # Examples
///
/// ```bash
/// glean lessons list
/// glean lessons list --room <room-id> --limit 5 --json
/// ```
pub async fn list_lessons(
    state: &AppState,
    room: Option<Uuid>,
    limit: i64,
    json: bool,
) -> Result<()> {
    let limit = limit.max(1);
    let lessons = match room {
        Some(room_id) => state.lesson_repo.get_lessons(&room_id, Some(limit)).await?,
        None => state.lesson_repo.recent_lessons(limit).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&lessons)?);
        return Ok(());
    }

    if lessons.is_empty() {
        println!();
        println!(
            "  {} No lessons yet. Lessons are extracted from evaluated turns.",
            style("i").blue().bold(),
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", lessons_table(&lessons));
    println!();
    println!(
        "  {} lesson{}",
        style(lessons.len()).bold(),
        if lessons.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Delete a single lesson by ID.
pub async fn delete_lesson(state: &AppState, id: Uuid, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete lesson {}?",
                style(short_id(&id)).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    match state.lesson_repo.delete_lesson(&id).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => anyhow::bail!("lesson {id} not found"),
        Err(e) => return Err(e.into()),
    }

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": true, "lesson_id": id.to_string()})
        );
    } else {
        println!(
            "  {} Lesson {} deleted.",
            style("x").red().bold(),
            short_id(&id)
        );
    }

    Ok(())
}

/// Delete every lesson from a room, with confirmation.
pub async fn forget(state: &AppState, room: Uuid, force: bool, json: bool) -> Result<()> {
    let lessons = state.lesson_repo.get_lessons(&room, None).await?;

    if lessons.is_empty() {
        if json {
            println!("{}", serde_json::json!({"deleted": 0, "room": room.to_string()}));
        } else {
            println!(
                "  {} No lessons to delete for room {}.",
                style("i").blue().bold(),
                short_id(&room)
            );
        }
        return Ok(());
    }

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Wipe all {} lessons for room {}? This cannot be undone.",
                style(lessons.len()).bold(),
                style(short_id(&room)).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let count = state.lesson_repo.delete_all_lessons(&room).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": count, "room": room.to_string()}));
    } else {
        println!(
            "  {} Wiped {} lesson{} for room {}.",
            style("x").red().bold(),
            count,
            if count == 1 { "" } else { "s" },
            short_id(&room)
        );
    }

    Ok(())
}

// --- Formatting helpers ---

fn lessons_table(lessons: &[LessonEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Lesson").fg(Color::White),
        Cell::new("Category").fg(Color::White),
        Cell::new("Confidence").fg(Color::White),
        Cell::new("Outcome").fg(Color::White),
        Cell::new("Date").fg(Color::White),
    ]);

    for lesson in lessons {
        table.add_row(vec![
            Cell::new(short_id(&lesson.id)).fg(Color::DarkGrey),
            Cell::new(truncate(&lesson.content, 60)).fg(Color::White),
            Cell::new(&lesson.metadata.category).fg(Color::Cyan),
            Cell::new(format!("{:.2}", lesson.metadata.confidence)).fg(Color::Yellow),
            outcome_cell(&lesson.metadata.outcome),
            Cell::new(lesson.created_at.format("%Y-%m-%d").to_string()).fg(Color::DarkGrey),
        ]);
    }

    table
}

/// Colored cell for an outcome; unknown outcomes are shown as-is.
pub fn outcome_cell(outcome: &str) -> Cell {
    let color = match outcome {
        "success" => Color::Green,
        "failure" => Color::Red,
        "partial" => Color::Yellow,
        _ => Color::White,
    };
    Cell::new(outcome).fg(color)
}

fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Truncate on a character boundary, appending `...` when shortened.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("short", 60), "short");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        let text = "é".repeat(70);
        let out = truncate(&text, 60);
        assert_eq!(out.chars().count(), 60);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_short_id() {
        let id = Uuid::now_v7();
        assert_eq!(short_id(&id), id.to_string()[..8]);
    }
}
