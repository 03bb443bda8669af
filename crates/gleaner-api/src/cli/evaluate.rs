//! `glean evaluate`: run the extraction pipeline on one host payload.

use std::path::Path;

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use tokio_util::sync::CancellationToken;

use gleaner_core::extraction::trigger::TriggerEvaluator;
use gleaner_types::lesson::{ExtractionResult, ExtractionStage};

use super::payload::read_payload;
use crate::state::AppState;

/// Validate, then handle, one turn. Ctrl+C cancels the in-flight call.
///
/// The model provider is only built once the trigger fires, so a skipped turn
/// needs no API key.
///
/// # Examples
///
/// ```bash
/// glean evaluate --file turn.json
/// echo '{"turn": {...}}' | glean evaluate --json
/// ```
pub async fn evaluate(state: &AppState, file: Option<&Path>, json: bool) -> Result<()> {
    let payload = read_payload(file).await?;

    let result = if TriggerEvaluator::should_extract(&payload.turn.text, &payload.state) {
        let evaluator = state.evaluator()?;
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let result = evaluator
            .handle_cancellable(&payload.turn, &payload.state, &cancel)
            .await;
        watcher.abort();
        result
    } else {
        ExtractionResult::empty(ExtractionStage::Skipped)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result(&result);
    Ok(())
}

fn print_result(result: &ExtractionResult) {
    println!();
    match result.stage {
        ExtractionStage::Skipped => {
            println!(
                "  {} No trigger signal; nothing to extract.",
                style("i").blue().bold()
            );
            println!();
            return;
        }
        ExtractionStage::ModelFailed => {
            println!(
                "  {} Model call failed; no lessons extracted (see log).",
                style("!").yellow().bold()
            );
            println!();
            return;
        }
        ExtractionStage::FailedParse => {
            println!(
                "  {} Model output was not a JSON array; no lessons extracted.",
                style("!").yellow().bold()
            );
            println!();
            return;
        }
        ExtractionStage::Cancelled => {
            println!("  {} Cancelled.", style("x").red().bold());
        }
        ExtractionStage::Done => {}
    }

    if result.is_empty() {
        println!("  {} No lessons worth keeping.", style("i").blue().bold());
        println!();
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Lesson").fg(Color::White),
        Cell::new("Category").fg(Color::White),
        Cell::new("Confidence").fg(Color::White),
        Cell::new("Outcome").fg(Color::White),
    ]);

    for record in &result.records {
        table.add_row(vec![
            Cell::new(&record.text).fg(Color::White),
            Cell::new(&record.category).fg(Color::Cyan),
            Cell::new(format!("{:.2}", record.confidence)).fg(Color::Yellow),
            super::lessons::outcome_cell(&record.outcome),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "  {} lesson{} stored",
        style(result.len()).bold(),
        if result.len() == 1 { "" } else { "s" }
    );
    println!();
}
