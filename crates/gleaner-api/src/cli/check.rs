//! `glean check`: show which trigger signals fire, without a model call.

use std::path::Path;

use anyhow::Result;
use console::style;

use gleaner_core::extraction::trigger::{TriggerEvaluator, TriggerSignal};

use super::payload::read_payload;

pub async fn check(file: Option<&Path>, json: bool) -> Result<()> {
    let payload = read_payload(file).await?;
    let signals = TriggerEvaluator::signals(&payload.turn.text, &payload.state);

    if json {
        let names: Vec<String> = signals.iter().map(ToString::to_string).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "turn_id": payload.turn.id,
                "should_extract": !signals.is_empty(),
                "signals": names,
            }))?
        );
        return Ok(());
    }

    println!();
    if signals.is_empty() {
        println!(
            "  {} No trigger signal; extraction would be skipped.",
            style("i").blue().bold()
        );
    } else {
        println!("  {} Extraction would run.", style("*").green().bold());
    }
    println!();

    let check_mark = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };
    for (signal, label) in [
        (TriggerSignal::TaskResult, "task result in session"),
        (TriggerSignal::Feedback, "feedback word in turn"),
        (TriggerSignal::CompletionKeyword, "completion keyword in turn"),
    ] {
        println!("  {} {label}", check_mark(signals.contains(&signal)));
    }
    println!();

    Ok(())
}
