//! Text rendering for router output

use colored::*;
use qr_agent::{ExecutionPlan, ExecutionResult, RouterStats};
use qr_core::{ConversationTurn, Role};

/// Answer followed by a dimmed metadata footer
pub fn format_result(result: &ExecutionResult) -> String {
    let mut lines = Vec::new();

    if result.is_degraded() {
        lines.push(format!("{} {}", "⚠️".yellow(), result.answer_text.yellow()));
    } else {
        lines.push(result.answer_text.clone());
    }

    if !result.tags.is_empty() {
        lines.push(format!("{} {}", "Tags:".bold(), result.tags.join(", ")));
    }
    if !result.sources.is_empty() {
        lines.push(format!("{} {}", "Sources:".bold(), result.sources.join(", ")));
    }

    let calls = match result.model_calls_made {
        1 => "1 model call".to_string(),
        n => format!("{} model calls", n),
    };
    let mut footer = format!(
        "[{} · {} · {} ms]",
        result.intent,
        calls,
        result.elapsed.as_millis()
    );
    if let Some(failure) = result.failure {
        footer.push_str(&format!(" [{:?}]", failure));
    }
    if result.retrieval_empty {
        footer.push_str(" [no matching documents]");
    }

    lines.push(String::new());
    lines.push(footer.dimmed().to_string());
    lines.join("\n")
}

/// Plan explanation plus capability flags
pub fn format_plan(plan: &ExecutionPlan) -> String {
    let flag = |on: bool| if on { "yes" } else { "no" };
    let cost = plan.cost();

    format!(
        "{}\n{} retrieval: {}, generation: {}, vision: {}\n{} {:.0} MB, {:.1} compute units",
        plan.explain(),
        "Needs:".bold(),
        flag(plan.needs_retrieval()),
        flag(plan.needs_generation()),
        flag(plan.needs_vision()),
        "Resources:".bold(),
        cost.memory_mb,
        cost.compute_units
    )
}

pub fn format_stats(stats: &RouterStats) -> String {
    let chunks = stats
        .indexed_chunks
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unavailable".to_string());

    let rows = [
        ("Active conversations", stats.active_conversations.to_string()),
        ("Indexed chunks", chunks),
        ("Retrieval breadth (k)", stats.retrieval_k.to_string()),
        ("History capacity", format!("{} turns", stats.history_capacity)),
        ("Generation model", stats.services.generation.clone()),
        ("Vision model", stats.services.vision.clone()),
        ("Embedding model", stats.services.embedding.clone()),
    ];

    rows.iter()
        .map(|(label, value)| format!("{} {}", format!("{:<22}", format!("{}:", label)).bold(), value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_history(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return "No conversation yet.".dimmed().to_string();
    }

    turns
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "you".cyan().bold(),
                Role::Assistant => "bot".green().bold(),
            };
            format!(
                "{} {}: {}",
                turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
                role,
                turn.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
