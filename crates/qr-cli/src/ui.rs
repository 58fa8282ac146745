//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use qr_core::Result;
use std::io::{self, IsTerminal, Write};

const PROMPT: &str = "qr>";

/// Display startup banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(40);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title = "QRouter - Query Router";
    let title_line = format!(
        "│  {}{}│",
        title.blue().bold(),
        " ".repeat(banner_width.saturating_sub(title.chars().count() + 4))
    );
    println!("{}", title_line);

    println!("{}", empty_line.blue());

    let feature_lines = [
        "Routes each question to the cheapest path:",
        "",
        "• canned replies for greetings",
        "• local arithmetic for calculations",
        "• knowledge base search + generation",
        "• image captioning (/image <path>)",
        "",
        concat!("v", env!("CARGO_PKG_VERSION"), " • Powered by Ollama"),
    ];

    for line in feature_lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
            continue;
        }

        let padding = " ".repeat(banner_width.saturating_sub(line.chars().count() + 4));
        let content = if line.starts_with('v') {
            format!("│  {}{}│", line.dimmed(), padding)
        } else {
            format!("│  {}{}│", line, padding)
        };
        println!("{}", content.blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "💡 Tip: ask anything, or type 'help' for commands".dimmed()
    );
    println!();
}

fn redraw(input: &str) -> io::Result<()> {
    print!("\r{} {}  \r{} {}", PROMPT.green().bold(), " ".repeat(input.chars().count() + 50), PROMPT.green().bold(), input);
    io::stdout().flush()
}

/// Read one line with ↑/↓ navigation through `history`. Piped stdin is
/// read line by line; `None` means end of input.
pub async fn handle_input_with_history(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    enable_raw_mode()?;
    let result = read_line_raw(history);
    disable_raw_mode()?;
    println!();
    result.map(Some)
}

fn read_line_raw(history: &mut Vec<String>) -> Result<String> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    print!("{} ", PROMPT.green().bold());
    io::stdout().flush()?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            KeyCode::Enter => {
                if !input.is_empty() {
                    history.push(input.clone());
                }
                return Ok(input);
            }
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&input)?;
            }
            KeyCode::Backspace => {
                if input.pop().is_some() {
                    redraw(&input)?;
                }
            }
            KeyCode::Up if !history.is_empty() => {
                let new_index = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(new_index);
                input = history[new_index].clone();
                redraw(&input)?;
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&input)?;
                }
            }
            KeyCode::Esc => return Ok(String::new()),
            _ => {}
        }
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question, say hi, or type arithmetic like 12 * 4", "<query>".green());
    println!("  {} - Show the plan for a query without running it", "/explain <query>".green());
    println!("  {} - Caption an image file", "/image <path>".green());
    println!("  {} - Summarize this conversation", "/summarize".green());
    println!("  {} - Show this conversation", "/history".green());
    println!("  {} - Forget this conversation", "/clear".green());
    println!("  {} - Show router statistics", "/stats".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  What is Docker?");
    println!("  calculate (12 + 4) / 2");
    println!("  /explain how does git branching work");
}
