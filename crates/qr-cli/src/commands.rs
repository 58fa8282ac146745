//! Interactive command parsing

use std::path::PathBuf;

/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Anything that is not a command goes to the router
    Query(String),
    Explain(String),
    Image(PathBuf),
    Summarize,
    History,
    Clear,
    Stats,
    Help,
    Exit,
    Empty,
    /// A slash command that is missing its argument or is not known
    Invalid(String),
}

impl CliCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return CliCommand::Empty;
        }

        let lower = line.to_lowercase();
        match lower.as_str() {
            "exit" | "quit" => return CliCommand::Exit,
            "help" | "/help" => return CliCommand::Help,
            _ => {}
        }

        let Some(rest) = line.strip_prefix('/') else {
            return CliCommand::Query(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name.to_lowercase(), arg.trim()),
            None => (rest.to_lowercase(), ""),
        };

        match (name.as_str(), arg.is_empty()) {
            ("clear", _) => CliCommand::Clear,
            ("history", _) => CliCommand::History,
            ("stats", _) => CliCommand::Stats,
            ("summarize", _) => CliCommand::Summarize,
            ("explain", false) => CliCommand::Explain(arg.to_string()),
            ("image", false) => CliCommand::Image(PathBuf::from(arg)),
            ("explain", true) => CliCommand::Invalid("usage: /explain <query>".to_string()),
            ("image", true) => CliCommand::Invalid("usage: /image <path>".to_string()),
            _ => CliCommand::Invalid(format!("unknown command '/{}', type 'help'", name)),
        }
    }
}
