//! Confirmation port: business logic asks for confirmation through this
//! trait instead of touching stdin, so every gated flow is testable without
//! a terminal.

use std::io::{BufRead, Write};

/// How strong an affirmative is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// A loose yes: `y` / `yes`, case-insensitive.
    Normal,
    /// The literal uppercase token `YES`. Used for irreversible operations.
    Explicit,
}

pub trait Confirmation {
    fn confirm(&self, prompt: &str, strictness: Strictness) -> bool;
}

/// Interactive confirmer reading from stdin.
pub struct StdinConfirmer;

impl Confirmation for StdinConfirmer {
    fn confirm(&self, prompt: &str, strictness: Strictness) -> bool {
        let hint = match strictness {
            Strictness::Normal => "[y/N]",
            Strictness::Explicit => "[type 'YES' to confirm / N to cancel]",
        };
        print!("{prompt} {hint}: ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        answer_accepted(line.trim(), strictness)
    }
}

fn answer_accepted(answer: &str, strictness: Strictness) -> bool {
    match strictness {
        Strictness::Normal => matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"),
        Strictness::Explicit => answer == "YES",
    }
}
