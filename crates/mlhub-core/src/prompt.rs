//! Interactive confirmation.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

/// Asks the user yes/no questions.
pub trait Prompter: Send + Sync {
    /// Ask `question`; an empty answer returns `default`.
    ///
    /// # Errors
    ///
    /// Fails if the terminal cannot be read.
    fn confirm(&self, question: &str, default: bool) -> io::Result<bool>;
}

/// Answers from a fixed script and records every question asked.
///
/// When the script runs out, the question's default is returned.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Prompter that answers with `answers` in order.
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.iter().cloned().collect()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str, default: bool) -> io::Result<bool> {
        self.asked
            .lock()
            .map_err(|_| io::Error::other("prompter poisoned"))?
            .push(question.to_string());
        let answer = self
            .answers
            .lock()
            .map_err(|_| io::Error::other("prompter poisoned"))?
            .pop_front();
        Ok(answer.unwrap_or(default))
    }
}

/// Parse a typed answer. Anything not recognisable falls back to `default`.
pub fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("", true));
        assert!(!parse_answer("", false));
        assert!(parse_answer("Y", false));
        assert!(!parse_answer(" no ", true));
        assert!(parse_answer("maybe", true));
    }

    #[test]
    fn test_scripted_prompter_records_and_defaults() {
        let p = ScriptedPrompter::new([false]);
        assert!(!p.confirm("first?", true).unwrap());
        assert!(p.confirm("second?", true).unwrap());
        assert_eq!(p.asked(), vec!["first?", "second?"]);
    }
}
