//! Yes/no questions on the terminal.

use std::io::{self, BufRead, Write};

use mlhub_core::Prompter;
use mlhub_core::prompt::parse_answer;

/// Asks on stdout and reads the answer from stdin.
///
/// End of input counts as the default answer, so piping `ml` from a script
/// behaves as if the user pressed enter at every question.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default: bool) -> io::Result<bool> {
        let choices = if default { "[Y/n]" } else { "[y/N]" };
        let mut stdout = io::stdout();
        write!(stdout, "{question} {choices}? ")?;
        stdout.flush()?;

        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            writeln!(stdout)?;
            return Ok(default);
        }
        Ok(parse_answer(&input, default))
    }
}
