use crate::agent::AgentLoop;
use crate::traits::LineInput;
use anyhow::Result;
use std::io::Write;

pub const USER_PROMPT: &str = "You: ";
pub const ASSISTANT_PREFIX: &str = "Assistant: ";
pub const END_SENTINEL: &str = "end";
pub const GOODBYE: &str = "Ending the chat. Goodbye!";

pub fn is_end_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(END_SENTINEL)
}

/// Reads user lines until `end` or end of input, running one agent turn per
/// line. A failed turn is reported on `err` and the loop keeps going.
pub async fn run_repl(
    agent: &mut AgentLoop,
    input: &mut dyn LineInput,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    loop {
        let Some(line) = input.read_line(USER_PROMPT)? else {
            writeln!(out, "{}", GOODBYE)?;
            break;
        };

        if is_end_command(&line) {
            writeln!(out, "{}", GOODBYE)?;
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match agent.process(line).await {
            Ok(answer) => writeln!(out, "{}{}", ASSISTANT_PREFIX, answer)?,
            Err(e) => writeln!(err, "Error: {}", e)?,
        }
        out.flush()?;
    }

    Ok(())
}
