use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use toolchat_core::LineInput;

/// Terminal line reader with editing and in-session history.
pub struct TerminalInput {
    editor: DefaultEditor,
}

impl TerminalInput {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineInput for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
