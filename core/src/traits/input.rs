/// Source of operator-typed lines for the interactive loop.
pub trait LineInput {
    /// Shows `prompt` and blocks for one line. `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

/// Replays a fixed list of lines, then reports end of input.
pub struct ScriptedInput {
    lines: std::collections::VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineInput for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}
