//! Prompt rendering
//!
//! A console's prompts are a plain record of three rendering functions, so
//! a frontend can restyle the console without wrapping or extending it.

/// How the console renders its prompts
#[derive(Clone, Copy)]
pub struct PromptStyle {
    /// Primary input prompt, given the next execution count
    pub prompt: fn(u32) -> String,
    /// Continuation prompt for incomplete input, given the primary prompt's width
    pub continuation: fn(usize) -> String,
    /// Prefix echoed before an execution result, given its execution count
    pub out_prompt: fn(u32) -> String,
}

impl PromptStyle {
    /// Prompts that feel like the R console: `> `, `+ `, and no result prefix
    pub fn r_like() -> Self {
        Self {
            prompt: |_| "> ".to_string(),
            continuation: |_| "+ ".to_string(),
            out_prompt: |_| String::new(),
        }
    }

    /// Render the primary prompt
    pub fn render_prompt(&self, execution_count: u32) -> String {
        (self.prompt)(execution_count)
    }

    /// Render the continuation prompt
    pub fn render_continuation(&self, width: usize) -> String {
        (self.continuation)(width)
    }

    /// Render the result prefix
    pub fn render_out_prompt(&self, execution_count: u32) -> String {
        (self.out_prompt)(execution_count)
    }
}

impl Default for PromptStyle {
    /// IPython-style numbered prompts
    fn default() -> Self {
        Self {
            prompt: |n| format!("In [{}]: ", n),
            continuation: |width| format!("{:>w$}: ", "...", w = width.saturating_sub(2)),
            out_prompt: |n| format!("Out[{}]: ", n),
        }
    }
}

impl std::fmt::Debug for PromptStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptStyle")
            .field("prompt", &self.render_prompt(1))
            .field("continuation", &self.render_continuation(0))
            .field("out_prompt", &self.render_out_prompt(1))
            .finish()
    }
}
