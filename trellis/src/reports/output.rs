//! Output trait for rendering reports to different formats.

/// Target output for reports.
///
/// Reports describe *what* to output using these semantic methods.
/// Implementations decide *how* to render.
pub trait Output {
    /// Render a title/header.
    fn title(&mut self, text: &str);

    /// Start a new section with a heading.
    fn section(&mut self, name: &str);

    fn key_value(&mut self, key: &str, value: &str);

    fn numbered_item(&mut self, index: usize, text: &str);

    fn list_item(&mut self, text: &str);

    /// Render an added item (e.g., a written file).
    fn added_item(&mut self, text: &str);

    /// Render a message on the error stream.
    fn warning(&mut self, msg: &str);

    fn preformatted(&mut self, text: &str);

    fn newline(&mut self);
}

/// A report that can render itself to an output.
pub trait Report {
    fn render(&self, out: &mut dyn Output);
}

/// Terminal output implementation.
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for TerminalOutput {
    fn title(&mut self, text: &str) {
        println!("{}", text);
        println!("{}", "=".repeat(text.len()));
    }

    fn section(&mut self, name: &str) {
        println!("{}:", name);
    }

    fn key_value(&mut self, key: &str, value: &str) {
        println!("{}: {}", key, value);
    }

    fn numbered_item(&mut self, index: usize, text: &str) {
        println!("  {}. {}", index, text);
    }

    fn list_item(&mut self, text: &str) {
        println!("  - {}", text);
    }

    fn added_item(&mut self, text: &str) {
        println!("  + {}", text);
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("{}", msg);
    }

    fn preformatted(&mut self, text: &str) {
        println!("{}", text);
    }

    fn newline(&mut self) {
        println!();
    }
}

/// Collects rendered output into a string; warnings are inlined.
#[cfg(test)]
#[derive(Default)]
pub struct BufferOutput(pub String);

#[cfg(test)]
impl Output for BufferOutput {
    fn title(&mut self, text: &str) {
        self.0
            .push_str(&format!("{text}\n{}\n", "=".repeat(text.len())));
    }

    fn section(&mut self, name: &str) {
        self.0.push_str(&format!("{name}:\n"));
    }

    fn key_value(&mut self, key: &str, value: &str) {
        self.0.push_str(&format!("{key}: {value}\n"));
    }

    fn numbered_item(&mut self, index: usize, text: &str) {
        self.0.push_str(&format!("  {index}. {text}\n"));
    }

    fn list_item(&mut self, text: &str) {
        self.0.push_str(&format!("  - {text}\n"));
    }

    fn added_item(&mut self, text: &str) {
        self.0.push_str(&format!("  + {text}\n"));
    }

    fn warning(&mut self, msg: &str) {
        self.0.push_str(&format!("{msg}\n"));
    }

    fn preformatted(&mut self, text: &str) {
        self.0.push_str(&format!("{text}\n"));
    }

    fn newline(&mut self) {
        self.0.push('\n');
    }
}
