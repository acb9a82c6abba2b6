//! Code builder utility for generating properly indented code.

use super::Indent;

/// Fluent API for building code with proper indentation.
///
/// # Example
///
/// ```
/// use trellis_codegen::builder::CodeBuilder;
///
/// let code = CodeBuilder::php()
///     .line("function main(): void {")
///     .indent()
///     .line("echo 'hello';")
///     .dedent()
///     .line("}")
///     .build();
///
/// assert_eq!(code, "function main(): void {\n    echo 'hello';\n}\n");
/// ```
#[derive(Debug, Clone)]
pub struct CodeBuilder {
    indent_level: usize,
    indent: Indent,
    buffer: String,
}

impl CodeBuilder {
    pub fn new(indent: Indent) -> Self {
        Self {
            indent_level: 0,
            indent,
            buffer: String::new(),
        }
    }

    /// Create a new CodeBuilder with 4-space indentation.
    pub fn php() -> Self {
        Self::new(Indent::PHP)
    }

    /// Create a new CodeBuilder with 2-space indentation.
    pub fn typescript() -> Self {
        Self::new(Indent::TYPESCRIPT)
    }

    /// Add a line of code with current indentation.
    pub fn line(mut self, s: &str) -> Self {
        self.write_indent();
        self.buffer.push_str(s);
        self.buffer.push('\n');
        self
    }

    /// Add a blank line (no indentation).
    pub fn blank(mut self) -> Self {
        self.buffer.push('\n');
        self
    }

    pub fn indent(mut self) -> Self {
        self.indent_level += 1;
        self
    }

    pub fn dedent(mut self) -> Self {
        self.indent_level = self.indent_level.saturating_sub(1);
        self
    }

    /// Add a block with a closing line.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_codegen::builder::CodeBuilder;
    ///
    /// let code = CodeBuilder::typescript()
    ///     .block_with_close("export function run() {", "}", |b| b.line("return 1;"))
    ///     .build();
    ///
    /// assert_eq!(code, "export function run() {\n  return 1;\n}\n");
    /// ```
    pub fn block_with_close<F>(self, header: &str, close: &str, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let builder = self.line(header).indent();
        f(builder).dedent().line(close)
    }

    /// Apply `f` once per item. Works with `Option` too, for optional lines.
    pub fn each<T, I, F>(mut self, items: I, f: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: Fn(Self, T) -> Self,
    {
        for item in items {
            self = f(self, item);
        }
        self
    }

    /// Consume the builder and return the generated code.
    pub fn build(self) -> String {
        self.buffer
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.buffer.push_str(self.indent.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_line() {
        let code = CodeBuilder::php().line("$x = 1;").build();
        assert_eq!(code, "$x = 1;\n");
    }

    #[test]
    fn test_block() {
        let code = CodeBuilder::php()
            .line("final class Foo")
            .block_with_close("{", "}", |b| b.line("public const A = 1;"))
            .build();

        assert_eq!(code, "final class Foo\n{\n    public const A = 1;\n}\n");
    }

    #[test]
    fn test_blank_line_has_no_indent() {
        let code = CodeBuilder::php()
            .indent()
            .line("a();")
            .blank()
            .line("b();")
            .build();

        assert_eq!(code, "    a();\n\n    b();\n");
    }

    #[test]
    fn test_each() {
        let code = CodeBuilder::typescript()
            .line("export {")
            .indent()
            .each(["a", "b"], |b, name| b.line(&format!("{name},")))
            .dedent()
            .line("};")
            .build();

        assert_eq!(code, "export {\n  a,\n  b,\n};\n");
    }

    #[test]
    fn test_dedent_saturates() {
        let code = CodeBuilder::php().dedent().line("x").build();
        assert_eq!(code, "x\n");
    }
}
