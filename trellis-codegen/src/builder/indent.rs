//! Indentation used by the generated languages.

/// One level of indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent(&'static str);

impl Indent {
    /// PSR-12: four spaces.
    pub const PHP: Self = Self("    ");

    /// Two spaces, matching the formatter defaults for TypeScript and JSON.
    pub const TYPESCRIPT: Self = Self("  ");

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(Indent::PHP.width(), 4);
        assert_eq!(Indent::TYPESCRIPT.width(), 2);
        assert!(Indent::PHP.as_str().chars().all(|c| c == ' '));
    }
}
