//! Validation of a parsed configuration against its source.

use miette::SourceSpan;
use trellis_core::is_slug;

use crate::{Config, Result, error::SourceContext};

/// Validation context carrying the source for span lookups.
#[derive(Debug, Clone)]
pub(crate) struct ParseContext {
    source: SourceContext,
}

impl ParseContext {
    pub(crate) fn new(src: &str, filename: &str) -> Self {
        Self {
            source: SourceContext::new(src, filename),
        }
    }

    pub(crate) fn source(&self) -> &SourceContext {
        &self.source
    }

    /// Find the span of a table name in the source.
    pub(crate) fn find_span(&self, name: &str) -> Option<SourceSpan> {
        find_name_span(self.source.src(), name)
    }

    /// Find the span of the string value assigned to `key` inside `[table]`.
    pub(crate) fn find_value_span(
        &self,
        table: &str,
        key: &str,
        value: &str,
    ) -> Option<SourceSpan> {
        find_value_span(self.source.src(), table, key, value)
    }

    pub(crate) fn validate_name(&self, name: &str, kind: &str) -> Result<()> {
        if let Some(reason) = validate_identifier(name) {
            return Err(self.source.invalid_identifier_error(
                name,
                kind,
                reason,
                self.find_span(name),
            ));
        }
        Ok(())
    }
}

/// Validate the configuration after parsing.
pub(crate) fn validate_config(config: &Config, ctx: &ParseContext) -> Result<()> {
    let namespace = &config.project.namespace;
    if !is_slug(namespace) {
        return Err(ctx.source().invalid_namespace_error(
            namespace,
            ctx.find_value_span("project", "namespace", namespace),
        ));
    }

    if let Some(php_namespace) = &config.php.namespace
        && !is_php_namespace(php_namespace)
    {
        return Err(ctx.source().validation_error(
            format!("'{php_namespace}' is not a valid PHP namespace"),
            ctx.find_value_span("php", "namespace", php_namespace),
        ));
    }

    for name in config.capabilities.keys() {
        ctx.validate_name(name, "capability")?;
    }
    for name in config.schemas.keys() {
        ctx.validate_name(name, "schema")?;
    }

    let schemas: Vec<&str> = config.schemas.keys().map(String::as_str).collect();
    for (name, resource) in &config.resources {
        ctx.validate_name(name, "resource")?;

        let table = format!("resources.{name}");
        if !resource.route.starts_with('/') {
            return Err(ctx.source().validation_error(
                format!("route of resource '{name}' must start with '/'"),
                ctx.find_value_span(&table, "route", &resource.route),
            ));
        }

        if !config.schemas.contains_key(&resource.schema) {
            return Err(ctx.source().unknown_schema_error(
                name,
                &resource.schema,
                &schemas,
                ctx.find_value_span(&table, "schema", &resource.schema),
            ));
        }

        for (i, method) in resource.methods.iter().enumerate() {
            if resource.methods[..i].contains(method) {
                return Err(ctx.source().validation_error(
                    format!("resource '{name}' lists method '{method}' more than once"),
                    ctx.find_span(name),
                ));
            }
        }
    }
    Ok(())
}

/// Find the span of a name in the TOML source
/// Searches for patterns like `.name]`, `.name.`, or `.name =`
pub(crate) fn find_name_span(src: &str, name: &str) -> Option<SourceSpan> {
    let patterns = [
        format!(".{}]", name),
        format!(".{}.", name),
        format!(".{} ", name),
        format!(".{}=", name),
    ];

    for pattern in &patterns {
        if let Some(pos) = src.find(pattern) {
            // +1 to skip the leading dot
            return Some(SourceSpan::from((pos + 1, name.len())));
        }
    }

    src.find(name).map(|pos| SourceSpan::from((pos, name.len())))
}

/// Find `key = "value"` after the `[table]` header and return the span of the
/// value, quotes excluded.
pub(crate) fn find_value_span(
    src: &str,
    table: &str,
    key: &str,
    value: &str,
) -> Option<SourceSpan> {
    let header = format!("[{table}]");
    let start = src.find(&header).map(|pos| pos + header.len()).unwrap_or(0);
    let section = &src[start..];
    let end = section.find("\n[").unwrap_or(section.len());
    let section = &section[..end];

    let mut offset = 0;
    for line in section.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(key)
            && trimmed[key.len()..].trim_start().starts_with('=')
            && let Some(pos) = line.find(&format!("\"{value}\""))
        {
            return Some(SourceSpan::from((start + offset + pos + 1, value.len())));
        }
        offset += line.len();
    }
    None
}

/// Validate that a name is a usable identifier
/// Returns None if valid, Some(reason) if invalid
///
/// Allows dashes in names (e.g., "blog-post"); generators convert them to
/// the case each target language expects.
pub(crate) fn validate_identifier(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();

    // First character must be a letter or underscore
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Some("name must start with a letter or underscore"),
        None => return Some("name cannot be empty"),
    }

    let mut prev_was_dash = false;
    for c in chars {
        if c == '-' {
            if prev_was_dash {
                return Some("name cannot contain consecutive dashes");
            }
            prev_was_dash = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            prev_was_dash = false;
        } else {
            return Some("name must contain only letters, numbers, underscores, and dashes");
        }
    }

    if prev_was_dash {
        return Some("name cannot end with a dash");
    }

    None
}

/// `Acme\Blog` style namespaces: backslash-separated PascalCase-friendly segments.
fn is_php_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace.split('\\').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("post").is_none());
        assert!(validate_identifier("blog_post").is_none());
        assert!(validate_identifier("blog-post").is_none());
        assert!(validate_identifier("_private").is_none());
        assert!(validate_identifier("v2").is_none());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(validate_identifier("").is_some());
        assert!(validate_identifier("1st").is_some());
        assert!(validate_identifier("-post").is_some());
        assert!(validate_identifier("post-").is_some());
        assert!(validate_identifier("blog--post").is_some());
        assert!(validate_identifier("blog.post").is_some());
        assert!(validate_identifier("blog post").is_some());
    }

    #[test]
    fn test_find_name_span() {
        let src = "[resources.post]\nroute = \"/posts\"";
        let span = find_name_span(src, "post").unwrap();
        assert_eq!(span.offset(), 11);
        assert_eq!(span.len(), 4);
    }

    #[test]
    fn test_find_value_span_scoped_to_table() {
        let src = "[project]\nnamespace = \"Acme\"\n\n[php]\nnamespace = \"Acme\"\n";
        let span = find_value_span(src, "php", "namespace", "Acme").unwrap();
        assert_eq!(&src[span.offset()..span.offset() + span.len()], "Acme");
        assert!(span.offset() > src.find("[php]").unwrap());
    }

    #[test]
    fn test_find_value_span_missing_key() {
        let src = "[project]\nversion = 1\n";
        assert!(find_value_span(src, "project", "namespace", "acme").is_none());
    }

    #[test]
    fn test_php_namespace() {
        assert!(is_php_namespace("AcmeBlog"));
        assert!(is_php_namespace("Acme\\Blog"));
        assert!(!is_php_namespace("acme-blog"));
        assert!(!is_php_namespace("Acme\\\\Blog"));
        assert!(!is_php_namespace(""));
    }
}
