use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for trellis-config operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source content and filename, used to attach spans to errors.
#[derive(Debug, Clone)]
pub struct SourceContext {
    text: String,
    name: String,
}

impl SourceContext {
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            text: src.into(),
            name: filename.into(),
        }
    }

    pub fn src(&self) -> &str {
        &self.text
    }

    fn named(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.text.clone())
    }

    /// Wraps a toml error, labelling its span when toml reports one.
    pub fn parse_error(&self, source: toml::de::Error) -> Box<Error> {
        let span = source.span().map(SourceSpan::from);
        Box::new(Error::Parse {
            source_code: self.named(),
            span,
            source,
        })
    }

    pub fn validation_error(
        &self,
        message: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::Validation {
            source_code: self.named(),
            span,
            message: message.into(),
        })
    }

    pub fn invalid_identifier_error(
        &self,
        name: impl Into<String>,
        context: impl Into<String>,
        reason: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::InvalidIdentifier {
            source_code: self.named(),
            span,
            name: name.into(),
            context: context.into(),
            reason: reason.into(),
        })
    }

    pub fn invalid_namespace_error(
        &self,
        namespace: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::InvalidNamespace {
            source_code: self.named(),
            span,
            namespace: namespace.into(),
        })
    }

    pub fn unknown_schema_error(
        &self,
        resource: impl Into<String>,
        schema: impl Into<String>,
        available: &[&str],
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        let available = if available.is_empty() {
            "none".to_string()
        } else {
            available.join(", ")
        };
        Box::new(Error::UnknownSchema {
            source_code: self.named(),
            span,
            resource: resource.into(),
            schema: schema.into(),
            available,
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(help("create a trellis.toml in the project root or pass --config"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trellis.toml")]
    #[diagnostic(code(trellis::parse_error))]
    Parse {
        #[source_code]
        source_code: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(trellis::validation_error))]
    Validation {
        #[source_code]
        source_code: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("invalid project namespace '{namespace}'")]
    #[diagnostic(
        code(trellis::invalid_namespace),
        help("use a lowercase slug such as 'acme-blog': letters, digits and single dashes")
    )]
    InvalidNamespace {
        #[source_code]
        source_code: NamedSource<String>,
        #[label("not a lowercase slug")]
        span: Option<SourceSpan>,
        namespace: String,
    },

    #[error("invalid {context} name '{name}'")]
    #[diagnostic(
        code(trellis::invalid_identifier),
        help(
            "{reason}. Use only letters, numbers, underscores and dashes, starting with a letter or underscore."
        )
    )]
    InvalidIdentifier {
        #[source_code]
        source_code: NamedSource<String>,
        #[label("invalid identifier")]
        span: Option<SourceSpan>,
        name: String,
        context: String,
        reason: String,
    },

    #[error("resource '{resource}' references unknown schema '{schema}'")]
    #[diagnostic(
        code(trellis::unknown_schema),
        help("declare it under [schemas.{schema}]; available schemas: {available}")
    )]
    UnknownSchema {
        #[source_code]
        source_code: NamedSource<String>,
        #[label("unknown schema")]
        span: Option<SourceSpan>,
        resource: String,
        schema: String,
        available: String,
    },
}
