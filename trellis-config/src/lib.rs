//! `trellis.toml` parsing and validation.
//!
//! Errors carry the source text and spans so the CLI can render them with
//! `miette`.

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod error;
mod validate;

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

pub use error::{Error, Result, SourceContext};
use indexmap::IndexMap;
use serde::Deserialize;
use trellis_core::to_pascal_case;
use trellis_ir::{CapabilityScope, Method};

use crate::validate::{ParseContext, validate_config};

/// Default configuration filename.
pub const CONFIG_FILE: &str = "trellis.toml";

/// Root schema for trellis.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub project: ProjectConfig,

    #[serde(default)]
    pub php: PhpConfig,

    /// Capability definitions keyed by the name resources reference them by.
    #[serde(default)]
    pub capabilities: IndexMap<String, CapabilityConfig>,

    #[serde(default)]
    pub schemas: IndexMap<String, SchemaConfig>,

    #[serde(default)]
    pub resources: IndexMap<String, ResourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Lowercase slug, e.g. `acme-blog`.
    pub namespace: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhpConfig {
    /// Derived from the project namespace when absent.
    pub namespace: Option<String>,
    #[serde(default = "default_autoload")]
    pub autoload: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_autoload() -> String {
    "inc/".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".generated/php")
}

impl Default for PhpConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            autoload: default_autoload(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityConfig {
    /// The underlying capability checked at request time.
    pub capability: String,
    #[serde(default)]
    pub applies_to: CapabilityScope,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    pub route: String,
    pub schema: String,
    pub capability: Option<String>,
    /// Cache lifetime in seconds.
    pub cache_ttl: Option<u32>,
    #[serde(default = "default_methods")]
    pub methods: Vec<Method>,
}

fn default_methods() -> Vec<Method> {
    Method::ALL.to_vec()
}

impl Config {
    /// Parse a trellis.toml file from the given path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        parse_config(&content, &path.display().to_string())
    }

    /// Parse a trellis.toml from a string with a custom filename for error reporting.
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        parse_config(content, filename)
    }

    /// The PHP namespace, derived from the project namespace when not set.
    pub fn php_namespace(&self) -> String {
        self.php
            .namespace
            .clone()
            .unwrap_or_else(|| to_pascal_case(&self.project.namespace))
    }
}

impl FromStr for Config {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        parse_config(s, CONFIG_FILE)
    }
}

/// Parse configuration from content with the given filename for error reporting.
pub fn parse_config(content: &str, filename: &str) -> Result<Config> {
    let ctx = ParseContext::new(content, filename);
    let config: Config = toml::from_str(content).map_err(|e| ctx.source().parse_error(e))?;
    validate_config(&config, &ctx)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const EXAMPLE: &str = r#"
[project]
namespace = "acme-blog"
version = 1

[php]
autoload = "inc/"
output_dir = ".generated/php"

[capabilities.edit_posts]
capability = "edit_posts"
applies_to = "resource"

[schemas.post]
path = "schemas/post.json"

[resources.post]
route = "/acme/v1/posts"
schema = "post"
capability = "edit_posts"
cache_ttl = 60
methods = ["list", "get", "create"]
"#;

    fn parse(src: &str) -> Result<Config> {
        src.parse()
    }

    #[test]
    fn test_parse_example() {
        let config = parse(EXAMPLE).unwrap();

        assert_eq!(config.project.namespace, "acme-blog");
        assert_eq!(config.php_namespace(), "AcmeBlog");
        assert_eq!(
            config.capabilities["edit_posts"].applies_to,
            CapabilityScope::Resource
        );

        let post = &config.resources["post"];
        assert_eq!(post.methods, vec![Method::List, Method::Get, Method::Create]);
        assert_eq!(post.cache_ttl, Some(60));
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
[project]
namespace = "acme"

[schemas.post]
path = "post.json"

[resources.post]
route = "/acme/v1/posts"
schema = "post"
"#,
        )
        .unwrap();

        assert_eq!(config.project.version, 1);
        assert_eq!(config.php.output_dir, PathBuf::from(".generated/php"));
        assert_eq!(config.resources["post"].methods, Method::ALL.to_vec());
        assert!(config.resources["post"].capability.is_none());
    }

    #[test]
    fn test_tables_keep_declaration_order() {
        let config = parse(
            r#"
[project]
namespace = "acme"

[capabilities.publish]
capability = "publish_posts"

[capabilities.edit]
capability = "edit_posts"

[schemas.post]
path = "post.json"

[schemas.comment]
path = "comment.json"

[resources.post]
route = "/acme/v1/posts"
schema = "post"

[resources.comment]
route = "/acme/v1/comments"
schema = "comment"
"#,
        )
        .unwrap();

        let resources: Vec<&str> = config.resources.keys().map(String::as_str).collect();
        let schemas: Vec<&str> = config.schemas.keys().map(String::as_str).collect();
        let capabilities: Vec<&str> = config.capabilities.keys().map(String::as_str).collect();

        assert_eq!(resources, ["post", "comment"]);
        assert_eq!(schemas, ["post", "comment"]);
        assert_eq!(capabilities, ["publish", "edit"]);
    }

    #[test]
    fn test_explicit_php_namespace() {
        let src = "[project]\nnamespace = \"acme\"\n\n[php]\nnamespace = \"Acme\\\\Blog\"\n";
        let config = parse(src).unwrap();
        assert_eq!(config.php_namespace(), "Acme\\Blog");
    }

    #[test]
    fn test_invalid_namespace() {
        let err = parse("[project]\nnamespace = \"Acme Blog\"\n").unwrap_err();
        assert!(matches!(*err, Error::InvalidNamespace { .. }));
        assert!(err.to_string().contains("Acme Blog"));
    }

    #[test]
    fn test_unknown_method_is_a_parse_error() {
        let src = EXAMPLE.replace(r#""list", "get", "create""#, r#""list", "purge""#);
        let err = parse(&src).unwrap_err();
        assert!(matches!(*err, Error::Parse { .. }));
    }

    #[test]
    fn test_duplicate_method() {
        let src = EXAMPLE.replace(r#""list", "get", "create""#, r#""list", "list""#);
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_unknown_schema() {
        let src = EXAMPLE.replace("schema = \"post\"", "schema = \"article\"");
        let err = parse(&src).unwrap_err();
        assert!(matches!(*err, Error::UnknownSchema { .. }));
    }

    #[test]
    fn test_missing_capability_is_not_an_error() {
        let src = EXAMPLE.replace(
            "capability = \"edit_posts\"\ncache_ttl",
            "capability = \"publish\"\ncache_ttl",
        );
        let config = parse(&src).unwrap();
        assert_eq!(config.resources["post"].capability.as_deref(), Some("publish"));
    }

    #[test]
    fn test_invalid_resource_name() {
        let src = EXAMPLE.replace("[resources.post]", "[resources.\"blog post\"]");
        let err = parse(&src).unwrap_err();
        assert!(matches!(*err, Error::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_route_must_be_absolute() {
        let src = EXAMPLE.replace("route = \"/acme/v1/posts\"", "route = \"acme/v1/posts\"");
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let src = format!("{EXAMPLE}\n[extra]\nfoo = 1\n");
        assert!(parse(&src).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.resources.len(), 1);
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/nonexistent/trellis.toml").unwrap_err();
        assert!(matches!(*err, Error::Io { .. }));
    }
}
