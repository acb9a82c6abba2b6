//! Project Intermediate Representation.
//!
//! ```text
//! trellis.toml → trellis-config (parsing) → ProjectIr (fragments) → builders
//! ```

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Capability used when a resource references one the project does not define.
pub const FALLBACK_CAPABILITY: &str = "manage_options";

/// The finalized IR handed to builders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectIr {
    pub meta: IrMeta,
    pub php: IrPhp,
    pub schemas: Vec<IrSchema>,
    pub resources: Vec<IrResource>,
    pub capability_map: CapabilityMap,
}

impl ProjectIr {
    pub fn schema(&self, name: &str) -> Option<&IrSchema> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    pub fn resource(&self, name: &str) -> Option<&IrResource> {
        self.resources.iter().find(|resource| resource.name == name)
    }

    /// The capability a resource is guarded by, falling back when the
    /// referenced capability is not defined.
    pub fn capability_for(&self, resource: &IrResource) -> &str {
        resource
            .capability
            .as_deref()
            .and_then(|key| self.capability_map.definition(key))
            .map(|definition| definition.capability.as_str())
            .unwrap_or(self.capability_map.fallback.capability.as_str())
    }
}

/// Project metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrMeta {
    /// Namespace slug as written in the configuration.
    pub namespace: String,
    /// Namespace made safe for identifiers (`acme-blog` → `acme_blog`).
    pub sanitized_namespace: String,
    pub version: u32,
    /// Where the IR came from, e.g. `trellis.toml`.
    pub origin: String,
    pub source_path: PathBuf,
}

/// PHP output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrPhp {
    pub namespace: String,
    pub autoload: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrSchema {
    pub name: String,
    pub path: PathBuf,
}

/// A REST resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrResource {
    pub name: String,
    pub route: String,
    pub schema: String,
    pub capability: Option<String>,
    pub cache_ttl: Option<u32>,
    pub methods: Vec<Method>,
}

/// Operations a resource can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    List,
    Get,
    Create,
    Update,
    Remove,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::List,
        Method::Get,
        Method::Create,
        Method::Update,
        Method::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::List => "list",
            Method::Get => "get",
            Method::Create => "create",
            Method::Update => "update",
            Method::Remove => "remove",
        }
    }

    pub fn http_verb(&self) -> &'static str {
        match self {
            Method::List | Method::Get => "GET",
            Method::Create => "POST",
            Method::Update => "PUT",
            Method::Remove => "DELETE",
        }
    }

    /// Whether the operation addresses a single item by id.
    pub fn takes_id(&self) -> bool {
        matches!(self, Method::Get | Method::Update | Method::Remove)
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == s)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a capability check is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityScope {
    #[default]
    Resource,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDefinition {
    pub key: String,
    pub capability: String,
    pub applies_to: CapabilityScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityFallback {
    pub capability: String,
    pub applies_to: CapabilityScope,
}

impl Default for CapabilityFallback {
    fn default() -> Self {
        Self {
            capability: FALLBACK_CAPABILITY.to_string(),
            applies_to: CapabilityScope::Resource,
        }
    }
}

/// A non-fatal finding recorded while building the IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrWarning {
    pub code: String,
    pub message: String,
    /// Keys the warning is about.
    pub subjects: Vec<String>,
}

/// Resolved capabilities, with bookkeeping of what is missing or unused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityMap {
    /// Sorted by key.
    pub definitions: Vec<CapabilityDefinition>,
    pub fallback: CapabilityFallback,
    /// Referenced by a resource but not defined.
    pub missing: Vec<String>,
    /// Defined but not referenced by any resource.
    pub unused: Vec<String>,
    pub warnings: Vec<IrWarning>,
}

impl CapabilityMap {
    pub fn definition(&self, key: &str) -> Option<&CapabilityDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(capability: Option<&str>) -> IrResource {
        IrResource {
            name: "post".into(),
            route: "/acme/v1/posts".into(),
            schema: "post".into(),
            capability: capability.map(String::from),
            cache_ttl: None,
            methods: vec![Method::List],
        }
    }

    fn ir() -> ProjectIr {
        ProjectIr {
            meta: IrMeta {
                namespace: "acme-blog".into(),
                sanitized_namespace: "acme_blog".into(),
                version: 1,
                origin: "trellis.toml".into(),
                source_path: "trellis.toml".into(),
            },
            php: IrPhp {
                namespace: "AcmeBlog".into(),
                autoload: "inc/".into(),
                output_dir: ".generated/php".into(),
            },
            schemas: vec![],
            resources: vec![],
            capability_map: CapabilityMap {
                definitions: vec![CapabilityDefinition {
                    key: "edit".into(),
                    capability: "edit_posts".into(),
                    applies_to: CapabilityScope::Resource,
                }],
                ..CapabilityMap::default()
            },
        }
    }

    #[test]
    fn test_capability_for_uses_definition() {
        assert_eq!(ir().capability_for(&resource(Some("edit"))), "edit_posts");
    }

    #[test]
    fn test_capability_for_falls_back() {
        let ir = ir();
        assert_eq!(ir.capability_for(&resource(Some("unknown"))), "manage_options");
        assert_eq!(ir.capability_for(&resource(None)), "manage_options");
    }

    #[test]
    fn test_method_parse_and_verbs() {
        assert_eq!(Method::parse("remove"), Some(Method::Remove));
        assert_eq!(Method::parse("delete"), None);
        assert_eq!(Method::Create.http_verb(), "POST");
        assert!(Method::Get.takes_id());
        assert!(!Method::List.takes_id());
    }

    #[test]
    fn test_method_serializes_lowercase() {
        let json = serde_json::to_string(&vec![Method::List, Method::Update]).unwrap();
        assert_eq!(json, r#"["list","update"]"#);
    }
}
