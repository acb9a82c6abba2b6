use std::collections::BTreeSet;

use async_trait::async_trait;
use eyre::Result;
use trellis_config::CapabilityConfig;
use trellis_ir::{
    CapabilityDefinition, CapabilityFallback, CapabilityMap, FALLBACK_CAPABILITY, IrPartial,
    IrResource, IrWarning,
};
use trellis_pipeline::{FragmentApply, FragmentArgs, FragmentHelper};

use crate::CodegenHost;

pub const KEY: &str = "ir.capability-map";

/// Resolves the capabilities resources reference against the definitions.
pub fn helper() -> FragmentHelper<CodegenHost> {
    FragmentHelper::new(KEY, CapabilityMapFragment).depends_on([super::collection::KEY])
}

struct CapabilityMapFragment;

#[async_trait]
impl FragmentApply<CodegenHost> for CapabilityMapFragment {
    async fn apply(&self, mut args: FragmentArgs<'_, CodegenHost>) -> Result<()> {
        let resources = args
            .output
            .draft()
            .resources
            .clone()
            .unwrap_or_default();
        let map = resolve(
            args.input
                .options
                .config
                .capabilities
                .iter()
                .map(|(key, config)| (key.as_str(), config)),
            &resources,
        );

        for warning in &map.warnings {
            args.reporter.warn(&warning.message);
        }
        args.output.assign(IrPartial::capability_map(map));
        Ok(())
    }
}

pub(crate) fn resolve<'a>(
    definitions: impl IntoIterator<Item = (&'a str, &'a CapabilityConfig)>,
    resources: &[IrResource],
) -> CapabilityMap {
    let referenced: BTreeSet<&str> = resources
        .iter()
        .filter_map(|resource| resource.capability.as_deref())
        .collect();

    let mut definitions: Vec<CapabilityDefinition> = definitions
        .into_iter()
        .map(|(key, config)| CapabilityDefinition {
            key: key.to_string(),
            capability: config.capability.clone(),
            applies_to: config.applies_to,
        })
        .collect();
    definitions.sort_by(|a, b| a.key.cmp(&b.key));

    let defined: BTreeSet<&str> = definitions.iter().map(|d| d.key.as_str()).collect();
    let missing: Vec<String> = referenced
        .difference(&defined)
        .map(|key| key.to_string())
        .collect();
    let unused: Vec<String> = defined
        .difference(&referenced)
        .map(|key| key.to_string())
        .collect();

    let mut warnings = Vec::new();
    if definitions.is_empty() && !missing.is_empty() {
        warnings.push(IrWarning {
            code: "capability-map.missing".into(),
            message: format!(
                "No capabilities are defined. Falling back to \"{FALLBACK_CAPABILITY}\" for referenced capabilities."
            ),
            subjects: missing.clone(),
        });
    } else if !missing.is_empty() {
        warnings.push(IrWarning {
            code: "capability-map.entries.missing".into(),
            message: "Capabilities referenced by resources are not defined.".into(),
            subjects: missing.clone(),
        });
    }
    if !unused.is_empty() {
        warnings.push(IrWarning {
            code: "capability-map.entries.unused".into(),
            message: "Capabilities are defined but not referenced by any resource.".into(),
            subjects: unused.clone(),
        });
    }

    CapabilityMap {
        definitions,
        fallback: CapabilityFallback::default(),
        missing,
        unused,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use trellis_ir::{CapabilityScope, Method};

    use super::*;

    fn resource(name: &str, capability: Option<&str>) -> IrResource {
        IrResource {
            name: name.into(),
            route: format!("/{name}"),
            schema: name.into(),
            capability: capability.map(String::from),
            cache_ttl: None,
            methods: vec![Method::List],
        }
    }

    fn capability(name: &str) -> CapabilityConfig {
        CapabilityConfig {
            capability: name.into(),
            applies_to: CapabilityScope::Resource,
        }
    }

    #[test]
    fn test_resolve_tracks_missing_and_unused() {
        let edit = capability("edit_posts");
        let moderate = capability("moderate_comments");
        let map = resolve(
            [("moderate", &moderate), ("edit", &edit)],
            &[
                resource("post", Some("edit")),
                resource("page", Some("publish")),
                resource("tag", None),
            ],
        );

        let keys: Vec<&str> = map.definitions.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["edit", "moderate"]);
        assert_eq!(map.missing, vec!["publish"]);
        assert_eq!(map.unused, vec!["moderate"]);

        let codes: Vec<&str> = map.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(
            codes,
            vec!["capability-map.entries.missing", "capability-map.entries.unused"]
        );
    }

    #[test]
    fn test_resolve_without_definitions_falls_back() {
        let map = resolve([], &[resource("post", Some("edit"))]);

        assert_eq!(map.missing, vec!["edit"]);
        assert_eq!(map.fallback.capability, "manage_options");
        assert_eq!(map.warnings.len(), 1);
        assert_eq!(map.warnings[0].code, "capability-map.missing");
    }

    #[test]
    fn test_resolve_clean_map_has_no_warnings() {
        let edit = capability("edit_posts");
        let map = resolve([("edit", &edit)], &[resource("post", Some("edit"))]);

        assert!(map.warnings.is_empty());
        assert!(map.missing.is_empty());
        assert!(map.unused.is_empty());
    }
}
