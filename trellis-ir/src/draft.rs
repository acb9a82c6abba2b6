//! The fragment draft the IR is assembled in.

use eyre::{Result, eyre};
use serde::Serialize;
use trellis_pipeline::Draft;

use crate::{CapabilityMap, IrMeta, IrPhp, IrResource, IrSchema, ProjectIr};

/// IR under construction. Every section is filled by a fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IrDraft {
    pub meta: Option<IrMeta>,
    pub php: Option<IrPhp>,
    pub schemas: Option<Vec<IrSchema>>,
    pub resources: Option<Vec<IrResource>>,
    pub capability_map: Option<CapabilityMap>,
}

/// Sections a fragment contributes. Present sections replace the draft's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrPartial {
    pub meta: Option<IrMeta>,
    pub php: Option<IrPhp>,
    pub schemas: Option<Vec<IrSchema>>,
    pub resources: Option<Vec<IrResource>>,
    pub capability_map: Option<CapabilityMap>,
}

impl IrPartial {
    pub fn meta(meta: IrMeta, php: IrPhp) -> Self {
        Self {
            meta: Some(meta),
            php: Some(php),
            ..Self::default()
        }
    }

    pub fn collection(schemas: Vec<IrSchema>, resources: Vec<IrResource>) -> Self {
        Self {
            schemas: Some(schemas),
            resources: Some(resources),
            ..Self::default()
        }
    }

    pub fn capability_map(map: CapabilityMap) -> Self {
        Self {
            capability_map: Some(map),
            ..Self::default()
        }
    }
}

impl Draft for IrDraft {
    type Partial = IrPartial;

    fn assign(&mut self, partial: IrPartial) {
        let IrPartial {
            meta,
            php,
            schemas,
            resources,
            capability_map,
        } = partial;
        if meta.is_some() {
            self.meta = meta;
        }
        if php.is_some() {
            self.php = php;
        }
        if schemas.is_some() {
            self.schemas = schemas;
        }
        if resources.is_some() {
            self.resources = resources;
        }
        if capability_map.is_some() {
            self.capability_map = capability_map;
        }
    }
}

impl IrDraft {
    /// Convert into the finalized IR.
    ///
    /// `meta` and `php` are required; collections default to empty.
    pub fn finish(self) -> Result<ProjectIr> {
        Ok(ProjectIr {
            meta: self.meta.ok_or_else(|| missing_section("meta"))?,
            php: self.php.ok_or_else(|| missing_section("php"))?,
            schemas: self.schemas.unwrap_or_default(),
            resources: self.resources.unwrap_or_default(),
            capability_map: self.capability_map.unwrap_or_default(),
        })
    }
}

fn missing_section(section: &str) -> eyre::Report {
    eyre!("IR draft is missing `{section}`; was the ir.meta fragment registered?")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(namespace: &str) -> IrMeta {
        IrMeta {
            namespace: namespace.into(),
            sanitized_namespace: namespace.replace('-', "_"),
            version: 1,
            origin: "trellis.toml".into(),
            source_path: "trellis.toml".into(),
        }
    }

    fn php() -> IrPhp {
        IrPhp {
            namespace: "Acme".into(),
            autoload: "inc/".into(),
            output_dir: ".generated/php".into(),
        }
    }

    #[test]
    fn test_assign_overwrites_present_sections_only() {
        let mut draft = IrDraft::default();
        draft.assign(IrPartial::meta(meta("first"), php()));
        draft.assign(IrPartial::collection(vec![], vec![]));
        draft.assign(IrPartial {
            meta: Some(meta("second")),
            ..IrPartial::default()
        });

        assert_eq!(draft.meta.as_ref().unwrap().namespace, "second");
        assert!(draft.php.is_some());
        assert_eq!(draft.schemas, Some(vec![]));
        assert!(draft.capability_map.is_none());
    }

    #[test]
    fn test_finish_requires_meta() {
        let error = IrDraft::default().finish().unwrap_err();
        assert!(error.to_string().contains("missing `meta`"));
    }

    #[test]
    fn test_finish_defaults_collections() {
        let mut draft = IrDraft::default();
        draft.assign(IrPartial::meta(meta("acme"), php()));

        let ir = draft.finish().unwrap();

        assert!(ir.resources.is_empty());
        assert_eq!(ir.capability_map.fallback.capability, "manage_options");
    }
}
