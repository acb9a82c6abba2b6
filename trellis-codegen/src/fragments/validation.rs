use std::collections::HashMap;

use eyre::bail;
use trellis_ir::Method;
use trellis_pipeline::FragmentHelper;

use crate::CodegenHost;

pub const KEY: &str = "ir.validation";

/// Fails the run on structural errors the configuration parser cannot see
/// once other fragments have had a say.
pub fn helper() -> FragmentHelper<CodegenHost> {
    FragmentHelper::<CodegenHost>::from_fn(KEY, |args| {
        let draft = args.output.draft();
        if draft.meta.is_none() {
            bail!("IR has no project metadata");
        }

        let schemas = draft.schemas.as_deref().unwrap_or_default();
        let resources = draft.resources.as_deref().unwrap_or_default();

        let mut routes: HashMap<(&str, bool), &str> = HashMap::new();
        for resource in resources {
            if !schemas.iter().any(|schema| schema.name == resource.schema) {
                bail!(
                    "resource '{}' references unknown schema '{}'",
                    resource.name,
                    resource.schema
                );
            }
            if resource.methods.is_empty() {
                bail!("resource '{}' exposes no methods", resource.name);
            }

            // Collection and item routes are registered separately.
            for item in [false, true] {
                if !resource.methods.iter().any(|m: &Method| m.takes_id() == item) {
                    continue;
                }
                if let Some(other) = routes.insert((resource.route.as_str(), item), &resource.name)
                {
                    bail!(
                        "resources '{other}' and '{}' both register route '{}'",
                        resource.name,
                        resource.route
                    );
                }
            }
        }
        Ok(())
    })
    .depends_on([super::capability::KEY])
}
