use trellis_ir::{IrPartial, IrResource, IrSchema};
use trellis_pipeline::FragmentHelper;

use crate::CodegenHost;

pub const KEY: &str = "ir.collection";

/// Schemas and resources, in configuration order.
pub fn helper() -> FragmentHelper<CodegenHost> {
    FragmentHelper::<CodegenHost>::from_fn(KEY, |mut args| {
        let config = &args.input.options.config;

        let schemas = config
            .schemas
            .iter()
            .map(|(name, schema)| IrSchema {
                name: name.clone(),
                path: schema.path.clone(),
            })
            .collect();

        let resources: Vec<IrResource> = config
            .resources
            .iter()
            .map(|(name, resource)| IrResource {
                name: name.clone(),
                route: resource.route.clone(),
                schema: resource.schema.clone(),
                capability: resource.capability.clone(),
                cache_ttl: resource.cache_ttl,
                methods: resource.methods.clone(),
            })
            .collect();

        args.reporter
            .debug(format_args!("collected {} resources", resources.len()));
        args.output.assign(IrPartial::collection(schemas, resources));
        Ok(())
    })
    .depends_on([super::meta::KEY])
}
