use eyre::eyre;
use trellis_pipeline::FragmentHelper;

use crate::{CacheKeys, ResourceHost, ResourcePartial};

pub const KEY: &str = "resource.cache-keys";

/// Cache key builders for every routed operation.
pub fn helper() -> FragmentHelper<ResourceHost> {
    FragmentHelper::<ResourceHost>::from_fn(KEY, |mut args| {
        let draft = args.output.draft();
        let name = draft
            .name
            .clone()
            .ok_or_else(|| eyre!("`{KEY}` needs the resource name"))?;
        let methods: Vec<_> = draft
            .routes
            .as_ref()
            .map(|routes| routes.methods().collect())
            .unwrap_or_default();

        args.output.assign(ResourcePartial {
            cache_keys: Some(CacheKeys::new(name, methods)),
            ..ResourcePartial::default()
        });
        Ok(())
    })
    .depends_on([super::routes::KEY])
}
