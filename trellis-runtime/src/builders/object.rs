use async_trait::async_trait;
use eyre::Result;
use trellis_pipeline::{BuilderApply, BuilderArgs, BuilderHelper, Next};

use crate::{ResourceHost, ResourceObject};

pub const KEY: &str = "resource.object.build";

pub fn helper() -> BuilderHelper<ResourceHost> {
    BuilderHelper::new(KEY, ObjectBuilder).priority(20)
}

struct ObjectBuilder;

#[async_trait]
impl BuilderApply<ResourceHost> for ObjectBuilder {
    async fn apply(
        &self,
        args: BuilderArgs<'_, ResourceHost>,
        next: &mut Next<'_, ResourceHost>,
    ) -> Result<()> {
        let artifact = &mut *args.artifact;
        artifact.resource = Some(ResourceObject {
            name: artifact.name.clone(),
            namespace: artifact.namespace.clone(),
            store_key: artifact.store_key.clone(),
            routes: artifact.routes.clone(),
            cache_keys: artifact.cache_keys.clone(),
        });
        args.reporter.debug(format_args!(
            "built {} with {} routes",
            artifact.store_key,
            artifact.routes.len()
        ));
        next.run(args.artifact).await
    }
}
