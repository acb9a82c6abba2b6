use eyre::bail;
use trellis_core::is_slug;
use trellis_pipeline::FragmentHelper;

use crate::{ResourceHost, ResourcePartial};

pub const KEY: &str = "resource.namespace.resolve";

fn is_resource_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Namespace, resource name and the store key derived from both.
pub fn helper() -> FragmentHelper<ResourceHost> {
    FragmentHelper::<ResourceHost>::from_fn(KEY, |mut args| {
        let config = args.input.options;
        let namespace = config
            .namespace
            .clone()
            .unwrap_or_else(|| args.context.shared.namespace.clone());

        if !is_slug(&namespace) {
            bail!("invalid namespace '{namespace}': expected a lowercase slug like 'acme-blog'");
        }
        if !is_resource_name(&config.name) {
            bail!(
                "invalid resource name '{}': use letters, digits, '_' or '-'",
                config.name
            );
        }

        let store_key = format!("{namespace}/{}", config.name);
        args.reporter.debug(format_args!("store key {store_key}"));
        args.output.assign(ResourcePartial {
            namespace: Some(namespace),
            name: Some(config.name.clone()),
            store_key: Some(store_key),
            ..ResourcePartial::default()
        });
        Ok(())
    })
    .overriding()
    .origin("trellis-runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_names() {
        assert!(is_resource_name("post"));
        assert!(is_resource_name("blog_post-v2"));
        assert!(!is_resource_name(""));
        assert!(!is_resource_name("blog post"));
        assert!(!is_resource_name("acme/post"));
    }
}
