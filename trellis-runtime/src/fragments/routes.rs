use eyre::bail;
use trellis_pipeline::FragmentHelper;

use crate::{ResourceHost, ResourcePartial, Route, RouteTable};

pub const KEY: &str = "resource.routes";

/// Route table for the configured operations.
pub fn helper() -> FragmentHelper<ResourceHost> {
    FragmentHelper::<ResourceHost>::from_fn(KEY, |mut args| {
        let config = args.input.options;
        let mut routes = Vec::with_capacity(config.routes.len());
        for (method, path) in &config.routes {
            if !path.starts_with('/') {
                bail!(
                    "route for '{method}' on resource '{}' must start with '/': {path}",
                    config.name
                );
            }
            routes.push(Route {
                method: *method,
                verb: method.http_verb(),
                path: path.clone(),
            });
        }

        args.output.assign(ResourcePartial {
            routes: Some(RouteTable::new(routes)),
            ..ResourcePartial::default()
        });
        Ok(())
    })
    .depends_on([super::namespace::KEY])
}
