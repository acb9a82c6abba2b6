//! Builders that turn a finalized definition into a resource and queue the
//! side effects of defining it.

pub mod object;
pub mod registry;

use trellis_pipeline::BuilderHelper;

use crate::ResourceHost;

pub fn all() -> Vec<BuilderHelper<ResourceHost>> {
    vec![object::helper(), registry::helper()]
}
