//! Fragments that assemble a [`ResourceDraft`](crate::ResourceDraft).

pub mod cache_keys;
pub mod namespace;
pub mod routes;

use trellis_pipeline::FragmentHelper;

use crate::ResourceHost;

pub fn all() -> Vec<FragmentHelper<ResourceHost>> {
    vec![namespace::helper(), routes::helper(), cache_keys::helper()]
}
