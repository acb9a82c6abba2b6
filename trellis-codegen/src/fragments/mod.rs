//! Fragments that assemble the [`ProjectIr`](trellis_ir::ProjectIr).
//!
//! | Key | Depends on |
//! |---|---|
//! | `ir.meta` (override) | |
//! | `ir.collection` | `ir.meta` |
//! | `ir.capability-map` | `ir.collection` |
//! | `ir.validation` | `ir.capability-map` |

pub mod capability;
pub mod collection;
pub mod meta;
pub mod validation;

use trellis_pipeline::FragmentHelper;

use crate::CodegenHost;

/// The built-in fragments, in registration order.
pub fn all() -> Vec<FragmentHelper<CodegenHost>> {
    vec![
        meta::helper(),
        collection::helper(),
        capability::helper(),
        validation::helper(),
    ]
}
