//! Core utilities and types for the Trellis toolchain.
//!
//! This crate provides the transactional file workspace generated output is
//! staged in, and the string helpers shared by the generators.

mod file;
mod utils;
mod workspace;

// File operations
pub use file::{File, FileRules, Overwrite, WriteResult};
// String utilities
pub use utils::{is_slug, to_camel_case, to_kebab_case, to_pascal_case, to_snake_case};
pub use workspace::{FileManifest, Workspace};
