//! Code generation for Trellis projects.
//!
//! A generation run is a [`trellis_pipeline::Pipeline`] configured by
//! [`CodegenHost`]:
//!
//! - [`fragments`] turn a [`Config`](trellis_config::Config) into a
//!   [`ProjectIr`](trellis_ir::ProjectIr).
//! - [`builders`] render PHP controllers, TypeScript clients and a manifest
//!   into a transactional [`Workspace`](trellis_core::Workspace).
//! - [`extensions`] commit or discard the workspace and optionally write an
//!   IR snapshot.

pub mod builder;
pub mod builders;
pub mod extensions;
pub mod fragments;
mod generate;
mod host;

pub use generate::{generate, generate_with, pipeline};
pub use host::{
    CodegenContext, CodegenHost, CodegenRun, GenerateOptions, GenerationReport, OutputLayout,
    Phase,
};
