//! Core operations.
//!
//! The logic behind each command, separated from argument parsing and
//! output rendering.

pub mod check;
pub mod generate;
pub mod plan;

pub use check::check;
pub use generate::generate;
pub use plan::plan;
