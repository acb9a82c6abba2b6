//! Report data structures for commands.
//!
//! Commands build reports, then render them to an [`Output`] target.

mod check;
mod generate;
mod output;
mod plan;

pub use check::CheckReport;
pub use generate::GenerateReport;
pub use output::{Report, TerminalOutput};
pub use plan::{PlanReport, PlannedHelper};

#[cfg(test)]
pub use output::BufferOutput;
