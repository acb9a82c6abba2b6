use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use trellis_config::Config;

use super::UnwrapOrExit;
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct PlanCommand {
    /// Path to trellis.toml (defaults to ./trellis.toml)
    #[arg(short, long, default_value = "trellis.toml")]
    pub config: PathBuf,
}

impl PlanCommand {
    pub fn run(&self) -> Result<()> {
        // Only validated here; the plan does not depend on the contents.
        let _config = Config::from_file(&self.config).unwrap_or_exit();
        let report = ops::plan(&self.config)?;
        report.render(&mut TerminalOutput::new());
        Ok(())
    }
}
