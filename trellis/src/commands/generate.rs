use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use trellis_codegen::GenerateOptions;
use trellis_config::Config;

use super::UnwrapOrExit;
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct GenerateCommand {
    /// Path to trellis.toml (defaults to ./trellis.toml)
    #[arg(short, long, default_value = "trellis.toml")]
    pub config: PathBuf,

    /// Output directory (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Report what would be written without touching the disk
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the final IR to .trellis/debug/ir.json
    #[arg(long)]
    pub snapshot: bool,
}

impl GenerateCommand {
    pub async fn run(&self) -> Result<()> {
        let config = Config::from_file(&self.config).unwrap_or_exit();
        let options = GenerateOptions::new(&self.output)
            .source_path(&self.config)
            .dry_run(self.dry_run)
            .snapshot(self.snapshot);

        let report = ops::generate(config, options).await?;
        report.render(&mut TerminalOutput::new());
        Ok(())
    }
}
