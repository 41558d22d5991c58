use clap::Args;
use miette::{Context, Result};
use mrs_archive::ArchiveOptions;
use owo_colors::{OwoColorize, Stream::Stdout};
use std::path::PathBuf;

#[derive(Args)]
pub struct VerifyArgs {
    /// An input MRS file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl VerifyArgs {
    pub fn handle(&self) -> Result<()> {
        mrs_archive::verify(&self.file, &ArchiveOptions::default())
            .context(format!("verifying {}", self.file.display()))?;

        println!(
            "✅ {}",
            self.file.display().if_supports_color(Stdout, |f| f.green())
        );
        Ok(())
    }
}
