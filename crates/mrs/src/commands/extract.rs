use clap::Args;
use miette::{miette, Context, Result};
use mrs_archive::{ArchiveOptions, ProgressEvent};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input MRS file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory, defaults to the file name without its extension
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Allow writing into an existing directory
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let target = self
            .directory
            .clone()
            .unwrap_or_else(|| self.file.with_extension(""));
        if target.exists() && !self.overwrite {
            return Err(miette!(
                "{} already exists, pass --overwrite to write into it",
                target.display()
            ));
        }

        let mut failed = 0usize;
        mrs_archive::decompile(
            &self.file,
            Some(&target),
            &ArchiveOptions::default(),
            |progress| match progress.event {
                ProgressEvent::Begin(name) => info!("writing {}", name),
                ProgressEvent::Error(code) => {
                    failed += 1;
                    warn!("entry {} of {} skipped: {}", progress.index, progress.total, code);
                }
                ProgressEvent::End(_) | ProgressEvent::Done => {}
            },
        )
        .context(format!("extracting {}", self.file.display()))?;

        if failed > 0 {
            return Err(miette!("{} entries could not be extracted", failed));
        }

        info!("extracted to {}", target.display());
        Ok(())
    }
}
