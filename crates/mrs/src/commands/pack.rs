use clap::Args;
use miette::{miette, Context, Result};
use mrs_archive::{archive::Storage, ArchiveOptions, ProgressEvent};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args)]
pub struct PackArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target MRS file, defaults to the directory name with an .mrs extension
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Deflate level, 0 to 9
    #[arg(short, long, default_value_t = 9, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: u32,

    /// Keep payloads in memory instead of a temporary file
    #[arg(long, default_value_t = false)]
    in_memory: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        let file = self
            .file
            .clone()
            .unwrap_or_else(|| mrs_archive::write::compiled_path(&self.directory));
        if file.exists() && !self.overwrite {
            return Err(miette!(
                "{} already exists, pass --overwrite to replace it",
                file.display()
            ));
        }

        let options = ArchiveOptions::builder()
            .compression_level(self.level)
            .storage(if self.in_memory {
                Storage::Memory
            } else {
                Storage::TempFile
            })
            .build();

        let written = mrs_archive::compile(
            &self.directory,
            Some(&file),
            &options,
            |progress| match progress.event {
                ProgressEvent::Begin(name) => info!("packing {}", name),
                ProgressEvent::Error(code) => warn!("entry {} failed: {}", progress.index, code),
                ProgressEvent::End(_) | ProgressEvent::Done => {}
            },
        )
        .context(format!("packing {}", self.directory.display()))?;

        info!("created {}", written.display());
        Ok(())
    }
}
