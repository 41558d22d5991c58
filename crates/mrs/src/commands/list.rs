use clap::Args;
use miette::{Context, Result};
use mrs_archive::ArchiveOptions;
use owo_colors::{OwoColorize, Stream::Stdout};
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input MRS file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let listing = mrs_archive::list(&self.file, &ArchiveOptions::default())
            .context(format!("reading {}", self.file.display()))?;

        let count = listing.len();
        let mut total = 0u64;
        for entry in listing {
            total += entry.size;
            println!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02} {:>10} {:>10} {:08x} {}",
                entry.modified.year(),
                entry.modified.month(),
                entry.modified.day(),
                entry.modified.hour(),
                entry.modified.minute(),
                entry.modified.second(),
                entry.size,
                entry.compressed_size,
                entry.crc32,
                entry.name.if_supports_color(Stdout, |name| name.green()),
            );
        }

        println!(
            "{}",
            format!("{count} entries, {total} bytes").if_supports_color(Stdout, |s| s.bold())
        );
        Ok(())
    }
}
