pub mod extract;
pub mod list;
pub mod pack;
pub mod verify;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Pack a directory into an MRS file
    Pack(pack::PackArgs),
    /// Extract an MRS file into a directory
    Extract(extract::ExtractArgs),
    /// List the entries of an MRS file
    List(list::ListArgs),
    /// Check that a file is a readable MRS archive
    Verify(verify::VerifyArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Pack(pack) => pack.handle(),
            Commands::Extract(extract) => extract.handle(),
            Commands::List(list) => list.handle(),
            Commands::Verify(verify) => verify.handle(),
        }
    }
}
