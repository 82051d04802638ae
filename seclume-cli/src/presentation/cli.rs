use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Seclume: password-based encrypted file archiver", long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AlgoArg {
    Zlib,
    Lzma,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack files into a .slm archive
    Pack {
        /// output archive path
        archive: PathBuf,
        /// files or directories to pack (directories recurse)
        inputs: Vec<PathBuf>,

        /// compression algorithm
        #[arg(long, value_enum, default_value = "lzma")]
        algo: AlgoArg,

        /// compression level (0-9)
        #[arg(long, default_value_t = 6)]
        level: u8,

        /// default extraction directory, stored encrypted in the archive
        #[arg(long)]
        outdir: Option<String>,

        /// overwrite an existing archive
        #[arg(short, long)]
        force: bool,

        /// skip files whose name matches a glob pattern (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// skip the password strength check
        #[arg(long)]
        weak_password: bool,

        /// password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Extract an archive
    Extract {
        archive: PathBuf,

        /// extraction directory (overrides the one stored in the archive)
        #[arg(long)]
        outdir: Option<String>,

        /// overwrite existing output files
        #[arg(short, long)]
        force: bool,

        /// password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// List archive contents
    List {
        archive: PathBuf,

        /// password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}
