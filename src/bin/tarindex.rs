//! tarindex - print the name, data offset and size of each entry in a tar archive.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Seek},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;

use tarindex::{
    util::ForwardOnly,
    walker::{ArchiveWalker, WalkerConfig, DEFAULT_MAX_LONG_NAME_LEN},
    write_index,
};

/// Print one `<name> <data_offset> <size>` line per tar archive entry.
#[derive(Debug, Parser)]
#[command(name = "tarindex", version, about)]
struct Cli {
    /// Archive to index; standard input if absent or `-`.
    archive: Option<PathBuf>,

    /// Longest accepted GNU long name, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_LONG_NAME_LEN)]
    max_long_name: u64,

    /// Fail if the archive lacks its end-of-archive marker.
    #[arg(long)]
    strict: bool,

    /// Reject headers with a bad checksum.
    #[arg(long)]
    verify_checksums: bool,
}

impl Cli {
    fn config(&self) -> WalkerConfig {
        WalkerConfig {
            max_long_name_len: self.max_long_name,
            require_end_marker: self.strict,
            verify_checksums: self.verify_checksums,
        }
    }
}

fn index(reader: impl Read + Seek, config: WalkerConfig) -> Result<()> {
    let mut walker = ArchiveWalker::new(reader, config);
    let mut out = BufWriter::new(io::stdout().lock());
    write_index(&mut walker, &mut out)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.archive.as_deref() {
        None => index(ForwardOnly::new(io::stdin().lock()), config),
        Some(path) if path == Path::new("-") => index(ForwardOnly::new(io::stdin().lock()), config),
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Opening archive {}", path.display()))?;
            index(BufReader::new(file), config)
                .with_context(|| format!("Indexing {}", path.display()))
        }
    }
}
