use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use blockfs::{image, FileSystem, FsError, Shell, DEFAULT_BLOCK_SIZE};

/// A single-user block filesystem kept in one image file.
#[derive(Parser)]
#[command(name = "blockfs")]
#[command(about = "Mount a block filesystem image and work on it interactively")]
struct Args {
    /// Image file holding the filesystem
    #[arg(short, long, default_value = "blockfs.img")]
    image: PathBuf,

    /// Number of blocks when creating a fresh image
    #[arg(short, long, default_value_t = 4096)]
    blocks: usize,
}

fn main() {
    let args = Args::parse();

    let fs = match image::load(&args.image) {
        Ok(fs) => {
            println!("mounted {}", args.image.display());
            fs
        }
        Err(FsError::ImageMissing(_)) => {
            println!(
                "no image at {}, starting a fresh filesystem ({} blocks)",
                args.image.display(),
                args.blocks
            );
            FileSystem::new(args.blocks, DEFAULT_BLOCK_SIZE)
        }
        // A broken image is the one condition that refuses to start: better
        // to stop than to overwrite it on the first checkpoint.
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut shell = Shell::new(fs, args.image, stdin.lock(), stdout.lock());
    if let Err(e) = shell.run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}
