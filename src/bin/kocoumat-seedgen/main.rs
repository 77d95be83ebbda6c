use std::fs;
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;

use kocoumat::seedgen::SeedGenerator;

#[derive(Debug, Parser)]
#[command(about = "Extract literals from C sources into an initial seed corpus")]
struct Cli {
    #[arg(help = "Directory scanned for *.c and *.h files", name = "SRC_DIR", required = true)]
    src_dir: PathBuf,

    #[arg(help = "Directory the seed files are written to", name = "OUT_DIR", required = true)]
    out_dir: PathBuf,
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            exit(1);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("ERROR: {err}");
        exit(1);
    }
}

fn run(cli: Cli) -> kocoumat::Result<()> {
    if !cli.src_dir.is_dir() {
        return Err(kocoumat::Error::MissingDir(cli.src_dir));
    }

    log::info!(
        "creating seeds from constants in {} into {}",
        cli.src_dir.display(),
        cli.out_dir.display()
    );

    let mut generator = SeedGenerator::new();
    for entry in fs::read_dir(&cli.src_dir)? {
        let path = entry?.path();
        let is_c_source = path
            .extension()
            .is_some_and(|ext| ext == "c" || ext == "h");
        if !path.is_file() || !is_c_source {
            continue;
        }

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                log::error!("error reading file {}: {err}", path.display());
                continue;
            }
        };
        match generator.parse_source(&text) {
            Ok(()) => log::info!("loaded file {}", path.display()),
            Err(err) => log::error!("error parsing file {}: {err}", path.display()),
        }
    }

    generator.create_seeds(&cli.out_dir)?;
    Ok(())
}
