use std::fs;
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;

use kocoumat::instrument::{header_extern, header_main, FileInstrument};

#[derive(Debug, Parser)]
#[command(about = "Rewrite C sources to count per-line hits and dump an LCOV trace at exit")]
struct Cli {
    #[arg(
        help = "C source files; the one defining `int main` receives the LCOV writer",
        name = "SOURCES",
        num_args(1..),
        required = true
    )]
    sources: Vec<PathBuf>,
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
    let mut files = Vec::new();

    for source in &cli.sources {
        let file_id = files.len();
        let text = match fs::read_to_string(source) {
            Ok(text) => text,
            Err(err) => {
                log::error!("error reading file {}: {err}", source.display());
                continue;
            }
        };
        match FileInstrument::new(text, source.display().to_string(), file_id) {
            Ok(file) => {
                log::info!("loaded file {}", source.display());
                files.push(file);
            }
            Err(err) => log::error!("error parsing file {}: {err}", source.display()),
        }
    }
    log::info!("loaded {} files", files.len());

    for file in &files {
        let header = if file.is_main_file {
            header_main(&files)
        } else {
            header_extern(file)
        };

        let out_path = format!("{}_instrumented_main.c", file.file_id);
        fs::write(&out_path, header + &file.render())?;
        log::info!("wrote {out_path}");
    }

    Ok(())
}
