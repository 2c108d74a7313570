use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::exit;

use clap::Parser as ClapParser;

use simplec::compiler;
use simplec::diagnostic::SyntaxError;

/// Command-line arguments for the Simple C compiler.
#[derive(ClapParser)]
#[command(version, about = "Compile Simple C to 32-bit x86 assembly", long_about = None)]
struct Cli {
    /// The input file; standard input when omitted
    input: Option<PathBuf>,

    /// Output file; standard output when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Syntax(#[from] SyntaxError),
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli) {
        eprintln!("{err}");
        exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    // Semantic errors have already been written to stderr; they
    // suppress code generation but are not fatal.
    let output = compiler::compile(&source)?;

    match &cli.output {
        Some(path) => fs::write(path, output.assembly)?,
        None => io::stdout().write_all(output.assembly.as_bytes())?,
    }

    Ok(())
}
