use clap::Parser;
use log::{info, LevelFilter};
use lua_rs::{Error, Result};
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process,
};

/// Interpreter for a small Lua-like scripting language.
///
/// Runs FILE by default. `--dump-ast` prints the parsed tree instead and
/// `--compile` writes 32-bit NASM assembly for the integer subset.
#[derive(Parser)]
#[command(name = "lua-rs")]
#[command(version)]
struct Cli {
    /// Path to the source file
    file: PathBuf,

    /// Print the parsed syntax tree instead of running the program
    #[arg(long, conflicts_with = "compile")]
    dump_ast: bool,

    /// Compile to NASM assembly instead of running the program
    #[arg(long, short = 'c')]
    compile: bool,

    /// Where to write the assembly (defaults to FILE with an .asm extension)
    #[arg(long, short = 'o', requires = "compile")]
    output: Option<PathBuf>,

    /// Log more to stderr (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => exit_with(Error::usage(e.to_string().trim_end())),
    };

    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        exit_with(e);
    }
}

fn exit_with(e: Error) -> ! {
    let _ = io::stdout().flush();
    eprintln!("ERROR: {}", e);
    process::exit(1);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.file)
        .map_err(|e| Error::usage(format!("Cannot read '{}': {}.", cli.file.display(), e)))?;
    info!("loaded {} ({} bytes)", cli.file.display(), source.len());

    if cli.dump_ast {
        println!("{}", lua_rs::dump_ast(&source)?);
    } else if cli.compile {
        let asm = lua_rs::compile(&source)?;
        let output = cli.output.clone().unwrap_or_else(|| cli.file.with_extension("asm"));
        fs::write(&output, asm)
            .map_err(|e| Error::usage(format!("Cannot write '{}': {}.", output.display(), e)))?;
        info!("wrote {}", output.display());
    } else {
        let stdin = io::stdin();
        lua_rs::run(&source, io::stdout().lock(), stdin.lock())?;
    }

    Ok(())
}
