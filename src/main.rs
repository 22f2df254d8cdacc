//! Blitz3D Dialect Compiler CLI
//!
//! The `blitzc` command tokenizes, parses, compiles, builds and runs
//! Blitz source files.

use blitzc::{lexer, BuildConfig, OptLevel, RuntimeBindings};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "blitzc")]
#[command(version = blitzc::VERSION)]
#[command(about = "A Blitz3D dialect compiler", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize a file and print tokens
    Tokenize {
        /// Input file to tokenize
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Parse a file and print the AST
    Parse {
        /// Input file to parse
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the LLVM IR of a file
    Ir {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Run the optimization pipeline first
        #[arg(long)]
        optimize: bool,

        /// Optimization level (0-3)
        #[arg(short = 'O', long, default_value = "2")]
        opt_level: u8,
    },

    /// Print the host assembly of a file
    Asm {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Optimization level (0-3)
        #[arg(short = 'O', long, default_value = "2")]
        opt_level: u8,
    },

    /// Compile a file to a native executable
    Build {
        /// Input file to compile
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Optimization level (0-3)
        #[arg(short = 'O', long, default_value = "2")]
        opt_level: u8,

        /// Build the runtime without optimization and with debug info
        #[arg(long)]
        debug: bool,

        /// C compiler to use
        #[arg(long, value_name = "PATH")]
        cc: Option<PathBuf>,
    },

    /// Run a file in the JIT
    Run {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Optimization level (0-3)
        #[arg(short = 'O', long, default_value = "2")]
        opt_level: u8,

        /// Resolve the runtime from these shared libraries
        #[arg(long = "lib", value_name = "PATH")]
        libraries: Vec<PathBuf>,
    },
}

fn read_source(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tokenize { input } => {
            let source = read_source(&input)?;
            let (tokens, errors) = lexer::lex(&source);

            for token in &tokens {
                println!(
                    "{:>4}:{:<4} {:10} {:?}",
                    token.line,
                    token.column,
                    token.kind.to_string(),
                    token.text
                );
            }

            if !errors.is_empty() {
                for err in &errors {
                    eprintln!("{err}");
                }
                return Err(miette::miette!("Found {} lexical error(s)", errors.len()));
            }
            Ok(())
        }

        Commands::Parse { input } => {
            let source = read_source(&input)?;
            let program = blitzc::parse(&source).map_err(|e| miette::miette!("{e}"))?;
            println!("{program}");
            Ok(())
        }

        Commands::Ir {
            input,
            optimize,
            opt_level,
        } => {
            let source = read_source(&input)?;
            let level = optimize.then(|| OptLevel::from_level(opt_level));
            let ir = blitzc::emit_ir(&source, level).map_err(|e| miette::miette!("{e}"))?;
            print!("{ir}");
            Ok(())
        }

        Commands::Asm { input, opt_level } => {
            let source = read_source(&input)?;
            let asm = blitzc::emit_assembly(&source, OptLevel::from_level(opt_level))
                .map_err(|e| miette::miette!("{e}"))?;
            print!("{asm}");
            Ok(())
        }

        Commands::Build {
            input,
            output,
            opt_level,
            debug,
            cc,
        } => {
            let source = read_source(&input)?;
            let out_path = output.unwrap_or_else(|| input.with_extension(""));
            let config = BuildConfig {
                opt_level: OptLevel::from_level(opt_level),
                debug,
                compiler: cc,
            };

            blitzc::build_native(&source, &out_path, &config)
                .map_err(|e| miette::miette!("Build failed: {e}"))?;
            println!("Successfully compiled to: {}", out_path.display());
            Ok(())
        }

        Commands::Run {
            input,
            opt_level,
            libraries,
        } => {
            let source = read_source(&input)?;
            let bindings = if libraries.is_empty() {
                RuntimeBindings::default()
            } else {
                RuntimeBindings::libraries(libraries)
            };
            blitzc::run_jit(&source, OptLevel::from_level(opt_level), &bindings)
                .map_err(|e| miette::miette!("{e}"))?;
            Ok(())
        }
    }
}
