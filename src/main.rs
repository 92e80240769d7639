//! regviz
//!
//! Reads a regex syntax tree as JSON and writes its explaining graph as DOT.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use regviz::feedback::{CompilationFeedback, CompilationStats, ErrorReport};
use regviz::middle::dot_printer::print_dot;
use regviz::pipeline::load_pattern;
use regviz::{compile_graph, CompileOptions, Pattern};

/// Regex explaining-graph compiler
#[derive(Parser, Debug)]
#[command(name = "regviz")]
#[command(author = "Z1529")]
#[command(version = "0.1.0")]
#[command(about = "regviz - explaining graphs for regular expressions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input syntax tree (.json)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Treat the whole pattern as case-insensitive
    #[arg(long)]
    ignore_case: bool,

    /// Anchor the pattern at both ends of the string
    #[arg(long)]
    exact: bool,

    /// Skip the optimizer passes
    #[arg(long)]
    no_optimize: bool,

    /// Print a JSON compilation report to stderr
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn options(&self) -> CompileOptions {
        CompileOptions {
            ignore_case: self.ignore_case,
            exact: self.exact,
            optimize: !self.no_optimize,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a syntax tree without building the graph
    Check {
        /// Input syntax tree
        input: PathBuf,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Check { input }) => check_file(input),
        Some(Commands::Version) => {
            println!("regviz 0.1.0");
            println!("License: Apache-2.0");
            Ok(())
        }
        None => match cli.input {
            Some(ref input) => explain_file(input, &cli),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: regviz <FILE> or regviz check <FILE>");
                process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn read_pattern(input: &Path) -> Result<Pattern> {
    load_pattern(input).with_context(|| format!("loading syntax tree from {}", input.display()))
}

/// Compile a syntax tree and write its DOT text
fn explain_file(input: &Path, cli: &Cli) -> Result<()> {
    let started = Instant::now();
    let file_name = input.display().to_string();

    let compiled = read_pattern(input).and_then(|pattern| {
        compile_graph(&pattern, &cli.options())
            .with_context(|| format!("compiling {}", file_name))
    });

    let compiled = match compiled {
        Ok(compiled) => compiled,
        Err(e) => {
            if cli.json {
                let diagnostics = e
                    .downcast_ref::<regviz::Error>()
                    .map(|err| vec![ErrorReport::from_error(err, &file_name)])
                    .unwrap_or_default();
                let feedback =
                    CompilationFeedback::failure(file_name, diagnostics, CompilationStats::default());
                eprintln!("{}", feedback.to_json());
            }
            return Err(e);
        }
    };

    let dot = print_dot(&compiled.graph);
    match &cli.output {
        Some(path) => fs::write(path, &dot)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", dot),
    }

    if cli.json {
        let stats = CompilationStats {
            lowered: compiled.lowered,
            optimized: compiled.optimized,
            next_id: compiled.next_id.peek(),
            total_time_ms: started.elapsed().as_millis() as u64,
        };
        eprintln!("{}", CompilationFeedback::success(file_name, stats).to_json());
    }
    Ok(())
}

/// Check a syntax tree for errors without building the graph
fn check_file(input: &Path) -> Result<()> {
    let pattern = read_pattern(input)?;
    println!("✅ No errors found ({} branches)", pattern.branches.len());
    Ok(())
}
