use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use coiler::config::{BuildOptions, Overrides, WildcardPolicy};
use coiler::diagnostics::{render_error, render_warning, CoilError};
use coiler::graph::CyclePolicy;
use coiler::lookup::SearchMode;
use coiler::OutputKind;

#[derive(Parser)]
#[command(name = "coiler", version, about = "Combine a multi-file Python program into a single file")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BuildArgs {
    /// Entry-point source file
    entry: PathBuf,
    /// Module search mode: "local" (entry dir + configured paths) or "all" (adds the interpreter's sys.path)
    #[arg(short, long)]
    mode: Option<SearchMode>,
    /// Python interpreter used for sys.path discovery and compilation
    #[arg(long)]
    interpreter: Option<String>,
    /// Extra local search directory (repeatable)
    #[arg(long = "path", value_name = "DIR")]
    paths: Vec<PathBuf>,
    /// Wildcard imports: "warn", "deny" or "bind"
    #[arg(long)]
    wildcard: Option<WildcardPolicy>,
    /// Import cycles: "reject" or "break"
    #[arg(long)]
    cycles: Option<CyclePolicy>,
}

impl BuildArgs {
    fn options(&self) -> Result<BuildOptions, CoilError> {
        let overrides = Overrides {
            mode: self.mode,
            paths: self.paths.clone(),
            interpreter: self.interpreter.clone(),
            wildcard: self.wildcard,
            cycles: self.cycles,
        };
        BuildOptions::resolve(&self.entry, &overrides)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Combine and compile to bytecode (or a native executable with --embed)
    Build {
        #[command(flatten)]
        args: BuildArgs,
        /// Output path (defaults to a.pyc, a.out with --embed, a.py with --source-only)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Produce a native executable that runs the compiled program
        #[arg(long, conflicts_with = "source_only")]
        embed: bool,
        /// Write the combined source instead of compiling it
        #[arg(long)]
        source_only: bool,
    },
    /// Write only the combined source
    Combine {
        #[command(flatten)]
        args: BuildArgs,
        /// Output path. If omitted, prints to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show emission order, external imports and renamed symbols
    Graph {
        #[command(flatten)]
        args: BuildArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("coiler={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn fail(err: &CoilError) -> ! {
    render_error(err);
    std::process::exit(1);
}

fn render_warnings(combined: &coiler::Combined) {
    for diagnostic in &combined.context.diagnostics {
        render_warning(diagnostic);
    }
}

fn combine(args: &BuildArgs, options: &BuildOptions) -> coiler::Combined {
    let combined = coiler::combine_file(&args.entry, options).unwrap_or_else(|err| fail(&err));
    render_warnings(&combined);
    combined
}

fn default_output(kind: OutputKind) -> &'static Path {
    match kind {
        OutputKind::Bytecode => Path::new("a.pyc"),
        OutputKind::Executable => Path::new("a.out"),
        OutputKind::Source => Path::new("a.py"),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build { args, output, embed, source_only } => {
            let kind = if embed {
                OutputKind::Executable
            } else if source_only {
                OutputKind::Source
            } else {
                OutputKind::Bytecode
            };
            let output = output.unwrap_or_else(|| default_output(kind).to_path_buf());

            let options = args.options().unwrap_or_else(|err| fail(&err));
            let combined = coiler::build_file(&args.entry, &output, &options, kind).unwrap_or_else(|err| fail(&err));
            render_warnings(&combined);
            eprintln!(
                "combined {} module(s) into {}",
                combined.context.graph.len(),
                output.display()
            );
        }
        Commands::Combine { args, output } => {
            let options = args.options().unwrap_or_else(|err| fail(&err));
            let combined = combine(&args, &options);
            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, &combined.source) {
                        fail(&CoilError::io(format!("could not write '{}': {e}", path.display()), path));
                    }
                }
                None => print!("{}", combined.source),
            }
        }
        Commands::Graph { args, json } => {
            let options = args.options().unwrap_or_else(|err| fail(&err));
            let report = combine(&args, &options).report();
            if json {
                match report.to_json() {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        eprintln!("error: failed to serialize report: {e}");
                        std::process::exit(1);
                    }
                }
            } else {
                print!("{}", report.render_text());
            }
        }
    }
}
