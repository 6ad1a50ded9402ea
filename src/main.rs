//==================================================
// File: main.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Orrery CLI entry point
// Objective: Run, compile and dump program images with configuration,
//            tracing and debugger options
//==================================================

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use orrery::image::loader::{read_image, write_image};
use orrery::{EngineConfig, Interpreter, StdinDebugger};

#[derive(Parser, Debug)]
#[command(name = "orrery", about = "Orrery array-language engine")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a program image (.json or .evb).
    Run(RunArgs),
    /// Compile a JSON image into the binary .evb form.
    Compile(CompileArgs),
    /// Print an image as pretty JSON.
    Dump(DumpArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Image to execute.
    pub image: PathBuf,

    /// Log every statement as it runs.
    #[arg(long)]
    pub trace: bool,

    /// Maximum call nesting before a call is refused.
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Configuration file (TOML); defaults to the user config when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extra directory searched for includes and deferred routines.
    #[arg(short = 'I', long = "include")]
    pub include: Vec<PathBuf>,

    /// Pause before the first statement.
    #[arg(long)]
    pub step: bool,

    /// Pause before the statement on this line.
    #[arg(long = "break")]
    pub breakpoints: Vec<u32>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CompileArgs {
    /// Input JSON image.
    pub input: PathBuf,
    /// Output .evb image.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DumpArgs {
    pub image: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let verbose = matches!(&args.command, Command::Run(run) if run.trace);
    orrery::logging::init(verbose);
    match dispatch(args.command) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn dispatch(command: Command) -> Result<ExitCode> {
    match command {
        Command::Run(run) => run_image(run),
        Command::Compile(args) => {
            let image = read_image(&args.input)?;
            write_image(&args.output, &image)?;
            info!(input = %args.input.display(), output = %args.output.display(), "compiled image");
            Ok(ExitCode::SUCCESS)
        }
        Command::Dump(args) => {
            let image = read_image(&args.image)?;
            println!("{}", serde_json::to_string_pretty(&image)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_image(run: RunArgs) -> Result<ExitCode> {
    let mut config = EngineConfig::load(run.config.as_deref())?;
    if run.trace {
        config = config.with_trace(true);
    }
    if let Some(depth) = run.max_depth {
        config = config.with_max_depth(depth);
    }
    if let Some(parent) = run.image.parent() {
        config = config.with_include_path(parent.to_path_buf());
    }
    for path in &run.include {
        config = config.with_include_path(path.clone());
    }
    let stack_bytes = config.stack_bytes;

    // Deep recursion in scripts maps onto the native stack.
    let worker = std::thread::Builder::new()
        .name("orrery-main".into())
        .stack_size(stack_bytes)
        .spawn(move || -> Result<ExitCode> {
            let mut interpreter = Interpreter::new(config);
            if run.step || !run.breakpoints.is_empty() {
                interpreter.set_debug_hook(Box::new(StdinDebugger));
                for line in &run.breakpoints {
                    interpreter.add_breakpoint(*line);
                }
                if run.step {
                    interpreter.start_stepping();
                }
            }
            let report = interpreter
                .run_file(&run.image)
                .with_context(|| format!("running {}", run.image.display()))?;
            for error in &report.errors {
                eprintln!("{error}");
            }
            info!(
                statements = report.statements,
                errors = report.errors.len(),
                returned_all = report.returned_all,
                "run finished"
            );
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        })
        .context("starting interpreter thread")?;
    worker
        .join()
        .map_err(|_| anyhow!("interpreter thread panicked"))?
}

//==================================================
// End of file
//==================================================
