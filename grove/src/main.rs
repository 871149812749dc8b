use clap::{Args, Parser, Subcommand};
use grove_compiler::config::DEFAULT_SCRIPT_EXTENSION;
use grove_compiler::{
    compile_sources, CompilationUnit, CompilerConfiguration, JointCompilationOptions, Phase,
};
use grove_runtime::{Runtime, RuntimeConfig};
use miette::{Diagnostic, IntoDiagnostic, MietteHandlerOpts, Report, Result};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

mod outline;

/// Interpreted calls recurse on the Rust stack
const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Source name used for programs read from stdin
const STDIN_SOURCE: &str = "Script.grove";

#[derive(Parser)]
#[command(
    name = "grove",
    version,
    about = "The Grove programming language toolchain",
    long_about = "Grove is a dynamic, class-based scripting language compiled to class records and run on a meta-object protocol."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse Grove source files and display their AST (debug only)
    Parse {
        /// Grove source files to parse (use '-' to read from stdin)
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Print the full AST, spans included
        #[arg(short, long)]
        spans: bool,
    },

    /// Compile Grove source files to class records
    Compile(CompileArgs),

    /// Compile a Grove program in memory and run it
    Run(RunArgs),
}

#[derive(Args)]
struct CompileArgs {
    /// Directory the class records are written to
    #[arg(short = 'd', value_name = "DIR")]
    target: Option<PathBuf>,

    /// Source roots searched for classes the given files do not define
    #[arg(long, value_name = "PATH")]
    classpath: Option<String>,

    /// Source encoding
    #[arg(long, value_name = "ENCODING")]
    encoding: Option<String>,

    /// Errors after which compilation stops at once (0 for no limit)
    #[arg(long, value_name = "N")]
    tolerance: Option<usize>,

    /// Joint compilation
    #[arg(short = 'j', long = "joint")]
    joint: bool,

    /// Flag passed to the joint compiler
    #[arg(short = 'F', value_name = "FLAG", requires = "joint")]
    flags: Vec<String>,

    /// Named value passed to the joint compiler
    #[arg(short = 'J', value_name = "NAME=VALUE", value_parser = parse_named_value, requires = "joint")]
    named_values: Vec<(String, String)>,

    /// Where joint compilation stubs go
    #[arg(long, value_name = "DIR", requires = "joint")]
    stub_dir: Option<PathBuf>,

    /// Report every generated class
    #[arg(short, long)]
    verbose: bool,

    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    /// Re-specialisations after which a call site stops caching
    #[arg(long, value_name = "N")]
    megamorphic_threshold: Option<usize>,

    /// Deepest allowed chain of Grove calls
    #[arg(long, value_name = "N")]
    max_call_depth: Option<usize>,

    /// Program to run (use '-' to read from stdin)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Arguments handed to main
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    args: Vec<String>,
}

#[derive(Error, Diagnostic, Debug)]
enum CliError {
    #[error("File not found: {}", .0.display())]
    #[diagnostic(code(grove::cli::not_found))]
    NotFound(PathBuf),

    #[error("Expected a .grove file, got: {}", .0.display())]
    #[diagnostic(code(grove::cli::extension))]
    WrongExtension(PathBuf),

    #[error("Parsing {file} failed with {count} error(s)")]
    #[diagnostic(code(grove::cli::parse_failed))]
    ParseFailed { file: String, count: usize },

    #[error("Nothing to run in {}", .0.display())]
    #[diagnostic(
        code(grove::cli::no_entry_point),
        help("Add top-level statements or a class with a static main method")
    )]
    NoEntryPoint(PathBuf),
}

fn main() -> ExitCode {
    setup_tracing();
    setup_miette_handler();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        // No subcommand provided, show help
        Cli::parse_from(["grove", "--help"]);
        return ExitCode::SUCCESS;
    };

    let worker = thread::Builder::new()
        .name("grove".to_string())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || execute(command));
    match worker {
        Ok(handle) => handle.join().unwrap_or(ExitCode::FAILURE),
        Err(error) => {
            eprintln!("{:?}", Report::msg(format!("Cannot start the worker thread: {error}")));
            ExitCode::FAILURE
        }
    }
}

/// `GROVE_LOG` takes an `EnvFilter` directive; `GROVE_LOG_STYLE=full` adds timestamps and span timing
fn setup_tracing() {
    let Ok(filter) = EnvFilter::try_from_env("GROVE_LOG") else {
        return;
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr);
    if std::env::var("GROVE_LOG_STYLE").is_ok_and(|style| style == "full") {
        builder
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .init();
    } else {
        builder.without_time().compact().init();
    }
    tracing::debug!("tracing initialized");
}

fn setup_miette_handler() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .tab_width(4)
                .with_cause_chain()
                .build(),
        )
    }))
    .ok();
}

fn execute(command: Commands) -> ExitCode {
    match command {
        Commands::Parse { files, spans } => handle_parse_command(files, spans),
        Commands::Compile(args) => report(handle_compile_command(args)),
        Commands::Run(args) => report(handle_run_command(args)),
    }
}

fn report(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:?}");
            ExitCode::FAILURE
        }
    }
}

fn handle_parse_command(files: Vec<PathBuf>, spans: bool) -> ExitCode {
    let mut success = true;
    for file_path in files {
        if let Err(error) = parse_single_file(&file_path, spans) {
            eprintln!("{error:?}");
            success = false;
        }
    }
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn parse_single_file(file_path: &Path, spans: bool) -> Result<()> {
    let (source, source_name) = read_source(file_path)?;
    let output = grove_parser::parse_module(&source, &source_name)?;

    if !output.errors.is_empty() {
        let count = output.errors.len();
        for error in output.errors {
            eprintln!("{:?}", Report::new(error));
        }
        return Err(CliError::ParseFailed {
            file: source_name,
            count,
        }
        .into());
    }

    if spans {
        println!("{:#?}", output.module);
    } else {
        println!("{}", outline::format_module(&output.module));
    }
    Ok(())
}

fn handle_compile_command(args: CompileArgs) -> Result<()> {
    let mut config = CompilerConfiguration::default();
    if let Some(target) = args.target {
        config = config.with_target_directory(target);
    }
    if let Some(classpath) = &args.classpath {
        config = config.with_classpath(std::env::split_paths(classpath).filter(|p| !p.as_os_str().is_empty()));
    }
    if let Some(encoding) = &args.encoding {
        config.set_source_encoding(encoding)?;
    }
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    config.verbose = args.verbose;
    if args.joint {
        config.joint_compilation = Some(JointCompilationOptions {
            named_values: args.named_values.into_iter().collect(),
            flags: args.flags,
            stub_dir: args.stub_dir,
        });
    }

    let mut unit = CompilationUnit::new(config);
    if args.verbose {
        unit.set_progress_callback(|source, phase| eprintln!("{}: {phase}", source.name()));
    }
    for file in &args.files {
        check_source_file(file)?;
        unit.add_file(file);
    }
    let result = unit.compile(Phase::Output);
    for warning in unit.errors().warnings() {
        eprintln!("{warning}");
    }
    result?;

    if args.verbose {
        for class in unit.generated_classes() {
            println!("{} ({} bytes)", class.name, class.bytes.len());
        }
    }
    Ok(())
}

fn handle_run_command(args: RunArgs) -> Result<()> {
    let (source, source_name) = read_source(&args.file)?;
    let generated = compile_sources(
        CompilerConfiguration::default(),
        [(source_name.as_str(), source.as_str())],
    )?;

    let mut config = RuntimeConfig::default();
    if let Some(threshold) = args.megamorphic_threshold {
        config = config.with_megamorphic_threshold(threshold);
    }
    if let Some(depth) = args.max_call_depth {
        config = config.with_max_call_depth(depth);
    }
    let runtime = Runtime::new(config)?;
    let classes = runtime.define_classes(&generated)?;
    let entry = runtime
        .entry_point(&classes)
        .ok_or_else(|| CliError::NoEntryPoint(args.file.clone()))?;
    tracing::debug!(class = %entry.name, "entry point");
    runtime.run_main(&entry.name, &args.args)?;
    Ok(())
}

/// Reads a source file, or stdin for `-`
fn read_source(file_path: &Path) -> Result<(String, String)> {
    if file_path.to_str() == Some("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).into_diagnostic()?;
        return Ok((buffer, STDIN_SOURCE.to_string()));
    }
    check_source_file(file_path)?;
    let source = fs::read_to_string(file_path).into_diagnostic()?;
    let name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.display().to_string());
    Ok((source, name))
}

fn check_source_file(file_path: &Path) -> Result<(), CliError> {
    if !file_path.exists() {
        return Err(CliError::NotFound(file_path.to_path_buf()));
    }
    if file_path.extension().and_then(|s| s.to_str()) != Some(DEFAULT_SCRIPT_EXTENSION) {
        return Err(CliError::WrongExtension(file_path.to_path_buf()));
    }
    Ok(())
}

/// `-J name=value`
fn parse_named_value(text: &str) -> Result<(String, String), String> {
    text.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{text}'"))
}
