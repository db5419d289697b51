use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use turtal::{
    analyze, encode, Machine, Program, ProgramLoader, ProgramManager, Snapshot, TurtalError,
};

/// Runs and inspects TurTaL tape-rewriting programs.
#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
#[clap(after_help = "EXAMPLES:
  turtal run programs/adder.ttl
  turtal run --example comparator --tape 65,234,.,.
  cat programs/subtractor.ttl | turtal run --trace")]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace). RUST_LOG takes precedence.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program and print the final tape
    Run(RunArgs),
    /// Report likely mistakes in a program
    Check(SourceArgs),
    /// Print a program in canonical form
    Fmt(SourceArgs),
    /// List the bundled programs
    List,
}

#[derive(Args)]
struct SourceArgs {
    /// The TurTaL program file (.ttl). Read from stdin when omitted and stdin is piped.
    file: Option<PathBuf>,

    /// Use a bundled program instead of a file
    #[clap(short, long, conflicts_with = "file")]
    example: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[clap(flatten)]
    source: SourceArgs,

    /// Replace the initial tape with these comma-separated cells
    #[clap(short, long, value_delimiter = ',')]
    tape: Option<Vec<String>>,

    /// Replace the initial state
    #[clap(short, long)]
    state: Option<String>,

    /// Print each step of the execution
    #[clap(short = 'd', long)]
    trace: bool,

    /// Output format
    #[clap(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Stop after this many steps
    #[clap(long)]
    max_steps: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::Check(args) => check(&args),
        Command::Fmt(args) => fmt(&args),
        Command::List => list(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_syntax_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Installs the log subscriber. Logs go to stderr so they never mix with tapes.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Loads a program from a file, a bundled example or stdin.
fn load(args: &SourceArgs) -> Result<Program, TurtalError> {
    if let Some(name) = &args.example {
        ProgramManager::get_program_by_name(name)
    } else if let Some(path) = &args.file {
        ProgramLoader::load_program(path)
    } else if atty::isnt(atty::Stream::Stdin) {
        ProgramLoader::load_program_from_reader(io::stdin().lock())
    } else {
        Err(TurtalError::FileError(
            "No program given: pass a file, --example, or pipe a program on stdin".to_string(),
        ))
    }
}

fn run(args: RunArgs) -> Result<ExitCode, TurtalError> {
    let program = load(&args.source)?;
    for warning in analyze(&program) {
        warn!("{}", warning);
    }

    let mut machine = Machine::new(program);
    if let Some(tape) = &args.tape {
        machine.set_tape(tape);
    }
    if let Some(state) = &args.state {
        machine.set_state(state);
    }

    if args.trace {
        print_snapshot(&Snapshot::new(0, machine.program()), args.format);
    }

    let cancel = AtomicBool::new(false);
    let mut steps = 0;
    let result = machine.run_until(&cancel, |program| {
        steps += 1;
        if args.trace {
            print_snapshot(&Snapshot::new(steps, program), args.format);
        }
        if args.max_steps.is_some_and(|max| steps >= max) {
            cancel.store(true, Ordering::Relaxed);
        }
    });

    match result {
        Ok(_) => {
            print_result(&machine, args.format);
            Ok(ExitCode::SUCCESS)
        }
        Err(TurtalError::Cancelled { steps }) => {
            print_result(&machine, args.format);
            eprintln!("Stopped after {} steps", steps);
            Ok(ExitCode::from(3))
        }
        Err(e) => Err(e),
    }
}

fn print_snapshot(snapshot: &Snapshot, format: Format) {
    match format {
        Format::Text => println!(
            "Step: {}, State: {}, Head: {}, Tape: [{}]",
            snapshot.step,
            snapshot.state,
            snapshot.head,
            snapshot.tape.join(",")
        ),
        Format::Json => match snapshot.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("failed to serialize snapshot: {}", e),
        },
    }
}

fn print_result(machine: &Machine, format: Format) {
    match format {
        Format::Text => println!("{}", machine.tape().join(",")),
        Format::Json => print_snapshot(
            &Snapshot::new(machine.step_count(), machine.program()),
            format,
        ),
    }
}

fn check(args: &SourceArgs) -> Result<ExitCode, TurtalError> {
    let program = load(args)?;
    let warnings = analyze(&program);

    if warnings.is_empty() {
        println!("No problems found");
        return Ok(ExitCode::SUCCESS);
    }

    for warning in &warnings {
        println!("warning: {}", warning);
    }
    Ok(ExitCode::FAILURE)
}

fn fmt(args: &SourceArgs) -> Result<ExitCode, TurtalError> {
    let program = load(args)?;
    println!("{}", encode(&program)?);
    Ok(ExitCode::SUCCESS)
}

fn list() -> Result<ExitCode, TurtalError> {
    for name in ProgramManager::list_program_names() {
        let info = ProgramManager::get_program_info(&name)?;
        println!(
            "{:<12} state: {:<8} tape: {}",
            info.name,
            info.initial_state,
            info.initial_tape.join(",")
        );
    }

    Ok(ExitCode::SUCCESS)
}
