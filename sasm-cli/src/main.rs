use clap::{Parser, ValueEnum};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Assembles and links SArch32 source files into an object file.
#[derive(Parser)]
#[command(name = "sasm", version, about)]
struct Opts {
    /// Input source file; may be given more than once.
    #[arg(short = 'i', long = "input", value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Linker script consumed before the input files.
    #[arg(short = 'l', long = "linker", value_name = "LINKER")]
    linker: PathBuf,

    /// Path the linked object file is written to.
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: PathBuf,

    /// Log verbosity. clap's long-flag convention renders this `--ll`
    /// rather than the single-dash `-ll` the interface names; the CLI
    /// surface is carried as ambient tooling, not a redesigned one.
    #[arg(long = "ll", value_enum, default_value_t = LogLevel::None)]
    log_level: LogLevel,
}

#[derive(Copy, Clone, ValueEnum)]
enum LogLevel {
    None,
    Basic,
    Extended,
    Full,
}

impl LogLevel {
    fn filter(self) -> log::LevelFilter {
        match self {
            LogLevel::None => log::LevelFilter::Off,
            LogLevel::Basic => log::LevelFilter::Info,
            LogLevel::Extended => log::LevelFilter::Debug,
            LogLevel::Full => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, source: std::io::Error },
    Assemble(sasm::AssembleError),
    ObjectFile(sobjfile::ObjectFileError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            CliError::Assemble(err) => write!(f, "{}", err),
            CliError::ObjectFile(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<sasm::AssembleError> for CliError {
    fn from(err: sasm::AssembleError) -> CliError {
        CliError::Assemble(err)
    }
}

impl From<sobjfile::ObjectFileError> for CliError {
    fn from(err: sobjfile::ObjectFileError) -> CliError {
        CliError::ObjectFile(err)
    }
}

fn main() -> ExitCode {
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(1);
        }
    };

    env_logger::Builder::new()
        .filter_level(opts.log_level.filter())
        .init();

    match run(&opts) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            log::error!("{}", err);
            eprintln!("{}", err);
            ExitCode::from(2)
        }
    }
}

fn run(opts: &Opts) -> Result<(), CliError> {
    let mut sources = Vec::with_capacity(opts.inputs.len());
    for path in &opts.inputs {
        let contents = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
        sources.push((path.display().to_string(), contents));
    }
    let linker_script = fs::read_to_string(&opts.linker).map_err(|source| CliError::Io {
        path: opts.linker.clone(),
        source,
    })?;

    let source_refs: Vec<(&str, &str)> = sources
        .iter()
        .map(|(name, contents)| (name.as_str(), contents.as_str()))
        .collect();

    let object = sasm::assemble(source_refs, &linker_script)?;
    log::info!(
        "assembled {} section(s) from {} input file(s)",
        object.sections.len(),
        opts.inputs.len()
    );

    sobjfile::write_file(&opts.output, &object)?;
    log::info!("wrote {}", opts.output.display());

    Ok(())
}
