use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use modrun::{Driver, ProcessInvoker, RunnerConfig, Verdict};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modrun")]
#[command(author, version, about = "Compile, assemble, link and run the exec test corpus", long_about = None)]
struct Cli {
    /// JSON configuration file (flags override its values)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory containing the test files
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Glob matched against file names in the corpus directory
    #[arg(long)]
    pattern: Option<String>,

    /// Compiler executable (reads source on stdin)
    #[arg(long)]
    compiler: Option<PathBuf>,

    /// Assembler executable
    #[arg(long)]
    assembler: Option<PathBuf>,

    /// Output format passed to the assembler with -f
    #[arg(long)]
    format: Option<String>,

    /// Linker executable
    #[arg(long)]
    linker: Option<PathBuf>,

    /// Directory for the shared intermediate files
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Kill any tool or test binary running longer than this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print pass/fail counts after the run
    #[arg(long)]
    summary: bool,

    /// Exit with status 1 if any test failed
    #[arg(long)]
    strict: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::load(path)?,
            None => RunnerConfig::default(),
        };

        if let Some(corpus) = self.corpus {
            config.corpus_dir = corpus;
        }
        if let Some(pattern) = self.pattern {
            config.pattern = pattern;
        }
        if let Some(compiler) = self.compiler {
            config.toolchain.compiler = compiler;
        }
        if let Some(assembler) = self.assembler {
            config.toolchain.assembler = assembler;
        }
        if let Some(format) = self.format {
            config.toolchain.assembler_format = format;
        }
        if let Some(linker) = self.linker {
            config.toolchain.linker = linker;
        }
        if let Some(dir) = self.artifact_dir {
            config.artifact_dir = dir;
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // --verbose は RUST_LOG より優先する
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let (summary_flag, strict) = (cli.summary, cli.strict);
    let config = cli.into_config()?;
    let invoker = ProcessInvoker::new(config.timeout());
    let mut driver = Driver::new(config, invoker);

    let stdout = io::stdout();
    let mut write_error = None;
    let result = driver.run(|verdict| {
        if write_error.is_none() {
            if let Err(e) = print_verdict(&mut stdout.lock(), verdict) {
                write_error = Some(e);
            }
        }
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    };
    if let Some(e) = write_error {
        return Err(e).context("Failed to write verdicts to stdout");
    }

    if summary_flag {
        let line = summary.to_string();
        if summary.all_passed() {
            println!("{}", line.green().bold());
        } else {
            println!("{}", line.red().bold());
        }
    }

    if strict && !summary.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}

/// Verdict lines go out one at a time, flushed, so they interleave
/// correctly with the test binaries' own output.
fn print_verdict(out: &mut impl Write, verdict: &Verdict) -> io::Result<()> {
    let line = verdict.to_string();
    let marker = format!("{} test ", verdict.path().display());
    let rest = line.strip_prefix(&marker).unwrap_or(&line);

    let colored_rest = if verdict.is_pass() {
        rest.green()
    } else {
        rest.red()
    };
    writeln!(out, "{}{}", marker, colored_rest)?;
    out.flush()
}
