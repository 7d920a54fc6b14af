use anyhow::{Context, Result, ensure};
use clap::Parser;
use env_logger::Env;
use log::debug;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};
use test_locator::{
    Buffer, Capability, Config, CursorPosition, Delimiter, Engine, Runnable, Search, Target,
    TestCommand, ensure_available,
};

/// Find the Go tests at a cursor position, in a file, or below a directory
#[derive(Parser, Debug)]
#[command(name = "test-locator", version, about, long_about = None)]
struct Cli {
    /// A `_test.go` file, or a directory to search recursively
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Search strategy: nearest, method, file, or directory
    #[arg(long, short, default_value = "nearest")]
    search: Search,

    /// Zero-based cursor row
    #[arg(long, short, default_value_t = 0)]
    row: usize,

    /// Zero-based cursor column
    #[arg(long, short, default_value_t = 0)]
    col: usize,

    /// Print as JSON
    #[arg(long)]
    json: bool,

    /// Print the `go test` commands instead of the runnables
    #[arg(long, conflicts_with = "run")]
    command: bool,

    /// Run the `go test` commands, stopping at the first failure
    #[arg(long)]
    run: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "warn"
    }))
    .init();

    let config = Config::from_env();
    let engine = Engine::initialize();
    let runnables = locate(&engine, &cli)?;

    if cli.command || cli.run {
        let commands = engine.commands(&runnables, &config)?;
        if cli.run {
            return run(&config, &runnables, &commands);
        }
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&commands)?);
        } else {
            for command in &commands {
                if command.dir.as_os_str().is_empty() {
                    println!("{command}");
                } else {
                    println!("cd {} && {command}", command.dir.display());
                }
            }
        }
        return Ok(());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&runnables)?);
    } else {
        for runnable in &runnables {
            println!(
                "{}:{}:{}: {}",
                runnable.filepath.display(),
                runnable.range.start.row + 1,
                runnable.range.start.col + 1,
                runnable.name
            );
        }
    }

    Ok(())
}

fn locate(engine: &Engine, cli: &Cli) -> Result<Vec<Runnable>> {
    if cli.path.is_dir() || cli.search == Search::Directory {
        let dir = if cli.path.is_dir() {
            cli.path.as_path()
        } else {
            cli.path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
        };
        debug!("searching `{}`", dir.display());
        return Ok(engine.directory_runnables(dir)?);
    }

    let content = read_to_string(&cli.path)
        .with_context(|| format!("failed to read `{}`", cli.path.display()))?;
    let buffer = Buffer::new(&content, &cli.path, CursorPosition::new(cli.row, cli.col));
    let mut target = Target::new(Capability::TestRunner, buffer);
    target.override_search_strategy(cli.search);
    Ok(engine.runnables(&target)?)
}

fn run(config: &Config, runnables: &[Runnable], commands: &[TestCommand]) -> Result<()> {
    ensure_available(&config.go_program)?;
    for (runnable, test_command) in runnables.iter().zip(commands) {
        let _delimiter = Delimiter::new(&runnable.name);
        let mut command = test_command.to_command();
        debug!("{}: {command:?}", runnable.name);
        let status = command
            .status()
            .with_context(|| format!("failed to spawn `{test_command}`"))?;
        ensure!(status.success(), "command failed: {test_command}");
    }
    Ok(())
}
