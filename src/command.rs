use anyhow::{Context, Result, ensure};
use log::debug;
use serde::Serialize;
use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

/// A program invocation produced for a runnable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestCommand {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

impl TestCommand {
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if !self.dir.as_os_str().is_empty() {
            command.current_dir(&self.dir);
        }
        command
    }
}

impl fmt::Display for TestCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Arguments selecting exactly `name` with `go test -run`.
///
/// Each `/`-separated level is anchored on both ends. Go replaces spaces in subtest names with
/// underscores, so the pattern does too.
#[must_use]
pub fn go_run_pattern(name: &str) -> String {
    name.split('/')
        .map(|segment| format!("^{}$", regex::escape(&segment.replace(' ', "_"))))
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the `go test` invocation for `name`, run from the directory containing `filepath`.
#[must_use]
pub fn build_go_test_command(
    go_program: &str,
    verbose: bool,
    name: &str,
    filepath: &Path,
    tags: &[String],
) -> TestCommand {
    let mut args = vec![String::from("test")];
    if verbose {
        args.push(String::from("-v"));
    }
    args.push(String::from("-run"));
    args.push(go_run_pattern(name));
    if !tags.is_empty() {
        args.push(format!("-tags={}", tags.join(",")));
    }
    args.push(String::from("."));
    TestCommand {
        program: go_program.to_owned(),
        args,
        dir: filepath.parent().map(Path::to_path_buf).unwrap_or_default(),
    }
}

/// Fail unless `program version` can be spawned and succeeds.
pub fn ensure_available(program: impl AsRef<OsStr>) -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let program = program.as_ref();
    let mut command = Command::new(program);
    command.arg("version");
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());
    debug!("checking availability: {command:?}");
    let status = command
        .status()
        .with_context(|| format!("`{}` is not available", program.display()))?;
    ensure!(status.success(), "command failed: {command:?}");
    Ok(())
}
