//! Thin wrapper around `std::process::Command` for host tools.
//!
//! Every shell step of a run (`make`, `modprobe`, `uname`, `getconf`) goes
//! through [`Cmd`], which attaches a readable error message, logs the command
//! line, and honours dry-run mode.

use anyhow::{bail, Context, Result};
use std::ffi::{OsStr, OsString};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Builder for a single host command.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    error_msg: Option<String>,
    dry_run: bool,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            error_msg: None,
            dry_run: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    /// Message used as the error context when the command fails.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// When set, the command is logged but never spawned.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Human-readable command line, used in logs and error messages.
    pub fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn failure(&self) -> String {
        self.error_msg
            .clone()
            .unwrap_or_else(|| format!("command failed: {}", self.display()))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Run with captured output; stderr is included in the error on failure.
    pub fn run(&self) -> Result<()> {
        self.output().map(|_| ())
    }

    /// Run with captured output and return trimmed stdout.
    ///
    /// In dry-run mode nothing is spawned and an empty string is returned.
    pub fn output(&self) -> Result<String> {
        if self.dry_run {
            info!("[dry-run] {}", self.display());
            return Ok(String::new());
        }
        debug!("running: {}", self.display());

        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawning '{}'", self.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} (status {}): {}",
                self.failure(),
                output.status,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run with inherited stdio so the user sees progress (e.g. `make`).
    pub fn run_interactive(&self) -> Result<()> {
        if self.dry_run {
            info!("[dry-run] {}", self.display());
            return Ok(());
        }
        debug!("running: {}", self.display());

        let status = self
            .command()
            .status()
            .with_context(|| format!("spawning '{}'", self.display()))?;

        if !status.success() {
            bail!("{} (status {})", self.failure(), status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_captures_stdout() {
        let out = Cmd::new("echo").args(["hello", "world"]).output().unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_failure_uses_error_msg() {
        let err = Cmd::new("false")
            .error_msg("expected failure")
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("expected failure"));
    }

    #[test]
    fn test_dry_run_does_not_spawn() {
        let out = Cmd::new("definitely_not_a_real_command_12345")
            .dry_run(true)
            .output()
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_display_joins_args() {
        let cmd = Cmd::new("make").args(["-C", "/tmp/linux", "modules_prepare"]);
        assert_eq!(cmd.display(), "make -C /tmp/linux modules_prepare");
    }
}
