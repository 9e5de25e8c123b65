use anyhow::{Context, Result, bail};
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Run a command with inherited stdio, failing on a non-zero exit
pub fn run(cmd: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(cmd)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if !status.success() {
        bail!("{} {} exited with {}", cmd, args.join(" "), status);
    }
    Ok(())
}

/// Run a command and capture output
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(cmd)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;
    captured(output)
}

/// Run a command with `input` on stdin and capture output
pub fn run_with_stdin(cmd: &str, args: &[&str], input: &[u8]) -> Result<String> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    {
        let mut stdin = child.stdin.take().context("stdin was not captured")?;
        stdin
            .write_all(input)
            .with_context(|| format!("Failed to write to {cmd}"))?;
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for {cmd}"))?;
    captured(output)
}

fn captured(output: Output) -> Result<String> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Command failed: {}", stderr.trim())
    }
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_capture_trims_output() {
        assert_eq!(run_capture("echo", &["hello"]).unwrap(), "hello");
    }

    #[test]
    fn test_run_capture_reports_stderr() {
        let err = run_capture("sh", &["-c", "echo boom >&2; exit 3"]).unwrap_err();
        assert_eq!(err.to_string(), "Command failed: boom");
    }

    #[test]
    fn test_run_with_stdin() {
        let out = run_with_stdin("cat", &[], b"kind: Kustomization\n").unwrap();
        assert_eq!(out, "kind: Kustomization");
    }

    #[test]
    fn test_run_fails_on_exit_code() {
        assert!(run("sh", &["-c", "exit 1"]).is_err());
        assert!(run("true", &[]).is_ok());
    }

    #[test]
    fn test_missing_command() {
        assert!(run_capture("bpctl-no-such-binary", &[]).is_err());
        assert!(!command_exists("bpctl-no-such-binary"));
    }
}
