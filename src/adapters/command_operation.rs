//! Operations backed by an external program.
//!
//! Keyword arguments go to the child's stdin as one JSON object. Stdout is
//! the result: JSON when it parses, a plain string otherwise, `null` when
//! empty. A non-zero exit is a failure carrying stderr.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::CommandConfig;
use crate::domain::{OperationContext, OperationPort};

#[derive(Debug, Clone)]
pub struct CommandOperation {
    program: String,
    args: Vec<String>,
}

impl CommandOperation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CommandConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

#[async_trait]
impl OperationPort for CommandOperation {
    async fn invoke(&self, ctx: &OperationContext, kwargs: &Map<String, Value>) -> anyhow::Result<Value> {
        let input = serde_json::to_vec(kwargs)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&ctx.session_dir)
            .envs(ctx.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        // Feed stdin while the output is drained so neither side can fill
        // its pipe and stall the other.
        let stdin = child.stdin.take();
        let writer = tokio::spawn(async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(&input).await,
                None => Ok(()),
            }
        });

        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output = output.with_context(|| format!("Failed to wait for {}", self.program))?;

        match written {
            Ok(Ok(())) => {}
            // The child may exit without reading its arguments.
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("{} closed stdin before reading all arguments", self.program);
            }
            Ok(Err(e)) => {
                return Err(e).with_context(|| format!("Failed to send arguments to {}", self.program));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Argument writer for {} did not finish", self.program));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(anyhow::anyhow!("{}", stderr))
                .with_context(|| format!("{} exited with status {}", self.program, code));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_stdout(&stdout))
    }
}

fn parse_stdout(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> OperationContext {
        OperationContext {
            session_id: "abcd1234".to_string(),
            session_dir: dir.path().to_path_buf(),
            env: vec![("MASGENT_SESSION_RUNS_DIR".to_string(), dir.path().to_string_lossy().into_owned())],
        }
    }

    #[test]
    fn test_stdout_parsing() {
        assert_eq!(parse_stdout("  \n"), Value::Null);
        assert_eq!(parse_stdout("{\"energy\": -10.5}\n"), json!({"energy": -10.5}));
        assert_eq!(parse_stdout("/tmp/POSCAR\n"), json!("/tmp/POSCAR"));
        assert_eq!(parse_stdout("[1, 2]"), json!([1, 2]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kwargs_reach_stdin() {
        let dir = TempDir::new().unwrap();
        let op = CommandOperation::new("cat", vec![]);
        let mut kwargs = Map::new();
        kwargs.insert("formula".to_string(), json!("NaCl"));

        let result = op.invoke(&context(&dir), &kwargs).await.unwrap();
        assert_eq!(result, json!({"formula": "NaCl"}));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_session_dir_with_env() {
        let dir = TempDir::new().unwrap();
        let op = CommandOperation::new(
            "sh",
            vec!["-c".to_string(), "echo \"$MASGENT_SESSION_RUNS_DIR\"; pwd".to_string()],
        );
        let result = op.invoke(&context(&dir), &Map::new()).await.unwrap();
        let text = result.as_str().unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert!(text.lines().any(|l| std::path::Path::new(l).canonicalize().ok() == Some(expected.clone())));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let op = CommandOperation::new("sh", vec!["-c".to_string(), "echo 'bad lattice' >&2; exit 3".to_string()]);
        let err = op.invoke(&context(&dir), &Map::new()).await.unwrap_err();
        assert!(err.to_string().contains("exited with status 3"));
        assert!(format!("{:#}", err).contains("bad lattice"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_ignoring_large_stdin_still_succeeds() {
        let dir = TempDir::new().unwrap();
        let op = CommandOperation::new("sh", vec!["-c".to_string(), "echo done".to_string()]);
        let mut kwargs = Map::new();
        kwargs.insert("structure".to_string(), json!("x".repeat(200_000)));

        let result = op.invoke(&context(&dir), &kwargs).await.unwrap();
        assert_eq!(result, json!("done"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_stdin_and_stdout_do_not_stall() {
        let dir = TempDir::new().unwrap();
        let op = CommandOperation::new("cat", vec![]);
        let mut kwargs = Map::new();
        kwargs.insert("structure".to_string(), json!("H 0 0 0\n".repeat(50_000)));

        let result = op.invoke(&context(&dir), &kwargs).await.unwrap();
        assert_eq!(result["structure"].as_str().map(str::len), Some(8 * 50_000));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let op = CommandOperation::new("definitely-not-a-real-program-xyz", vec![]);
        assert!(op.invoke(&context(&dir), &Map::new()).await.is_err());
    }
}
