use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use super::{entities::LogEntry, FetchOutcome, LogSource};

/// Filter passed to `log show`. Matches screen lock transitions posted by the login window.
pub const PREDICATE: &str =
    r#"process == "loginwindow" and eventMessage contains "com.apple.sessionagent.screenIs""#;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Reads the unified log through the `log` command line tool.
pub struct SystemLogSource {
    program: String,
}

impl Default for SystemLogSource {
    fn default() -> Self {
        Self {
            program: "log".into(),
        }
    }
}

impl SystemLogSource {
    fn command(&self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["show", "--style", "json", "--predicate", PREDICATE])
            .arg("--start")
            .arg(start.format(TIME_FORMAT).to_string())
            .arg("--end")
            .arg(end.format(TIME_FORMAT).to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl LogSource for SystemLogSource {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<FetchOutcome> {
        let output = self
            .command(start, end)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;
        debug!(
            "{} exited with {:?}, {} bytes of output",
            self.program,
            output.status.code(),
            output.stdout.len()
        );
        interpret_output(output.status.code(), &output.stdout, &output.stderr)
    }
}

/// Exit code 1 without any output means the log had nothing to show.
fn interpret_output(status: Option<i32>, stdout: &[u8], stderr: &[u8]) -> Result<FetchOutcome> {
    match status {
        Some(0) => parse_log_output(stdout).map(FetchOutcome::Entries),
        Some(1) if stdout.trim_ascii().is_empty() && stderr.trim_ascii().is_empty() => {
            Ok(FetchOutcome::NoEvents)
        }
        status => {
            let stderr = String::from_utf8_lossy(stderr);
            let status = status.map_or_else(|| "a signal".to_string(), |v| v.to_string());
            bail!("log command exited with {status}: {}", stderr.trim())
        }
    }
}

/// Parses the JSON array printed by `log show --style json`. Objects without a textual
/// timestamp, such as the trailing summary object, are skipped.
pub fn parse_log_output(stdout: &[u8]) -> Result<Vec<LogEntry>> {
    let values = serde_json::from_slice::<Vec<Value>>(stdout)
        .map_err(|e| anyhow!("Error decoding JSON from log output: {e}"))?;

    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<LogEntry>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                trace!("Skipping log object {e}");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::log_source::FetchOutcome;

    use super::{interpret_output, parse_log_output};

    const OUTPUT: &str = r#"[{
  "timestamp" : "2024-04-05 09:00:00.123456+0200",
  "eventMessage" : "com.apple.sessionagent.screenIsUnlocked",
  "processID" : 412
},{
  "timestamp" : "2024-04-05 09:30:00.000000+0200",
  "eventMessage" : "com.apple.sessionagent.screenIsLocked"
},{
  "count" : 2,
  "finished" : 1
}]"#;

    #[test]
    fn parses_log_show_output() -> Result<()> {
        let entries = parse_log_output(OUTPUT.as_bytes())?;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, "2024-04-05 09:00:00.123456+0200");
        assert_eq!(
            entries[0].event_message,
            "com.apple.sessionagent.screenIsUnlocked"
        );
        assert_eq!(entries[0].extra["processID"], 412);
        assert!(entries[1].extra.is_empty());
        Ok(())
    }

    #[test]
    fn missing_message_defaults_to_empty() -> Result<()> {
        let entries = parse_log_output(br#"[{"timestamp": "2024-04-05 09:00:00"}]"#)?;
        assert_eq!(entries[0].event_message, "");
        Ok(())
    }

    #[test]
    fn malformed_output_is_an_error() {
        assert!(parse_log_output(b"Skipping info and debug messages").is_err());
        assert!(interpret_output(Some(0), b"[{", b"").is_err());
    }

    #[test]
    fn silent_exit_code_one_means_no_events() -> Result<()> {
        assert_eq!(interpret_output(Some(1), b"", b"")?, FetchOutcome::NoEvents);
        assert_eq!(interpret_output(Some(0), b"[]", b"")?, FetchOutcome::Entries(vec![]));
        assert!(interpret_output(Some(1), b"", b"log: invalid predicate").is_err());
        assert!(interpret_output(Some(64), b"", b"").is_err());
        assert!(interpret_output(None, b"", b"").is_err());
        Ok(())
    }
}
