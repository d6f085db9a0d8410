//! Invocation and run configuration types.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single external tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Program to execute (resolved through `PATH`)
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Working directory for the process
    pub workdir: Option<PathBuf>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: None,
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// First argument, which for the tools cloudstrap drives is the subcommand.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Render the invocation as a shell-like command line for logging.
    pub fn command_line(&self) -> String {
        let mut cmd = self.program.clone();
        for arg in &self.args {
            if arg.contains(' ') || arg.contains('=') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }
}

/// Run configuration with timeouts and output handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
    /// Whether to echo output lines while capturing them
    pub stream_logs: bool,
    /// Seconds a timed-out process gets to exit after SIGINT before it is killed
    #[serde(default = "default_interrupt_grace")]
    pub interrupt_grace_seconds: u64,
}

fn default_interrupt_grace() -> u64 {
    30
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300, // 5 minutes
            stream_logs: false,
            interrupt_grace_seconds: default_interrupt_grace(),
        }
    }
}

impl RunConfig {
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn stream(mut self) -> Self {
        self.stream_logs = true;
        self
    }

    pub fn interrupt_grace(mut self, seconds: u64) -> Self {
        self.interrupt_grace_seconds = seconds;
        self
    }

    /// Enable or disable log streaming.
    pub fn stream_logs(mut self, enabled: bool) -> Self {
        self.stream_logs = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let invocation = Invocation::new("terraform")
            .args(["plan", "-input=false"])
            .workdir("/tmp/tf")
            .env("TF_IN_AUTOMATION", "1");

        assert_eq!(invocation.subcommand(), Some("plan"));
        assert_eq!(invocation.workdir, Some(PathBuf::from("/tmp/tf")));
        assert_eq!(invocation.env.get("TF_IN_AUTOMATION"), Some(&"1".to_string()));
    }

    #[test]
    fn test_command_line_quotes_assignments() {
        let invocation = Invocation::new("terraform").args(["plan", "-out=tfplan"]);
        assert_eq!(invocation.command_line(), "terraform plan '-out=tfplan'");
    }

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::default().timeout(60).stream().interrupt_grace(5);
        assert_eq!(config.timeout_seconds, 60);
        assert!(config.stream_logs);
        assert_eq!(config.interrupt_grace_seconds, 5);
    }
}
