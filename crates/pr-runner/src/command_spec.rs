//! Argv-only command specification.
//!
//! Every adapter builds one of these instead of shelling out to
//! `sh -c "..."`, so arguments cross the tool-invocation boundary as
//! discrete elements and never get shell-reinterpreted.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::process::Command as TokioCommand;

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_args_and_env() {
        let spec = CommandSpec::new("subfinder")
        .arg("-d")
        .arg("example.com")
        .env("HOME", "/root");
        assert_eq!(spec.program, "subfinder");
        assert_eq!(spec.args, vec!["-d".to_string(), "example.com".to_string()]);
        assert_eq!(spec.env.get("HOME").map(String::as_str), Some("/root"));
    }
}
