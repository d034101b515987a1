//! Structured argv builder. Commands are never assembled into a shell string.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::borrow::Cow;

/// One external command: program plus argv tokens
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip)]
    pub env: Vec<(String, String)>,
    #[serde(skip)]
    pub stdin: Option<String>,
    /// Failure of a non-blocking command is only a warning
    pub blocking: bool,
    /// Treat any stdout as failure even on exit 0 (`gofmt -l`)
    pub fail_on_output: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
            blocking: true,
            fail_on_output: false,
        }
    }

    /// Split a user-supplied command line with shell-word rules
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = shell_words::split(line)
            .with_context(|| format!("Failed to parse command line: {}", line))?;
        if words.is_empty() {
            bail!("Command line is empty");
        }
        let program = words.remove(0);
        Ok(Self::new(program).args(words))
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

    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition {
            self.arg(arg)
        } else {
            self
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn advisory(mut self) -> Self {
        self.blocking = false;
        self
    }

    pub fn fail_on_output(mut self) -> Self {
        self.fail_on_output = true;
        self
    }

    /// Printable command line. Env and stdin are left out since they may carry secrets.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| display_word(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.display())
            .field("env_keys", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .field("blocking", &self.blocking)
            .field("fail_on_output", &self.fail_on_output)
            .finish()
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Quotes only words a shell would split or expand; `KEY=value` stays readable
fn display_word(word: &str) -> Cow<'_, str> {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+^".contains(c));
    if plain {
        Cow::Borrowed(word)
    } else {
        shell_words::quote(word)
    }
}

/// Append extra argv tokens to the last command of a task
pub fn append_extra_args(commands: &mut [CommandSpec], extra: &[String]) {
    if extra.is_empty() {
        return;
    }
    if let Some(last) = commands.last_mut() {
        last.args.extend(extra.iter().cloned());
    }
}
