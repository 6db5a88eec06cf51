//! "(sp?)" spell checking backed by aspell.

use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// `word (sp?)` anywhere in a line.
static SP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s\(sp\?\)").expect("sp regex creation failed"));

/// aspell's "miss" line: `& word count offset: suggestions`.
static MISS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&\s\w+\s\d+\s\d+:\s(.+)$").expect("aspell regex creation failed")
});

pub const CORRECT_REPLY: &str = "GJ U CAN SPELL";
pub const UNKNOWN_REPLY: &str = "Beats me...";

#[derive(Debug, Error)]
pub enum SpellError {
    #[error("failed to run spell checker: {0}")]
    Io(#[from] std::io::Error),
    #[error("spell checker timed out")]
    Timeout,
    #[error("spell checker exited with {0}")]
    Failed(std::process::ExitStatus),
    #[error("spell checker produced no result line")]
    NoOutput,
}

/// Result of checking one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    /// Comma-separated suggestions.
    Suggestions(String),
    /// Misspelled with nothing to suggest.
    Unknown,
}

impl Verdict {
    pub fn reply(&self) -> &str {
        match self {
            Verdict::Correct => CORRECT_REPLY,
            Verdict::Suggestions(s) => s,
            Verdict::Unknown => UNKNOWN_REPLY,
        }
    }
}

#[async_trait]
pub trait SpellChecker: Send + Sync {
    async fn check(&self, word: &str) -> Result<Verdict, SpellError>;
}

/// The word before the first `(sp?)` in `text`.
pub fn find_sp_word(text: &str) -> Option<&str> {
    SP_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Interpret `aspell pipe` output for a single word.
pub fn parse_aspell_output(output: &str) -> Result<Verdict, SpellError> {
    let line = output
        .lines()
        .find(|l| !l.is_empty() && !l.starts_with("@(#)"))
        .ok_or(SpellError::NoOutput)?;

    if line.starts_with('#') {
        return Ok(Verdict::Unknown);
    }
    match MISS_REGEX.captures(line).and_then(|c| c.get(1)) {
        Some(suggestions) => Ok(Verdict::Suggestions(suggestions.as_str().to_string())),
        None => Ok(Verdict::Correct),
    }
}

/// Runs `<binary> pipe` once per word.
pub struct Aspell {
    binary: String,
    timeout: Duration,
}

impl Aspell {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SpellChecker for Aspell {
    async fn check(&self, word: &str) -> Result<Verdict, SpellError> {
        let mut child = Command::new(&self.binary)
            .arg("pipe")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        // `^` makes aspell treat the rest of the line as text, never a command.
        let word: String = word.chars().filter(|c| !c.is_control()).collect();
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(format!("^{word}\n").as_bytes()).await?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SpellError::Timeout)??;

        if !output.status.success() {
            return Err(SpellError::Failed(output.status));
        }
        parse_aspell_output(&String::from_utf8_lossy(&output.stdout))
    }
}
