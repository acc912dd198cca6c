//! Terminal prompts behind a trait, so settings gathering can be scripted

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password};

/// Source of operator answers
pub trait Prompter {
    /// Ask for a line of text; returns the raw answer, which may be blank
    fn input(&mut self, prompt: &str, default: &str) -> Result<String>;

    /// Ask a yes/no question
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Ask for a secret twice without echoing it; blank is allowed
    fn password(&mut self, prompt: &str) -> Result<String>;
}

/// Interactive prompts on the controlling terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str, default: &str) -> Result<String> {
        // The default is shown but not pre-filled so an empty answer stays empty
        Input::<String>::new()
            .with_prompt(format!("{prompt} [{default}]"))
            .allow_empty(true)
            .interact_text()
            .with_context(|| format!("Failed to read {prompt}"))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("Failed to read confirmation")
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        Password::new()
            .with_prompt(prompt)
            .with_confirmation("Repeat to confirm", "Entries do not match")
            .allow_empty_password(true)
            .interact()
            .with_context(|| format!("Failed to read {prompt}"))
    }
}

/// Canned answers, consumed in order
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    /// Number of prompts shown
    pub reads: usize,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            reads: 0,
        }
    }

    fn next(&mut self, prompt: &str) -> Result<String> {
        self.reads += 1;
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted answer for '{prompt}'"))
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str, _default: &str) -> Result<String> {
        self.next(prompt)
    }

    /// `y`/`yes` and `n`/`no`; blank means the default
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let answer = self.next(prompt)?;
        match answer.trim().to_lowercase().as_str() {
            "" => Ok(default),
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            other => anyhow::bail!("unexpected answer '{other}' to '{prompt}'"),
        }
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }
}
