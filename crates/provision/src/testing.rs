//! Recording fake of the [`System`] handle
//!
//! Executes nothing. Responses are scripted per command prefix, and every
//! invocation is recorded so tests can assert on what a run would have done.

use crate::context::System;
use crate::types::{CommandOutput, Invocation};
use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

type Handler = Box<dyn Fn(&Invocation) -> CommandOutput + Send + Sync>;

/// Scriptable in-memory system
#[derive(Default)]
pub struct FakeSystem {
    handlers: Mutex<Vec<(String, Handler)>>,
    commands: Mutex<HashSet<String>>,
    pages: Mutex<HashMap<String, String>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl std::fmt::Debug for FakeSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeSystem")
            .field("invocations", &self.command_lines())
            .finish_non_exhaustive()
    }
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with a fixed output to commands starting with `prefix`
    ///
    /// `prefix` is matched against `program args...` without any privilege
    /// prefix. Later registrations win over earlier ones.
    pub fn respond(&self, prefix: &str, output: CommandOutput) {
        self.handle(prefix, move |_| output.clone());
    }

    /// Reply through a closure, for state that changes during a run
    pub fn handle<F>(&self, prefix: &str, handler: F)
    where
        F: Fn(&Invocation) -> CommandOutput + Send + Sync + 'static,
    {
        lock(&self.handlers).push((prefix.to_string(), Box::new(handler)));
    }

    /// Make a program visible to [`System::command_exists`]
    pub fn add_command(&self, program: &str) {
        lock(&self.commands).insert(program.to_string());
    }

    /// Serve `body` for `url`
    pub fn serve(&self, url: &str, body: &str) {
        lock(&self.pages).insert(url.to_string(), body.to_string());
    }

    /// Everything run so far, in order
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    /// Command lines run so far, in order
    pub fn command_lines(&self) -> Vec<String> {
        lock(&self.invocations)
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Whether any recorded command starts with `prefix`
    pub fn ran(&self, prefix: &str) -> bool {
        lock(&self.invocations).iter().any(|i| matches_prefix(i, prefix))
    }

    pub fn clear(&self) {
        lock(&self.invocations).clear();
    }
}

impl System for FakeSystem {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        lock(&self.invocations).push(invocation.clone());

        let handlers = lock(&self.handlers);
        let output = handlers
            .iter()
            .rev()
            .find(|(prefix, _)| matches_prefix(invocation, prefix))
            .map_or_else(|| CommandOutput::ok(""), |(_, h)| h(invocation));
        Ok(output)
    }

    fn command_exists(&self, program: &str) -> bool {
        lock(&self.commands).contains(program)
    }

    fn fetch(&self, url: &str) -> Result<String> {
        match lock(&self.pages).get(url) {
            Some(body) => Ok(body.clone()),
            None => bail!("GET {url}: 404 Not Found"),
        }
    }
}

fn matches_prefix(invocation: &Invocation, prefix: &str) -> bool {
    let line = std::iter::once(invocation.program.as_str())
        .chain(invocation.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    line == prefix || line.starts_with(&format!("{prefix} "))
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
