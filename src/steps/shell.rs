use anyhow::{Context, Result};
use provision::{Step, StepContext, Touch};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Source Homebrew-installed zsh plugins from the shell rc file
#[derive(Debug)]
pub struct ShellPlugins {
    pub rc_file: PathBuf,
    pub plugins: Vec<String>,
}

impl ShellPlugins {
    pub fn new(rc_file: PathBuf, plugins: Vec<String>) -> Self {
        Self { rc_file, plugins }
    }

    fn source_line(plugin: &str) -> String {
        format!("source \"$(brew --prefix)/share/{plugin}/{plugin}.zsh\"")
    }

    fn missing_lines(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.rc_file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.rc_file.display()));
            }
        };

        Ok(self
            .plugins
            .iter()
            .map(|p| Self::source_line(p))
            .filter(|line| !content.lines().any(|l| l.trim() == line.as_str()))
            .collect())
    }
}

impl Step for ShellPlugins {
    fn id(&self) -> String {
        "shell-plugins".to_string()
    }

    fn description(&self) -> String {
        format!("Enable shell plugins in {}", self.rc_file.display())
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::Shell, Touch::Filesystem]
    }

    fn is_satisfied(&self, _ctx: &StepContext<'_>) -> Result<bool> {
        Ok(self.missing_lines()?.is_empty())
    }

    fn apply(&self, _ctx: &mut StepContext<'_>) -> Result<()> {
        let missing = self.missing_lines()?;

        if let Some(dir) = self.rc_file.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let needs_newline = fs::read(&self.rc_file)
            .map(|bytes| bytes.last().is_some_and(|b| *b != b'\n'))
            .unwrap_or(false);

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.rc_file)
            .with_context(|| format!("Failed to open {}", self.rc_file.display()))?;

        let mut block = String::new();
        if needs_newline {
            block.push('\n');
        }
        for line in &missing {
            block.push_str(line);
            block.push('\n');
        }

        file.write_all(block.as_bytes())
            .with_context(|| format!("Failed to write {}", self.rc_file.display()))?;
        Ok(())
    }
}
