//! Run plan - the ordered list of steps, grouped into named stages

use crate::error::Error;
use crate::step::{BoxedStep, Step};

/// A step together with the stage it belongs to
#[derive(Debug)]
pub struct PlannedStep {
    pub stage: &'static str,
    pub step: BoxedStep,
}

/// An ordered provisioning plan
#[derive(Debug, Default)]
pub struct Plan {
    steps: Vec<PlannedStep>,
    /// Stage names accepted by [`Plan::select`] even when they hold no steps
    declared: Vec<&'static str>,
}

impl Plan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            declared: Vec::new(),
        }
    }

    /// Register stage names up front, so selecting a stage that ended up
    /// empty (nothing configured) is not reported as unknown
    pub fn declare_stages(&mut self, stages: &[&'static str]) {
        for stage in stages {
            if !self.declared.contains(stage) {
                self.declared.push(stage);
            }
        }
    }

    /// Append a step; run order is insertion order
    pub fn push(&mut self, stage: &'static str, step: impl Step + 'static) {
        self.steps.push(PlannedStep {
            stage,
            step: Box::new(step),
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedStep> {
        self.steps.iter()
    }

    /// Step ids in run order
    pub fn ids(&self) -> Vec<String> {
        self.steps.iter().map(|p| p.step.id()).collect()
    }

    /// Distinct stage names in run order
    pub fn stages(&self) -> Vec<&'static str> {
        let mut stages: Vec<&'static str> = Vec::new();
        for planned in &self.steps {
            if !stages.contains(&planned.stage) {
                stages.push(planned.stage);
            }
        }
        stages
    }

    /// Keep only steps selected by `only`, then drop those named by `skip`
    ///
    /// Names match a stage or a step id. Unknown names are an error rather
    /// than silently selecting nothing.
    pub fn select(self, only: &[String], skip: &[String]) -> Result<Self, Error> {
        for name in only.iter().chain(skip) {
            if !self.knows(name) {
                return Err(Error::UnknownStep {
                    name: name.clone(),
                    known: self.known_names().join(", "),
                });
            }
        }

        let steps = self
            .steps
            .into_iter()
            .filter(|p| only.is_empty() || only.iter().any(|n| selects(p, n)))
            .filter(|p| !skip.iter().any(|n| selects(p, n)))
            .collect();

        Ok(Self {
            steps,
            declared: self.declared,
        })
    }

    fn knows(&self, name: &str) -> bool {
        self.declared.contains(&name) || self.steps.iter().any(|p| selects(p, name))
    }

    fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.declared.iter().map(|s| (*s).to_string()).collect();
        for stage in self.stages() {
            if !names.iter().any(|n| n == stage) {
                names.push(stage.to_string());
            }
        }
        for id in self.ids() {
            if !names.contains(&id) {
                names.push(id);
            }
        }
        names
    }

    pub(crate) fn into_steps(self) -> Vec<PlannedStep> {
        self.steps
    }
}

fn selects(planned: &PlannedStep, name: &str) -> bool {
    planned.stage == name || planned.step.id() == name
}

/// Split a comma-separated `--only`/`--skip` value into names
pub fn parse_names(list: Option<&str>) -> Vec<String> {
    list.map(|l| {
        l.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}
