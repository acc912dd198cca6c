//! Run engine - executes a plan strictly in order, fail-fast

use crate::context::{Elevation, ProgressCallback, StepContext, System};
use crate::error::Error;
use crate::keepalive::KeepAlive;
use crate::plan::Plan;
use crate::step::{Step, StepExt};
use crate::types::{RunOptions, RunReport, StepOutcome, StepRecord};
use anyhow::Result;
use std::sync::Arc;

/// Executes provisioning plans against a system handle
pub struct Runner<'a> {
    system: &'a dyn System,
    elevation: Arc<dyn Elevation>,
    opts: RunOptions,
}

impl<'a> Runner<'a> {
    pub fn new(system: &'a dyn System, elevation: Arc<dyn Elevation>, opts: RunOptions) -> Self {
        Self {
            system,
            elevation,
            opts,
        }
    }

    /// Run every step in order
    ///
    /// For each step: report it, check its precondition, and apply it only
    /// when unsatisfied. The first error stops the run; later steps are
    /// neither checked nor applied and nothing is rolled back.
    ///
    /// Privileges are acquired lazily before the first privileged step that
    /// actually needs applying; from then on a keep-alive refreshes them
    /// until this call returns.
    pub fn run<P: ProgressCallback>(&self, plan: Plan, progress: &mut P) -> Result<RunReport, Error> {
        let steps = plan.into_steps();
        let total = steps.len();
        let mut session = Session::new(self.elevation.clone(), self.opts.keepalive_interval);
        let mut report = RunReport::default();

        progress.on_run_start(total);

        for (i, planned) in steps.iter().enumerate() {
            let index = i + 1;
            let step = planned.step.as_ref();

            progress.on_step_start(index, total, step);
            log::debug!("step {index}/{total}: {}", step.id());

            match self.run_step(step, &mut session) {
                Ok(outcome) => {
                    progress.on_step_complete(index, step, &outcome);
                    report.steps.push(StepRecord {
                        index,
                        id: step.id(),
                        description: step.description(),
                        outcome,
                    });
                }
                Err(e) => {
                    progress.on_step_failed(index, step, &e);
                    return Err(Error::step_failed(
                        index,
                        total,
                        step.id(),
                        step.description(),
                        &e,
                    ));
                }
            }
        }

        Ok(report)
    }

    /// Evaluate every step's precondition without applying anything
    ///
    /// Unlike [`Runner::run`] this does not stop at the first error.
    pub fn check(&self, plan: &Plan) -> Vec<Result<bool>> {
        let ctx = StepContext::new(self.system);
        plan.iter().map(|p| p.step.is_satisfied(&ctx)).collect()
    }

    fn run_step(&self, step: &dyn Step, session: &mut Session) -> Result<StepOutcome> {
        let mut ctx = StepContext::new(self.system);

        if step.is_satisfied(&ctx)? {
            log::debug!("{} already satisfied", step.id());
            return Ok(StepOutcome::AlreadySatisfied);
        }

        if self.opts.dry_run {
            return Ok(StepOutcome::Pending);
        }

        if step.requires_privilege() {
            let reason = match step.privilege() {
                crate::types::Privilege::Required { reason } => reason,
                crate::types::Privilege::None => step.description(),
            };
            session.ensure(&reason)?;
        }

        step.apply(&mut ctx)?;
        Ok(StepOutcome::Applied)
    }
}

/// Elevated session scoped to one run
///
/// Dropping it stops the keep-alive and releases privileges, on success,
/// failure, or unwinding alike.
struct Session {
    elevation: Arc<dyn Elevation>,
    interval: std::time::Duration,
    keepalive: Option<KeepAlive>,
}

impl Session {
    fn new(elevation: Arc<dyn Elevation>, interval: std::time::Duration) -> Self {
        Self {
            elevation,
            interval,
            keepalive: None,
        }
    }

    fn ensure(&mut self, reason: &str) -> Result<()> {
        if self.keepalive.is_some() {
            return Ok(());
        }
        self.elevation.acquire(reason)?;
        self.keepalive = Some(KeepAlive::start(self.elevation.clone(), self.interval));
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(keepalive) = self.keepalive.take() {
            let refreshes = keepalive.stop();
            log::debug!("keep-alive stopped after {refreshes} refresh(es)");
            self.elevation.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::testing::FakeSystem;
    use crate::types::{Invocation, Privilege, Touch};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// A step backed by a shared flag, so a second run sees the first's effect
    #[derive(Debug)]
    struct FlagStep {
        id: &'static str,
        done: Arc<AtomicBool>,
        applied: Arc<AtomicUsize>,
        privileged: bool,
        fail: bool,
    }

    impl FlagStep {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                done: Arc::new(AtomicBool::new(false)),
                applied: Arc::new(AtomicUsize::new(0)),
                privileged: false,
                fail: false,
            }
        }

        fn privileged(mut self) -> Self {
            self.privileged = true;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl Step for FlagStep {
        fn id(&self) -> String {
            self.id.to_string()
        }

        fn description(&self) -> String {
            format!("Flag {}", self.id)
        }

        fn touches(&self) -> &'static [Touch] {
            &[Touch::Filesystem]
        }

        fn privilege(&self) -> Privilege {
            if self.privileged {
                Privilege::required("test")
            } else {
                Privilege::None
            }
        }

        fn is_satisfied(&self, _ctx: &StepContext<'_>) -> Result<bool> {
            Ok(self.done.load(Ordering::SeqCst))
        }

        fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                ctx.run(&Invocation::new("false", Vec::<String>::new()))?;
            }
            self.done.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingElevation {
        events: Mutex<Vec<&'static str>>,
    }

    impl Elevation for RecordingElevation {
        fn acquire(&self, _reason: &str) -> Result<()> {
            self.events.lock().unwrap().push("acquire");
            Ok(())
        }

        fn refresh(&self) -> Result<()> {
            Ok(())
        }

        fn release(&self) {
            self.events.lock().unwrap().push("release");
        }
    }

    fn plan_of(steps: Vec<FlagStep>) -> Plan {
        let mut plan = Plan::new();
        for step in steps {
            plan.push("test", step);
        }
        plan
    }

    fn shared(step: &FlagStep) -> FlagStep {
        FlagStep {
            id: step.id,
            done: step.done.clone(),
            applied: step.applied.clone(),
            privileged: step.privileged,
            fail: step.fail,
        }
    }

    #[test]
    fn test_applies_unsatisfied_steps_in_order() {
        let system = FakeSystem::new();
        let runner = Runner::new(&system, Arc::new(RecordingElevation::default()), RunOptions::default());

        let report = runner
            .run(plan_of(vec![FlagStep::new("a"), FlagStep::new("b")]), &mut NoProgress)
            .unwrap();

        let ids: Vec<_> = report.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(report.applied(), 2);
    }

    #[test]
    fn test_second_run_is_noop() {
        let system = FakeSystem::new();
        let runner = Runner::new(&system, Arc::new(RecordingElevation::default()), RunOptions::default());
        let a = FlagStep::new("a");
        let b = FlagStep::new("b").privileged();

        let first = runner
            .run(plan_of(vec![shared(&a), shared(&b)]), &mut NoProgress)
            .unwrap();
        assert_eq!(first.applied(), 2);

        let second = runner
            .run(plan_of(vec![shared(&a), shared(&b)]), &mut NoProgress)
            .unwrap();
        assert!(second.is_noop());
        assert_eq!(a.applied.load(Ordering::SeqCst), 1);
        assert_eq!(b.applied.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_stops_later_steps() {
        let system = FakeSystem::new();
        system.respond("false", crate::types::CommandOutput::failed(7, "boom"));
        let runner = Runner::new(&system, Arc::new(RecordingElevation::default()), RunOptions::default());

        let first = FlagStep::new("first");
        let broken = FlagStep::new("broken").failing();
        let after = FlagStep::new("after");

        let err = runner
            .run(
                plan_of(vec![shared(&first), shared(&broken), shared(&after)]),
                &mut NoProgress,
            )
            .unwrap_err();

        match &err {
            Error::StepFailed { index, id, .. } => {
                assert_eq!(*index, 2);
                assert_eq!(id, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.exit_status(), 7);
        assert_eq!(first.applied.load(Ordering::SeqCst), 1);
        assert_eq!(after.applied.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dry_run_never_applies_or_elevates() {
        let system = FakeSystem::new();
        let elevation = Arc::new(RecordingElevation::default());
        let opts = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let runner = Runner::new(&system, elevation.clone(), opts);
        let step = FlagStep::new("tz").privileged();

        let report = runner.run(plan_of(vec![shared(&step)]), &mut NoProgress).unwrap();

        assert_eq!(report.pending(), 1);
        assert_eq!(step.applied.load(Ordering::SeqCst), 0);
        assert!(elevation.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_elevation_acquired_once_and_released() {
        let system = FakeSystem::new();
        let elevation = Arc::new(RecordingElevation::default());
        let runner = Runner::new(&system, elevation.clone(), RunOptions::default());

        runner
            .run(
                plan_of(vec![
                    FlagStep::new("user"),
                    FlagStep::new("root-1").privileged(),
                    FlagStep::new("root-2").privileged(),
                ]),
                &mut NoProgress,
            )
            .unwrap();

        assert_eq!(*elevation.events.lock().unwrap(), vec!["acquire", "release"]);
    }

    #[test]
    fn test_elevation_released_on_failure() {
        let system = FakeSystem::new();
        system.respond("false", crate::types::CommandOutput::failed(1, ""));
        let elevation = Arc::new(RecordingElevation::default());
        let runner = Runner::new(&system, elevation.clone(), RunOptions::default());

        let result = runner.run(
            plan_of(vec![FlagStep::new("root").privileged().failing()]),
            &mut NoProgress,
        );

        assert!(result.is_err());
        assert_eq!(*elevation.events.lock().unwrap(), vec!["acquire", "release"]);
    }

    #[test]
    fn test_no_elevation_when_privileged_steps_satisfied() {
        let system = FakeSystem::new();
        let elevation = Arc::new(RecordingElevation::default());
        let runner = Runner::new(&system, elevation.clone(), RunOptions::default());
        let step = FlagStep::new("root").privileged();
        step.done.store(true, Ordering::SeqCst);

        runner.run(plan_of(vec![step]), &mut NoProgress).unwrap();

        assert!(elevation.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_check_reports_each_step() {
        let system = FakeSystem::new();
        let runner = Runner::new(&system, Arc::new(RecordingElevation::default()), RunOptions::default());
        let done = FlagStep::new("done");
        done.done.store(true, Ordering::SeqCst);
        let plan = plan_of(vec![done, FlagStep::new("todo")]);

        let results: Vec<bool> = runner
            .check(&plan)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(results, vec![true, false]);
    }
}
