//! Ordered phase execution with skip predicates and fail-fast halting.
//!
//! # Contract
//!
//! - Every skip predicate is evaluated once, before the first phase runs.
//!   A phase's work cannot change which later phases are skipped.
//! - Before a non-skipped phase runs, a progress event carrying
//!   `completed / total` is emitted.
//! - The first failing phase emits a terminal event with the same fraction and
//!   the error text, and nothing after it runs. Applied phases are not rolled
//!   back.
//! - When every phase succeeds, [`PhaseJournal::finish`] runs and then a final
//!   event with fraction `1.0` and `done` set is emitted.
//!
//! Skipped phases are journaled but produce no progress event.

use tracing::{error, info};

use crate::error::{InstallerError, Result};
use crate::install_log::LogTag;
use crate::progress::{PhaseUpdate, ProgressSender};

/// Description of the final success event
pub const COMPLETE_DESCRIPTION: &str = "Installation complete";

type SkipFn<C> = Box<dyn Fn(&C) -> bool + Send>;
type WorkFn<C> = Box<dyn Fn(&mut C) -> Result<()> + Send>;

/// Receives the pipeline's diagnostic records (`START`, `SKIP`, `OK`, `FAIL`)
pub trait PhaseJournal {
    fn journal(&mut self, tag: LogTag, message: &str);

    /// Called once after the last phase succeeds, before the `done` event
    fn finish(&mut self) {}
}

/// One named unit of work. Holds no state between runs.
pub struct Phase<C> {
    ordinal: usize,
    name: String,
    skip: SkipFn<C>,
    work: WorkFn<C>,
}

impl<C> Phase<C> {
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// How a run ended
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed,
    Failed {
        ordinal: usize,
        name: String,
        error: InstallerError,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Fixed-order sequence of phases
pub struct Pipeline<C> {
    phases: Vec<Phase<C>>,
}

impl<C> Default for Pipeline<C> {
    fn default() -> Self {
        Self { phases: Vec::new() }
    }
}

impl<C: PhaseJournal> Pipeline<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a phase that always runs
    pub fn phase<W>(self, name: &str, work: W) -> Self
    where
        W: Fn(&mut C) -> Result<()> + Send + 'static,
    {
        self.phase_unless(name, |_| false, work)
    }

    /// Append a phase that is skipped when `skip` holds at pipeline start
    pub fn phase_unless<S, W>(mut self, name: &str, skip: S, work: W) -> Self
    where
        S: Fn(&C) -> bool + Send + 'static,
        W: Fn(&mut C) -> Result<()> + Send + 'static,
    {
        let ordinal = self.phases.len();
        self.phases.push(Phase {
            ordinal,
            name: name.to_string(),
            skip: Box::new(skip),
            work: Box::new(work),
        });
        self
    }

    pub fn phases(&self) -> &[Phase<C>] {
        &self.phases
    }

    /// Ordinals of the phases that would run against `ctx` right now
    pub fn planned(&self, ctx: &C) -> Vec<usize> {
        self.phases
            .iter()
            .filter(|p| !(p.skip)(ctx))
            .map(|p| p.ordinal)
            .collect()
    }

    /// Execute the phases in order, reporting through `progress`.
    pub fn run(&self, ctx: &mut C, progress: &ProgressSender) -> PipelineOutcome {
        let skipped: Vec<bool> = self.phases.iter().map(|p| (p.skip)(ctx)).collect();
        let total = skipped.iter().filter(|s| !**s).count();
        info!("Running {} of {} phases", total, self.phases.len());

        let mut completed = 0usize;
        for (phase, skip) in self.phases.iter().zip(skipped) {
            if skip {
                ctx.journal(LogTag::Skip, &phase.name);
                continue;
            }

            let fraction = completed as f64 / total as f64;
            ctx.journal(LogTag::Start, &phase.name);
            info!("Phase {} started: {}", phase.ordinal, phase.name);
            progress.send(PhaseUpdate::phase_started(phase.ordinal, &phase.name, fraction));

            if let Err(e) = (phase.work)(ctx) {
                let message = e.to_string();
                ctx.journal(LogTag::Fail, &format!("{}: {}", phase.name, message));
                error!("Phase {} failed: {}", phase.name, message);
                progress.send(PhaseUpdate::phase_failed(
                    phase.ordinal,
                    &phase.name,
                    fraction,
                    message,
                ));
                return PipelineOutcome::Failed {
                    ordinal: phase.ordinal,
                    name: phase.name.clone(),
                    error: e,
                };
            }

            ctx.journal(LogTag::Ok, &phase.name);
            completed += 1;
        }

        ctx.finish();
        progress.send(PhaseUpdate::finished(COMPLETE_DESCRIPTION));
        PipelineOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress;

    #[derive(Default)]
    struct Recorder {
        ran: Vec<&'static str>,
        journal: Vec<String>,
        flag: bool,
        finished: bool,
    }

    impl PhaseJournal for Recorder {
        fn journal(&mut self, tag: LogTag, message: &str) {
            self.journal.push(format!("{} {}", tag, message));
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    fn collect(rx: progress::ProgressReceiver) -> Vec<PhaseUpdate> {
        rx.collect()
    }

    #[test]
    fn test_fractions_and_final_event() {
        let pipeline = Pipeline::<Recorder>::new()
            .phase("one", |c| {
                c.ran.push("one");
                Ok(())
            })
            .phase_unless("skipped", |_| true, |c| {
                c.ran.push("skipped");
                Ok(())
            })
            .phase("two", |c| {
                c.ran.push("two");
                Ok(())
            });

        let (tx, rx) = progress::channel();
        let mut ctx = Recorder::default();
        let outcome = pipeline.run(&mut ctx, &tx);
        drop(tx);

        assert!(outcome.is_success());
        assert_eq!(ctx.ran, vec!["one", "two"]);
        let events = collect(rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].fraction, Some(0.0));
        assert_eq!(events[0].phase, Some(0));
        assert_eq!(events[1].fraction, Some(0.5));
        assert_eq!(events[1].phase, Some(2));
        assert_eq!(events[2].fraction, Some(1.0));
        assert!(events[2].done);
        assert!(ctx.journal.contains(&"SKIP skipped".to_string()));
        assert!(ctx.finished);
    }

    #[test]
    fn test_failure_halts_and_repeats_fraction() {
        let pipeline = Pipeline::<Recorder>::new()
            .phase("one", |c| {
                c.ran.push("one");
                Ok(())
            })
            .phase("bad", |c| {
                c.ran.push("bad");
                Err(InstallerError::general("disk on fire"))
            })
            .phase("never", |c| {
                c.ran.push("never");
                Ok(())
            });

        let (tx, rx) = progress::channel();
        let mut ctx = Recorder::default();
        let outcome = pipeline.run(&mut ctx, &tx);
        drop(tx);

        assert!(matches!(outcome, PipelineOutcome::Failed { ordinal: 1, .. }));
        assert_eq!(ctx.ran, vec!["one", "bad"]);

        let events = collect(rx);
        assert_eq!(events.len(), 3);
        let (started, failed) = (&events[1], &events[2]);
        assert_eq!(started.fraction, failed.fraction);
        assert_eq!(failed.error.as_deref(), Some("disk on fire"));
        assert!(!failed.done);
        assert!(events.iter().all(|e| !e.done));
        assert_eq!(ctx.journal.last().unwrap(), "FAIL bad: disk on fire");
        assert!(!ctx.finished);
    }

    #[test]
    fn test_skip_predicates_are_evaluated_before_any_work() {
        let pipeline = Pipeline::<Recorder>::new()
            .phase("flip", |c| {
                c.flag = true;
                Ok(())
            })
            .phase_unless("guarded", |c| !c.flag, |c| {
                c.ran.push("guarded");
                Ok(())
            });

        let (tx, _rx) = progress::channel();
        let mut ctx = Recorder::default();
        pipeline.run(&mut ctx, &tx);

        assert!(ctx.flag);
        assert!(ctx.ran.is_empty());
    }

    #[test]
    fn test_all_skipped_still_finishes() {
        let pipeline = Pipeline::<Recorder>::new().phase_unless("only", |_| true, |_| Ok(()));
        let (tx, rx) = progress::channel();
        let outcome = pipeline.run(&mut Recorder::default(), &tx);
        drop(tx);

        assert!(outcome.is_success());
        let events = collect(rx);
        assert_eq!(events.len(), 1);
        assert!(events[0].done);
    }

    #[test]
    fn test_planned_reflects_current_context() {
        let pipeline = Pipeline::<Recorder>::new()
            .phase("a", |_| Ok(()))
            .phase_unless("b", |c| !c.flag, |_| Ok(()));

        let mut ctx = Recorder::default();
        assert_eq!(pipeline.planned(&ctx), vec![0]);
        ctx.flag = true;
        assert_eq!(pipeline.planned(&ctx), vec![0, 1]);
    }
}
