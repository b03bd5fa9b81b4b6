//! The pass scheduler.
//!
//! Compilation advances through a fixed, ordered list of passes; work for a
//! later pass is registered as a task and executed when that pass begins, in
//! registration order. Registering for a pass more than one stage ahead
//! defers the registration itself by wrapping it into a task for the next
//! intermediate pass — that is what preserves causal ordering between
//! sibling definitions:
//!
//! - definition 0 adds a task to pass A; that task adds a task to pass B
//! - definition 1 adds a task to pass B directly
//! - on pass B, definition 0's task must still run before definition 1's
//!
//! `check_pass` violations are programming-contract breaches and panic; they
//! are never diagnostics.

use std::collections::VecDeque;

use quill_core::CResult;

use crate::context::Session;

/// The fixed, ordered compilation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompilerPass {
    /// Walk syntax trees, create definition shells, declare names.
    Definitions,
    /// Assemble module and file namespaces; detect name conflicts.
    Namespaces,
    /// Resolve attribute/parameter/return types.
    Members,
    /// Compile bodies and evaluate constants.
    Expressions,
    /// Seal call frames.
    Frames,
    /// Dependency-graph analysis and structural flags.
    Structure,
    /// Freeze the application.
    Finish,
}

impl CompilerPass {
    pub const ALL: [CompilerPass; 7] = [
        CompilerPass::Definitions,
        CompilerPass::Namespaces,
        CompilerPass::Members,
        CompilerPass::Expressions,
        CompilerPass::Frames,
        CompilerPass::Structure,
        CompilerPass::Finish,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap()
    }

    pub fn next(self) -> CompilerPass {
        Self::ALL[self.index() + 1]
    }
}

/// A deferred unit of work. State is threaded through the explicit
/// [`Session`] parameter rather than closed over, so tasks own only the
/// data identifying what to compile. A returned error is recovered at task
/// granularity and becomes a diagnostic.
pub type PassTask = Box<dyn FnOnce(&mut Session) -> CResult<()>>;

/// Per-pass task queues plus the monotonically advancing current pass.
pub struct Scheduler {
    current: CompilerPass,
    queues: Vec<VecDeque<PassTask>>,
    run_called: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler {
            current: CompilerPass::Definitions,
            queues: (0..CompilerPass::ALL.len()).map(|_| VecDeque::new()).collect(),
            run_called: false,
        }
    }

    pub fn current(&self) -> CompilerPass {
        self.current
    }

    /// Assert the current pass lies inside the given window.
    pub fn check_pass(&self, min: Option<CompilerPass>, max: Option<CompilerPass>) {
        if let Some(min) = min {
            assert!(
                self.current >= min,
                "expected pass >= {min:?}, actual {:?}",
                self.current
            );
        }
        if let Some(max) = max {
            assert!(
                self.current <= max,
                "expected pass <= {max:?}, actual {:?}",
                self.current
            );
        }
    }

    /// Register `task` to run when `pass` begins. The target must be
    /// strictly later than the current pass.
    pub fn on_pass(&mut self, pass: CompilerPass, task: PassTask) {
        assert!(
            self.current < pass,
            "cannot register for {pass:?} while at {:?}",
            self.current
        );

        let next = self.current.next();
        if pass == next {
            self.queues[pass.index()].push_back(task);
        } else {
            // defer the registration itself one pass ahead, keeping order
            // relative to tasks registered directly into that pass
            self.queues[next.index()].push_back(Box::new(move |s: &mut Session| {
                s.scheduler.on_pass(pass, task);
                Ok(())
            }));
        }
    }

    pub(crate) fn begin_run(&mut self) {
        assert!(!self.run_called, "scheduler run twice");
        self.run_called = true;
    }

    pub(crate) fn start_pass(&mut self, pass: CompilerPass) {
        assert!(pass >= self.current, "pass order regressed");
        self.current = pass;
    }

    pub(crate) fn pop_current(&mut self) -> Option<PassTask> {
        self.queues[self.current.index()].pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CompilerOptions, Session};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> PassTask {
        let log = log.clone();
        Box::new(move |_s| {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    #[test]
    fn tasks_run_in_registration_order() {
        let mut sess = Session::new(CompilerOptions::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        sess.scheduler
            .on_pass(CompilerPass::Namespaces, record(&log, "a"));
        sess.scheduler
            .on_pass(CompilerPass::Namespaces, record(&log, "b"));
        sess.run();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn far_registration_preserves_causal_order() {
        // definition 0 registers for Members indirectly (task at Namespaces
        // that registers for Members); definition 1 registers for Members
        // from two passes away, which goes through the deferral wrapper.
        // definition 0's Members task must run first.
        let mut sess = Session::new(CompilerOptions::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        {
            let log2 = log.clone();
            sess.scheduler.on_pass(
                CompilerPass::Namespaces,
                Box::new(move |s| {
                    let t = record(&log2, "def0-members");
                    s.scheduler.on_pass(CompilerPass::Members, t);
                    Ok(())
                }),
            );
        }
        sess.scheduler
            .on_pass(CompilerPass::Members, record(&log, "def1-members"));
        sess.run();
        assert_eq!(*log.borrow(), vec!["def0-members", "def1-members"]);
    }

    #[test]
    fn task_registered_far_ahead_runs_after_everything_between() {
        let mut sess = Session::new(CompilerOptions::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        sess.scheduler
            .on_pass(CompilerPass::Frames, record(&log, "frames"));
        sess.scheduler
            .on_pass(CompilerPass::Namespaces, record(&log, "namespaces"));
        sess.scheduler
            .on_pass(CompilerPass::Expressions, record(&log, "expressions"));
        sess.run();
        assert_eq!(*log.borrow(), vec!["namespaces", "expressions", "frames"]);
    }

    #[test]
    fn failing_task_becomes_a_diagnostic() {
        let mut sess = Session::new(CompilerOptions::default());
        sess.scheduler.on_pass(
            CompilerPass::Namespaces,
            Box::new(|_s| {
                Err(quill_core::CError::new(
                    quill_core::Span::default(),
                    "x:y",
                    "boom",
                ))
            }),
        );
        sess.run();
        assert_eq!(sess.msgs.error_count(), 1);
        assert_eq!(sess.msgs.messages()[0].code, "x:y");
    }

    #[test]
    #[should_panic(expected = "cannot register")]
    fn registering_for_current_pass_panics() {
        let mut s = Scheduler::new();
        s.on_pass(CompilerPass::Definitions, Box::new(|_| Ok(())));
    }

    #[test]
    #[should_panic(expected = "expected pass >=")]
    fn check_pass_window_violation_panics() {
        let s = Scheduler::new();
        s.check_pass(Some(CompilerPass::Members), None);
    }
}
