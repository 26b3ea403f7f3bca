//! Cooperative, single-threaded task executor.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use portable_atomic_util::Arc;
use spin::Mutex;

use crate::task::{CancelFn, Machine, Outcome, Sink, Step};
use crate::{Command, Emitter, SchedulerConfig, Task};

/// Identifies one spawned task for the lifetime of a scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a spawned task.
///
/// `Pending → Running → {Succeeded | Failed | Pending}`. A task cycles
/// between `Running` and `Pending` once per binding it waits on.
/// `Succeeded`, `Failed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, or waiting for a binding callback.
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    /// Whether the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// Observes and identifies a spawned task.
#[derive(Clone)]
pub struct TaskHandle {
    id: ProcessId,
    state: Arc<Mutex<TaskState>>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl TaskHandle {
    /// The id to cancel this task with.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// The task's current lifecycle state.
    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    /// Whether the task succeeded, failed or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}

/// A completion delivered through the runtime mailbox.
pub(crate) struct Wake {
    process: ProcessId,
    generation: u64,
    outcome: Outcome,
}

struct Process {
    machine: Machine,
    /// Bumped on every suspension; wake-ups from older suspensions are stale.
    generation: u64,
    cancel: Option<CancelFn>,
    state: Arc<Mutex<TaskState>>,
}

impl Process {
    fn set_state(&self, state: TaskState) {
        *self.state.lock() = state;
    }
}

/// Runs queued tasks to completion, one step at a time.
///
/// The scheduler never runs two steps at once. Binding callbacks that fire
/// elsewhere only enqueue a wake-up into the runtime mailbox; the task
/// resumes when the runtime hands that wake-up back through
/// [`resume`](Self::resume). Successful results are emitted as messages into
/// the same mailbox, so messages keep the order in which tasks finished.
pub struct Scheduler<Msg: Send + 'static> {
    queue: VecDeque<ProcessId>,
    processes: HashMap<ProcessId, Process>,
    next_id: u64,
    emitter: Emitter<Msg>,
    config: SchedulerConfig,
}

impl<Msg: Send + 'static> Scheduler<Msg> {
    /// Create a scheduler that emits finished tasks' messages through
    /// `emitter`.
    ///
    /// Binding wake-ups travel through the same mailbox, so only the
    /// [`Runtime`](crate::Runtime) owning that mailbox resumes suspended
    /// tasks. Pure tasks run to completion on [`run_ready`](Self::run_ready).
    pub fn new(emitter: Emitter<Msg>, config: SchedulerConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            processes: HashMap::new(),
            next_id: 0,
            emitter,
            config,
        }
    }

    /// Enqueue a task. It does not run until [`run_ready`](Self::run_ready).
    pub fn spawn<E: Send + 'static>(&mut self, task: Task<E, Msg>) -> TaskHandle {
        let id = ProcessId(self.next_id);
        self.next_id += 1;

        let state = Arc::new(Mutex::new(TaskState::Pending));
        self.processes.insert(
            id,
            Process {
                machine: Machine::new(task),
                generation: 0,
                cancel: None,
                state: state.clone(),
            },
        );
        self.queue.push_back(id);
        tracing::trace!(process = %id, "task spawned");

        TaskHandle { id, state }
    }

    /// Enqueue every task of `command`, in order.
    pub fn spawn_command(&mut self, command: Command<Msg>) -> Vec<TaskHandle> {
        command
            .into_tasks()
            .into_iter()
            .map(|task| self.spawn(task))
            .collect()
    }

    /// Step runnable tasks until every one has finished or is waiting.
    pub fn run_ready(&mut self) {
        let budget = self.config.budget();
        while let Some(id) = self.queue.pop_front() {
            self.step(id, budget);
        }
    }

    fn step(&mut self, id: ProcessId, budget: usize) {
        let Some(process) = self.processes.get_mut(&id) else {
            return;
        };
        process.set_state(TaskState::Running);

        match process.machine.run(budget) {
            Step::Done(outcome) => {
                let finished = self.processes.remove(&id);
                match outcome {
                    Ok(value) => {
                        if let Some(process) = finished {
                            process.set_state(TaskState::Succeeded);
                        }
                        match value.downcast::<Msg>() {
                            Ok(msg) => self.emitter.emit(*msg),
                            Err(_) => unreachable!("scheduled tasks always yield messages"),
                        }
                        tracing::trace!(process = %id, "task succeeded");
                    }
                    Err(_) => {
                        if let Some(process) = finished {
                            process.set_state(TaskState::Failed);
                        }
                        tracing::warn!(process = %id, "task failed without a mapped message");
                    }
                }
            }
            Step::Suspend(start) => {
                process.generation += 1;
                process.set_state(TaskState::Pending);
                let sink = resume_sink(self.emitter.clone(), id, process.generation);
                process.cancel = Some(start(sink));
                tracing::trace!(process = %id, "task waiting on binding");
            }
            Step::Yield => {
                process.set_state(TaskState::Pending);
                self.queue.push_back(id);
            }
        }
    }

    /// Continue a task whose binding completed.
    ///
    /// Wake-ups for cancelled or finished tasks, or from an earlier
    /// suspension, are ignored.
    pub(crate) fn resume(&mut self, wake: Wake) {
        let Some(process) = self.processes.get_mut(&wake.process) else {
            tracing::trace!(process = %wake.process, "ignoring wake-up for a finished task");
            return;
        };
        if process.generation != wake.generation || process.cancel.is_none() {
            tracing::trace!(process = %wake.process, "ignoring stale wake-up");
            return;
        }
        process.cancel = None;
        process.machine.resume(wake.outcome);
        self.queue.push_back(wake.process);
    }

    /// Cancel a task that has not finished yet.
    ///
    /// Runs the pending binding's cancel function, discards the continuation
    /// and marks the task `Cancelled`. Returns `false` if the task had
    /// already finished.
    pub fn kill(&mut self, id: ProcessId) -> bool {
        let Some(mut process) = self.processes.remove(&id) else {
            return false;
        };
        self.queue.retain(|queued| *queued != id);
        if let Some(cancel) = process.cancel.take() {
            cancel();
        }
        process.set_state(TaskState::Cancelled);
        tracing::debug!(process = %id, "task cancelled");
        true
    }

    /// Cancel every outstanding task.
    pub fn shutdown(&mut self) {
        let mut ids: Vec<ProcessId> = self.processes.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.kill(id);
        }
    }

    /// Number of tasks that have not reached a terminal state.
    pub fn outstanding(&self) -> usize {
        self.processes.len()
    }
}

impl<Msg: Send + 'static> Drop for Scheduler<Msg> {
    /// Tasks still waiting on a binding are cancelled with their owner.
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn resume_sink<Msg: Send + 'static>(emitter: Emitter<Msg>, process: ProcessId, generation: u64) -> Sink {
    Box::new(move |outcome| {
        emitter.wake(Wake {
            process,
            generation,
            outcome,
        })
    })
}
