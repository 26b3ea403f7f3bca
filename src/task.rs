//! Deferred, possibly failing effects.
//!
//! A [`Task`] only describes work. Nothing runs until the task is handed to
//! the [`Scheduler`](crate::Scheduler), which steps it on an explicit
//! instruction stack so arbitrarily long `and_then`/`on_error` chains never
//! grow the call stack.

use std::any::Any;
use std::marker::PhantomData;

pub(crate) type Erased = Box<dyn Any + Send>;
pub(crate) type Outcome = Result<Erased, Erased>;
pub(crate) type Sink = Box<dyn FnOnce(Outcome) + Send>;
type Continuation = Box<dyn FnOnce(Erased) -> Instr + Send>;
type Start = Box<dyn FnOnce(Sink) -> CancelFn + Send>;

/// Invoked when a suspended task is torn down before its callback fires.
pub type CancelFn = Box<dyn FnOnce() + Send>;

pub(crate) enum Instr {
    Succeed(Erased),
    Fail(Erased),
    Binding(Start),
    AndThen(Box<Instr>, Continuation),
    OnError(Box<Instr>, Continuation),
}

fn erase<T: Send + 'static>(value: T) -> Erased {
    Box::new(value)
}

fn unerase<T: 'static>(value: Erased) -> T {
    match value.downcast::<T>() {
        Ok(value) => *value,
        Err(_) => unreachable!("task continuation received a value of another type"),
    }
}

/// A description of a computation that yields an `A` or fails with an `E`.
///
/// ```rust
/// use oxide_vdom::Task;
///
/// let task: Task<String, u32> = Task::<String, u32>::succeed(20)
///     .and_then(|n| Task::succeed(n + 1))
///     .map(|n| n * 2)
///     .on_error(|_: String| Task::succeed(0));
/// # let _ = task;
/// ```
pub struct Task<E, A> {
    pub(crate) instr: Instr,
    _types: PhantomData<fn() -> (E, A)>,
}

impl<E, A> Task<E, A> {
    fn from_instr(instr: Instr) -> Self {
        Self {
            instr,
            _types: PhantomData,
        }
    }
}

impl<E: Send + 'static, A: Send + 'static> Task<E, A> {
    /// A task that immediately succeeds with `value`.
    pub fn succeed(value: A) -> Self {
        Self::from_instr(Instr::Succeed(erase(value)))
    }

    /// A task that immediately fails with `error`.
    pub fn fail(error: E) -> Self {
        Self::from_instr(Instr::Fail(erase(error)))
    }

    /// Wrap an externally driven asynchronous operation.
    ///
    /// `start` runs when the scheduler reaches this task. It receives a
    /// one-shot [`Resume`] to call on completion (from any thread) and
    /// returns the function that aborts the operation if the task is
    /// cancelled first.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use oxide_vdom::Task;
    ///
    /// let sleep: Task<(), ()> = Task::binding(|resume| {
    ///     let timer = std::thread::spawn(move || {
    ///         std::thread::sleep(Duration::from_millis(5));
    ///         resume.succeed(());
    ///     });
    ///     move || drop(timer)
    /// });
    /// # let _ = sleep;
    /// ```
    pub fn binding<F, C>(start: F) -> Self
    where
        F: FnOnce(Resume<E, A>) -> C + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self::from_instr(Instr::Binding(Box::new(move |sink: Sink| {
            let cancel = start(Resume {
                sink,
                _types: PhantomData,
            });
            Box::new(cancel) as CancelFn
        })))
    }

    /// Run `f` on success and continue with the task it returns.
    pub fn and_then<B, F>(self, f: F) -> Task<E, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Task<E, B> + Send + 'static,
    {
        Task::from_instr(Instr::AndThen(
            Box::new(self.instr),
            Box::new(move |value| f(unerase::<A>(value)).instr),
        ))
    }

    /// Recover from a failure with the task `f` returns.
    pub fn on_error<E2, F>(self, f: F) -> Task<E2, A>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> Task<E2, A> + Send + 'static,
    {
        Task::from_instr(Instr::OnError(
            Box::new(self.instr),
            Box::new(move |error| f(unerase::<E>(error)).instr),
        ))
    }

    /// Transform the success value.
    pub fn map<B, F>(self, f: F) -> Task<E, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.and_then(move |value| Task::succeed(f(value)))
    }

    /// Transform the failure value.
    pub fn map_err<E2, F>(self, f: F) -> Task<E2, A>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        self.on_error(move |error| Task::fail(f(error)))
    }

    /// Run tasks one after another, collecting their results. The first
    /// failure stops the sequence.
    pub fn sequence(tasks: Vec<Task<E, A>>) -> Task<E, Vec<A>> {
        let capacity = tasks.len();
        tasks
            .into_iter()
            .fold(Task::succeed(Vec::with_capacity(capacity)), |all, task| {
                all.and_then(move |mut values| {
                    task.map(move |value| {
                        values.push(value);
                        values
                    })
                })
            })
    }
}

/// One-shot completion callback handed to [`Task::binding`].
///
/// Completing never runs the task's continuation inline; it enqueues a
/// wake-up that the runtime processes on its own thread.
pub struct Resume<E, A> {
    sink: Sink,
    _types: PhantomData<fn() -> (E, A)>,
}

impl<E: Send + 'static, A: Send + 'static> Resume<E, A> {
    /// Complete the binding successfully.
    pub fn succeed(self, value: A) {
        (self.sink)(Ok(erase(value)));
    }

    /// Complete the binding with a failure.
    pub fn fail(self, error: E) {
        (self.sink)(Err(erase(error)));
    }

    /// Complete the binding with either outcome.
    pub fn complete(self, result: Result<A, E>) {
        match result {
            Ok(value) => self.succeed(value),
            Err(error) => self.fail(error),
        }
    }
}

enum Frame {
    AndThen(Continuation),
    OnError(Continuation),
}

/// Result of running a [`Machine`] for one slice.
pub(crate) enum Step {
    Done(Outcome),
    /// Waiting on a binding; the machine resumes through [`Machine::resume`].
    Suspend(Start),
    /// Budget exhausted with work left.
    Yield,
}

/// Trampoline state of one running task.
pub(crate) struct Machine {
    current: Option<Instr>,
    frames: Vec<Frame>,
}

impl Machine {
    pub(crate) fn new<E, A>(task: Task<E, A>) -> Self {
        Self {
            current: Some(task.instr),
            frames: Vec::new(),
        }
    }

    pub(crate) fn resume(&mut self, outcome: Outcome) {
        self.current = Some(match outcome {
            Ok(value) => Instr::Succeed(value),
            Err(error) => Instr::Fail(error),
        });
    }

    /// Execute at most `budget` instructions.
    pub(crate) fn run(&mut self, budget: usize) -> Step {
        for _ in 0..budget {
            let Some(instr) = self.current.take() else {
                // Suspended machines are only run again after `resume`.
                return Step::Yield;
            };
            match instr {
                Instr::Succeed(value) => match self.unwind(true) {
                    Some(next) => self.current = Some(next(value)),
                    None => return Step::Done(Ok(value)),
                },
                Instr::Fail(error) => match self.unwind(false) {
                    Some(next) => self.current = Some(next(error)),
                    None => return Step::Done(Err(error)),
                },
                Instr::AndThen(inner, next) => {
                    self.frames.push(Frame::AndThen(next));
                    self.current = Some(*inner);
                }
                Instr::OnError(inner, next) => {
                    self.frames.push(Frame::OnError(next));
                    self.current = Some(*inner);
                }
                Instr::Binding(start) => return Step::Suspend(start),
            }
        }
        Step::Yield
    }

    /// Pop frames until one handles the current outcome.
    fn unwind(&mut self, success: bool) -> Option<Continuation> {
        while let Some(frame) = self.frames.pop() {
            match (frame, success) {
                (Frame::AndThen(next), true) | (Frame::OnError(next), false) => return Some(next),
                _ => {}
            }
        }
        None
    }
}
