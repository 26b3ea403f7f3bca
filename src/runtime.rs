//! The program runtime that orchestrates the update/render loop.

use flume::Receiver;

use crate::apply::Applier;
use crate::emitter::Envelope;
use crate::scheduler::{ProcessId, Scheduler, TaskHandle};
use crate::target::RenderTarget;
use crate::{diff, Application, Emitter, RuntimeError, SchedulerConfig, Task, VNode};

#[cfg(any(test, feature = "testing"))]
use crate::target::TestTarget;
#[cfg(any(test, feature = "testing"))]
use crate::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Stopped,
}

/// The MVU runtime that owns the model, the scheduler and the rendered tree.
///
/// This is the core of the framework. It:
/// 1. Initializes the model and startup commands via [`Application::init`]
/// 2. Renders the model via [`Application::view`] and mounts it into the
///    render target
/// 3. Processes each message through [`Application::update`], schedules the
///    returned commands, re-renders, diffs against the previous tree and
///    patches the target
///
/// Messages and task wake-ups share one FIFO mailbox. Each message is fully
/// dispatched and rendered before the next one is taken, so two updates
/// never interleave. Messages can be sent from any thread through the
/// runtime's [`Emitter`] but are processed where the runtime is driven.
///
/// For testing with manual control, use [`TestRuntime`] or call
/// [`process_queued`](Self::process_queued) directly.
///
/// # Type Parameters
///
/// * `Msg` - The message type for your application
/// * `Model` - The model/state type for your application
/// * `App` - The application implementation type (implements [`Application`])
/// * `Target` - The render target type (implements [`RenderTarget`])
pub struct Runtime<Msg, Model, App, Target>
where
    Msg: Send + 'static,
    App: Application<Msg, Model>,
    Target: RenderTarget<Msg>,
{
    app: App,
    model: Option<Model>,
    tree: Option<VNode<Msg>>,
    scheduler: Scheduler<Msg>,
    applier: Applier<Msg, Target>,
    mailbox: Receiver<Envelope<Msg>>,
    emitter: Emitter<Msg>,
    phase: Phase,
}

impl<Msg, Model, App, Target> Runtime<Msg, Model, App, Target>
where
    Msg: Send + 'static,
    App: Application<Msg, Model>,
    Target: RenderTarget<Msg>,
{
    /// Create a new runtime with the default scheduler configuration.
    ///
    /// The runtime will not be started until [`start`](Self::start) or
    /// [`run`](Self::run) is called.
    pub fn new(app: App, target: Target) -> Self {
        Self::with_config(app, target, SchedulerConfig::default())
    }

    /// Create a new runtime with an explicit scheduler configuration.
    pub fn with_config(app: App, target: Target, config: SchedulerConfig) -> Self {
        let (sender, mailbox) = flume::unbounded();
        let emitter = Emitter::new(sender);

        Runtime {
            app,
            model: None,
            tree: None,
            scheduler: Scheduler::new(emitter.clone(), config),
            applier: Applier::new(target, emitter.clone()),
            mailbox,
            emitter,
            phase: Phase::Created,
        }
    }

    /// Initialize the application and mount the first render.
    ///
    /// - Calls [`Application::init`] and schedules the startup commands.
    /// - Renders the initial model and mounts it from an empty baseline.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        match self.phase {
            Phase::Created => {}
            Phase::Running => return Err(RuntimeError::AlreadyStarted),
            Phase::Stopped => return Err(RuntimeError::Stopped),
        }

        let (model, command) = self.app.init();
        self.scheduler.spawn_command(command);
        self.model = Some(model);
        self.render();
        self.phase = Phase::Running;
        tracing::debug!("runtime started");
        Ok(())
    }

    /// Process everything currently in the mailbox.
    ///
    /// Runs ready tasks, dispatches queued messages one at a time and feeds
    /// completed bindings back into the scheduler, until nothing is left to
    /// do without waiting on an external callback.
    pub fn process_queued(&mut self) -> Result<(), RuntimeError> {
        self.ensure_running()?;
        loop {
            self.scheduler.run_ready();
            match self.mailbox.try_recv() {
                Ok(envelope) => {
                    if !self.handle(envelope) {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// Start the runtime if needed and process the mailbox until
    /// [`Emitter::shutdown`] is received.
    ///
    /// This is an async function that runs the event loop. Await it on your
    /// chosen executor; messages emitted from other threads wake it up.
    pub async fn run(&mut self) -> Result<(), RuntimeError> {
        if self.phase == Phase::Created {
            self.start()?;
        }
        loop {
            self.process_queued()?;
            if self.phase == Phase::Stopped {
                return Ok(());
            }
            match self.mailbox.recv_async().await {
                Ok(envelope) => {
                    if !self.handle(envelope) {
                        return Ok(());
                    }
                }
                Err(_) => return Ok(()),
            }
        }
    }

    /// Cancel every task, detach every listener and unmount the view.
    ///
    /// Queued messages are dropped and later emits are refused. A stopped
    /// runtime cannot be restarted.
    pub fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.scheduler.shutdown();
        self.applier.unmount();
        // Swap in a closed mailbox so late emits and wake-ups are refused.
        let (_, closed) = flume::unbounded();
        self.mailbox = closed;
        self.phase = Phase::Stopped;
        tracing::debug!("runtime stopped");
    }

    /// Schedule a task outside of `update`, e.g. a host-driven subscription.
    pub fn spawn<E: Send + 'static>(&mut self, task: Task<E, Msg>) -> Result<TaskHandle, RuntimeError> {
        if self.phase == Phase::Stopped {
            return Err(RuntimeError::Stopped);
        }
        Ok(self.scheduler.spawn(task))
    }

    /// Cancel a task before it completes. Its binding callback, should it
    /// still fire, is ignored.
    pub fn cancel(&mut self, id: ProcessId) -> bool {
        self.scheduler.kill(id)
    }

    /// A handle for queueing messages from any thread.
    pub fn emitter(&self) -> Emitter<Msg> {
        self.emitter.clone()
    }

    /// The current model, once started.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// The most recently rendered tree.
    pub fn view_tree(&self) -> Option<&VNode<Msg>> {
        self.tree.as_ref()
    }

    /// The render target the view is mounted into.
    pub fn target(&self) -> &Target {
        self.applier.target()
    }

    /// Whether the runtime has started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Tasks that have not finished yet.
    pub fn outstanding_tasks(&self) -> usize {
        self.scheduler.outstanding()
    }

    fn ensure_running(&self) -> Result<(), RuntimeError> {
        match self.phase {
            Phase::Created => Err(RuntimeError::NotStarted),
            Phase::Running => Ok(()),
            Phase::Stopped => Err(RuntimeError::Stopped),
        }
    }

    /// Returns `false` once the loop should stop.
    fn handle(&mut self, envelope: Envelope<Msg>) -> bool {
        match envelope {
            Envelope::Message(msg) => self.dispatch(msg),
            Envelope::Wake(wake) => self.scheduler.resume(wake),
            Envelope::Shutdown => {
                self.stop();
                return false;
            }
        }
        true
    }

    fn dispatch(&mut self, msg: Msg) {
        let Some(model) = self.model.as_ref() else {
            return;
        };
        let span = tracing::debug_span!("dispatch");
        let _entered = span.enter();

        let (next, command) = self.app.update(msg, model);
        self.model = Some(next);
        self.scheduler.spawn_command(command);
        self.render();
    }

    fn render(&mut self) {
        let Some(model) = self.model.as_ref() else {
            return;
        };
        let tree = self.app.view(model);
        match &self.tree {
            Some(previous) => {
                let patch = diff(previous, &tree);
                tracing::trace!(stats = ?patch.stats(), "rendered");
                self.applier.apply(patch);
            }
            None => self.applier.mount(&tree),
        }
        self.tree = Some(tree);
    }
}

#[cfg(any(test, feature = "testing"))]
/// Test runtime driver for manual event processing control.
///
/// Only available with the `testing` feature or during tests.
///
/// Returned by [`TestRuntime::run`]. Provides methods to emit messages, fire
/// native events and process the mailbox for precise control in tests.
///
/// See [`TestRuntime`] for usage.
pub struct TestDriver<Msg, Model, App>
where
    Msg: Send + 'static,
    App: Application<Msg, Model>,
{
    runtime: Runtime<Msg, Model, App, TestTarget<Msg>>,
    target: TestTarget<Msg>,
}

#[cfg(any(test, feature = "testing"))]
impl<Msg, Model, App> TestDriver<Msg, Model, App>
where
    Msg: Send + 'static,
    App: Application<Msg, Model>,
{
    /// Process all queued messages and wake-ups.
    ///
    /// Call this after emitting messages or firing events to drive the loop.
    pub fn process_events(&mut self) {
        if let Err(error) = self.runtime.process_queued() {
            tracing::warn!(%error, "test driver processed a runtime that is not running");
        }
    }

    /// Queue a message for the next [`process_events`](Self::process_events).
    pub fn emit(&self, msg: Msg) {
        self.runtime.emitter().emit(msg);
    }

    /// Block the current thread on the event loop until a shutdown arrives.
    ///
    /// Messages emitted from other threads wake the loop.
    pub fn run_until_shutdown(&mut self) -> Result<(), RuntimeError> {
        futures::executor::block_on(self.runtime.run())
    }

    /// Fire a native event on the node at `path` below the root.
    pub fn fire(&self, path: &[usize], event: &str, payload: &Value) -> usize {
        self.target.fire(path, event, payload)
    }

    /// The current model.
    pub fn model(&self) -> Option<&Model> {
        self.runtime.model()
    }

    /// The in-memory document the view is rendered into.
    pub fn target(&self) -> &TestTarget<Msg> {
        &self.target
    }

    /// The underlying runtime, for lifecycle and task control.
    pub fn runtime(&mut self) -> &mut Runtime<Msg, Model, App, TestTarget<Msg>> {
        &mut self.runtime
    }
}

#[cfg(any(test, feature = "testing"))]
/// Test runtime with manual event processing control.
///
/// Only available with the `testing` feature or during tests.
///
/// Renders into a [`TestTarget`] and never processes the mailbox on its
/// own; tests call [`process_events`](TestDriver::process_events).
///
/// ```rust
/// use oxide_vdom::{node, on, text, Application, Command, Decoder, TestRuntime, Value, VNode};
///
/// #[derive(Clone)]
/// enum Msg { Increment }
///
/// struct Counter;
///
/// impl Application<Msg, i32> for Counter {
///     fn init(&self) -> (i32, Command<Msg>) { (0, Command::none()) }
///     fn update(&self, msg: Msg, model: &i32) -> (i32, Command<Msg>) {
///         match msg { Msg::Increment => (model + 1, Command::none()) }
///     }
///     fn view(&self, model: &i32) -> VNode<Msg> {
///         node("button", vec![on("click", Decoder::succeed(Msg::Increment))], vec![text(model.to_string())])
///     }
/// }
///
/// let mut driver = TestRuntime::new(Counter).run();
/// driver.fire(&[], "click", &Value::Null);
/// driver.process_events(); // Manually process events
/// assert_eq!(driver.model(), Some(&1));
/// ```
pub struct TestRuntime<Msg, Model, App>
where
    Msg: Send + 'static,
    App: Application<Msg, Model>,
{
    runtime: Runtime<Msg, Model, App, TestTarget<Msg>>,
    target: TestTarget<Msg>,
}

#[cfg(any(test, feature = "testing"))]
impl<Msg, Model, App> TestRuntime<Msg, Model, App>
where
    Msg: Send + 'static,
    App: Application<Msg, Model>,
{
    /// Create a test runtime with the default scheduler configuration.
    pub fn new(app: App) -> Self {
        Self::with_config(app, SchedulerConfig::default())
    }

    /// Create a test runtime with an explicit scheduler configuration.
    pub fn with_config(app: App, config: SchedulerConfig) -> Self {
        let target = TestTarget::new();
        TestRuntime {
            runtime: Runtime::with_config(app, target.clone(), config),
            target,
        }
    }

    /// Starts the runtime and returns a driver for manual event processing.
    ///
    /// Startup commands are scheduled but not run until the first
    /// [`process_events`](TestDriver::process_events).
    pub fn run(mut self) -> TestDriver<Msg, Model, App> {
        self.runtime
            .start()
            .expect("a freshly created runtime always starts");
        TestDriver {
            runtime: self.runtime,
            target: self.target,
        }
    }
}
