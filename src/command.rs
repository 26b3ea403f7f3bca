//! Commands: tasks whose outcome is turned into application messages.

use crate::Task;

/// Declarative description of effects that eventually produce messages.
///
/// Commands are returned from [`Application::init`](crate::Application::init)
/// and [`Application::update`](crate::Application::update) alongside the new
/// model. The runtime hands them to its scheduler; the application only
/// observes their completion as newly dispatched messages.
///
/// # Example
///
/// ```rust
/// use oxide_vdom::{Command, Task};
///
/// #[derive(Clone)]
/// enum Msg {
///     Refresh,
///     Loaded(Result<String, String>),
/// }
///
/// // Trigger a follow-up message
/// let command = Command::just(Msg::Refresh);
///
/// // Map a task's outcome into a message, failures included
/// let fetch: Task<String, String> = Task::succeed("cached".to_string());
/// let command = Command::batch(vec![command, Command::attempt(fetch, Msg::Loaded)]);
///
/// // No side effects
/// let command: Command<Msg> = Command::none();
/// # let _ = command;
/// ```
pub struct Command<Msg> {
    tasks: Vec<Task<(), Msg>>,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// Create an empty command.
    ///
    /// Prefer this when semantically indicating "no side effects".
    pub fn none() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Create a command that immediately produces `msg`.
    pub fn just(msg: Msg) -> Self {
        Self {
            tasks: vec![Task::succeed(msg)],
        }
    }

    /// Combine commands. Their tasks are scheduled in order.
    pub fn batch(commands: Vec<Command<Msg>>) -> Self {
        Self {
            tasks: commands.into_iter().flat_map(|c| c.tasks).collect(),
        }
    }

    /// Run `task` and turn its success into a message.
    ///
    /// A failure is terminal for this task only: it is logged and no message
    /// is produced.
    pub fn perform<E, A, F>(task: Task<E, A>, f: F) -> Self
    where
        E: Send + 'static,
        A: Send + 'static,
        F: FnOnce(A) -> Msg + Send + 'static,
    {
        Self {
            tasks: vec![task.map(f).map_err(|_| ())],
        }
    }

    /// Run `task` and turn either outcome into a message.
    pub fn attempt<E, A, F>(task: Task<E, A>, f: F) -> Self
    where
        E: Send + 'static,
        A: Send + 'static,
        F: FnOnce(Result<A, E>) -> Msg + Send + 'static,
    {
        let settled: Task<(), Result<A, E>> = task
            .map(Ok)
            .on_error(|error| Task::succeed(Err(error)));
        Self {
            tasks: vec![settled.map(f)],
        }
    }

    /// Lift the produced messages into another message type.
    pub fn map<B, F>(self, f: F) -> Command<B>
    where
        B: Send + 'static,
        F: FnOnce(Msg) -> B + Clone + Send + 'static,
    {
        Command {
            tasks: self
                .tasks
                .into_iter()
                .map(|task| task.map(f.clone()))
                .collect(),
        }
    }

    /// Whether the command schedules no task.
    pub fn is_none(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn into_tasks(self) -> Vec<Task<(), Msg>> {
        self.tasks
    }
}

impl<Msg: Send + 'static> Default for Command<Msg> {
    fn default() -> Self {
        Self::none()
    }
}
