//! The runtime mailbox and its sending half.

use flume::Sender;

use crate::scheduler::Wake;

/// Everything that can wake the runtime, in arrival order.
pub(crate) enum Envelope<Msg> {
    Message(Msg),
    Wake(Wake),
    Shutdown,
}

/// The single stable entry point for feeding the runtime.
///
/// Event listeners and task callbacks hold a clone of the runtime's emitter
/// instead of closing over any model state. `Emitter` wraps a channel
/// sender, so it is cheap to clone and may be used from any thread; sending
/// only enqueues, the runtime processes the mailbox on its own thread.
///
/// ```rust
/// use oxide_vdom::{node, text, Application, Command, Runtime, TestTarget, VNode};
///
/// #[derive(Clone)]
/// enum Msg { Tick }
///
/// struct Clock;
///
/// impl Application<Msg, u32> for Clock {
///     fn init(&self) -> (u32, Command<Msg>) {
///         (0, Command::none())
///     }
///
///     fn update(&self, msg: Msg, model: &u32) -> (u32, Command<Msg>) {
///         match msg {
///             Msg::Tick => (model + 1, Command::none()),
///         }
///     }
///
///     fn view(&self, model: &u32) -> VNode<Msg> {
///         node("time", vec![], vec![text(model.to_string())])
///     }
/// }
///
/// let mut runtime = Runtime::new(Clock, TestTarget::new());
/// runtime.start().unwrap();
///
/// // e.g. from a timer thread
/// let emitter = runtime.emitter();
/// emitter.emit(Msg::Tick);
///
/// runtime.process_queued().unwrap();
/// assert_eq!(runtime.model(), Some(&1));
/// ```
pub struct Emitter<Msg: Send>(pub(crate) Sender<Envelope<Msg>>);

impl<Msg: Send> Clone for Emitter<Msg> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<Msg: Send> Emitter<Msg> {
    pub(crate) fn new(sender: Sender<Envelope<Msg>>) -> Self {
        Self(sender)
    }

    /// Queue a message for dispatch.
    ///
    /// A message sent after the runtime is gone is silently dropped.
    pub fn emit(&self, msg: Msg) {
        self.0.send(Envelope::Message(msg)).ok();
    }

    /// Ask a running event loop to stop once it reaches this point in the
    /// mailbox.
    pub fn shutdown(&self) {
        self.0.send(Envelope::Shutdown).ok();
    }

    /// Whether a runtime is still receiving from this emitter.
    pub fn is_connected(&self) -> bool {
        !self.0.is_disconnected()
    }

    pub(crate) fn wake(&self, wake: Wake) {
        self.0.send(Envelope::Wake(wake)).ok();
    }
}
