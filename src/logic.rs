//! Application trait defining the MVU contract.

use crate::{Command, VNode};

/// Application trait defining the MVU contract.
///
/// Implementations must provide three pure functions:
/// - [`init`](Self::init): Produce the initial model and startup commands
/// - [`update`](Self::update): Transform (Msg, Model) → (Model, Command)
/// - [`view`](Self::view): Render the model to a virtual tree
///
/// Side effects happen only through the returned [`Command`]s.
///
/// See the [crate-level documentation](crate) for a complete example.
pub trait Application<Msg: Send, Model> {
    /// Called once when the runtime starts.
    ///
    /// # Returns
    ///
    /// A tuple of `(Model, Command<Msg>)` containing the initial model
    /// and any commands to schedule during startup.
    fn init(&self) -> (Model, Command<Msg>);

    /// Reduce a message to an updated model and commands.
    ///
    /// The current model is never mutated; the returned model replaces it.
    ///
    /// # Arguments
    ///
    /// * `msg` - The message to process
    /// * `model` - The current model state
    fn update(&self, msg: Msg, model: &Model) -> (Model, Command<Msg>);

    /// Render the model.
    ///
    /// Event listeners in the returned tree carry [`Decoder`](crate::Decoder)s
    /// instead of callbacks; the runtime routes decoded messages back into
    /// [`update`](Self::update).
    fn view(&self, model: &Model) -> VNode<Msg>;
}

impl<Msg: Send, Model, A: Application<Msg, Model> + ?Sized> Application<Msg, Model> for Box<A> {
    fn init(&self) -> (Model, Command<Msg>) {
        (**self).init()
    }

    fn update(&self, msg: Msg, model: &Model) -> (Model, Command<Msg>) {
        (**self).update(msg, model)
    }

    fn view(&self, model: &Model) -> VNode<Msg> {
        (**self).view(model)
    }
}
