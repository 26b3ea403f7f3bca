use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use oxide_vdom::{
    attribute, node, on, text, Application, Command, DecodeError, Decoder, Resume, Task, Value,
    VNode,
};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TestMsg {
    Increment,
    Typed(String),
    Loaded(u32),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TestModel {
    pub(crate) count: i32,
    pub(crate) input: String,
    /// Every message in dispatch order.
    pub(crate) log: Vec<TestMsg>,
}

pub(crate) struct TestApp {
    pub(crate) initial_commands: Box<dyn InitialCommandsDependency + Send>,
    pub(crate) commands: Box<dyn CommandsDependency + Send>,
}

#[cfg_attr(test, mockall::automock)]
pub(crate) trait InitialCommandsDependency {
    fn on_init(&self) -> Command<TestMsg>;
}

#[cfg_attr(test, mockall::automock)]
pub(crate) trait CommandsDependency {
    fn on_increment_side_effect(&self) -> Command<TestMsg>;
}

pub(crate) fn input_decoder() -> Decoder<TestMsg> {
    Decoder::new(|event: &Value| {
        event
            .at(["target", "value"])
            .and_then(Value::as_str)
            .map(|value| TestMsg::Typed(value.to_owned()))
            .ok_or_else(|| DecodeError::MissingField("target.value".into()))
    })
}

pub(crate) fn input_event(value: &str) -> Value {
    Value::object([("target", Value::object([("value", Value::from(value))]))])
}

impl Application<TestMsg, TestModel> for TestApp {
    fn init(&self) -> (TestModel, Command<TestMsg>) {
        let model = TestModel {
            count: 0,
            input: String::new(),
            log: Vec::new(),
        };
        (model, self.initial_commands.on_init())
    }

    fn update(&self, msg: TestMsg, model: &TestModel) -> (TestModel, Command<TestMsg>) {
        let mut next = model.clone();
        next.log.push(msg.clone());
        match msg {
            TestMsg::Increment => {
                next.count += 1;
                (next, self.commands.on_increment_side_effect())
            }
            TestMsg::Typed(value) => {
                next.input = value;
                (next, Command::none())
            }
            TestMsg::Loaded(_) | TestMsg::Failed(_) => (next, Command::none()),
        }
    }

    fn view(&self, model: &TestModel) -> VNode<TestMsg> {
        node(
            "div",
            vec![attribute("class", "counter")],
            vec![
                node(
                    "button",
                    vec![on("click", Decoder::succeed(TestMsg::Increment))],
                    vec![text(model.count.to_string())],
                ),
                node("input", vec![on("input", input_decoder())], vec![]),
                text(model.input.clone()),
            ],
        )
    }
}

pub(crate) fn test_app(initial: Command<TestMsg>, on_increment: fn() -> Command<TestMsg>) -> TestApp {
    let mut initial_commands = MockInitialCommandsDependency::new();
    initial_commands.expect_on_init().return_once(move || initial);

    let mut commands = MockCommandsDependency::new();
    commands
        .expect_on_increment_side_effect()
        .returning(move || on_increment());

    TestApp {
        initial_commands: Box::new(initial_commands),
        commands: Box::new(commands),
    }
}

pub(crate) type Slot<E, A> = Arc<Mutex<Option<Resume<E, A>>>>;

pub(crate) fn slot<E, A>() -> Slot<E, A> {
    Arc::new(Mutex::new(None))
}

/// A binding that parks its `Resume` in `slot` and records cancellation.
pub(crate) fn parked<E, A>(slot: &Slot<E, A>, cancelled: &Arc<AtomicBool>) -> Task<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    let slot = slot.clone();
    let cancelled = cancelled.clone();
    Task::binding(move |resume| {
        *slot.lock().unwrap() = Some(resume);
        move || cancelled.store(true, Ordering::SeqCst)
    })
}

pub(crate) fn take<E, A>(slot: &Slot<E, A>) -> Resume<E, A> {
    slot.lock()
        .unwrap()
        .take()
        .expect("binding should have started")
}
