use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use oxide_vdom::{
    Command, Runtime, RuntimeError, Scheduler, SchedulerConfig, Task, TaskState, TestTarget,
};

use super::{
    given_a_step_budget, given_an_initial_command, given_no_initial_command, parked, slot, take,
    test_app, TestMsg,
};

fn long_chain(links: u32, result: u32) -> Task<(), u32> {
    (0..links)
        .fold(Task::<(), u32>::succeed(0), |task, _| {
            task.and_then(|n: u32| Task::succeed(n + 1))
        })
        .map(move |_| result)
}

#[test]
fn given_an_immediate_and_a_pending_task_should_dispatch_in_completion_order() {
    let pending = slot::<(), u32>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut driver = given_an_initial_command(Command::batch(vec![
        Command::perform(Task::<(), u32>::succeed(1), TestMsg::Loaded),
        Command::perform(parked(&pending, &cancelled), TestMsg::Loaded),
    ]));

    driver.process_events();
    driver.emit(TestMsg::Increment);
    take(&pending).succeed(2);
    driver.process_events();

    assert_eq!(
        driver.model().map(|m| m.log.clone()),
        Some(vec![TestMsg::Loaded(1), TestMsg::Increment, TestMsg::Loaded(2)])
    );
    assert!(!cancelled.load(Ordering::SeqCst));
}

#[test]
fn given_a_binding_completed_on_another_thread_should_dispatch_on_the_runtime() {
    let pending = slot::<(), u32>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut driver = given_an_initial_command(Command::perform(
        parked(&pending, &cancelled),
        TestMsg::Loaded,
    ));
    driver.process_events();

    let resume = take(&pending);
    std::thread::spawn(move || resume.succeed(42))
        .join()
        .expect("completion thread panicked");
    driver.process_events();

    assert_eq!(driver.model().map(|m| m.log.clone()), Some(vec![TestMsg::Loaded(42)]));
    assert_eq!(driver.runtime().outstanding_tasks(), 0);
}

#[test]
fn given_a_cancelled_task_should_ignore_its_late_completion() {
    let pending = slot::<(), u32>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut driver = given_no_initial_command();
    let handle = driver
        .runtime()
        .spawn(parked(&pending, &cancelled).map(TestMsg::Loaded))
        .expect("runtime is running");
    driver.process_events();
    assert_eq!(handle.state(), TaskState::Pending);

    assert!(driver.runtime().cancel(handle.id()));
    take(&pending).succeed(7);
    driver.process_events();

    assert!(cancelled.load(Ordering::SeqCst));
    assert_eq!(handle.state(), TaskState::Cancelled);
    assert_eq!(driver.model().map(|m| m.log.len()), Some(0));
    assert!(!driver.runtime().cancel(handle.id()));
}

#[test]
fn given_a_failing_perform_should_produce_no_message() {
    let mut driver = given_an_initial_command(Command::perform(
        Task::<String, u32>::fail("boom".into()),
        TestMsg::Loaded,
    ));

    driver.process_events();

    assert_eq!(driver.model().map(|m| m.log.len()), Some(0));
    assert_eq!(driver.runtime().outstanding_tasks(), 0);
}

#[test]
fn given_a_failing_attempt_should_map_the_failure_into_a_message() {
    let mut driver = given_an_initial_command(Command::attempt(
        Task::<String, u32>::fail("boom".into()),
        |result| match result {
            Ok(value) => TestMsg::Loaded(value),
            Err(error) => TestMsg::Failed(error),
        },
    ));

    driver.process_events();

    assert_eq!(
        driver.model().map(|m| m.log.clone()),
        Some(vec![TestMsg::Failed("boom".into())])
    );
}

#[test]
fn given_a_recovered_sequence_should_collect_every_result() {
    let tasks: Vec<Task<String, u32>> = vec![
        Task::succeed(1),
        Task::fail("missing".into()).on_error(|_: String| Task::succeed(2)),
        Task::succeed(3),
    ];
    let mut driver = given_an_initial_command(Command::perform(Task::sequence(tasks), |values| {
        TestMsg::Loaded(values.iter().sum())
    }));

    driver.process_events();

    assert_eq!(driver.model().map(|m| m.log.clone()), Some(vec![TestMsg::Loaded(6)]));
}

#[test]
fn given_a_small_step_budget_should_let_short_tasks_finish_first() {
    let command = || {
        Command::batch(vec![
            Command::perform(long_chain(100, 1), TestMsg::Loaded),
            Command::perform(Task::<(), u32>::succeed(2), TestMsg::Loaded),
        ])
    };

    let mut interleaved = given_a_step_budget(1, command());
    interleaved.process_events();
    let mut whole = given_a_step_budget(10_000, command());
    whole.process_events();

    assert_eq!(
        interleaved.model().map(|m| m.log.clone()),
        Some(vec![TestMsg::Loaded(2), TestMsg::Loaded(1)])
    );
    assert_eq!(
        whole.model().map(|m| m.log.clone()),
        Some(vec![TestMsg::Loaded(1), TestMsg::Loaded(2)])
    );
}

#[test]
fn given_a_long_chain_should_complete_without_exhausting_the_stack() {
    let mut driver = given_an_initial_command(Command::perform(long_chain(100_000, 9), TestMsg::Loaded));

    driver.process_events();

    assert_eq!(driver.model().map(|m| m.log.clone()), Some(vec![TestMsg::Loaded(9)]));
}

#[test]
fn given_spawned_tasks_should_report_their_lifecycle() {
    let pending = slot::<(), u32>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut driver = given_no_initial_command();
    let waiting = driver
        .runtime()
        .spawn(parked(&pending, &cancelled).map(TestMsg::Loaded))
        .expect("runtime is running");
    let failing = driver
        .runtime()
        .spawn(Task::<String, TestMsg>::fail("nope".into()))
        .expect("runtime is running");

    assert_eq!(waiting.state(), TaskState::Pending);
    driver.process_events();
    assert_eq!(waiting.state(), TaskState::Pending);
    assert_eq!(failing.state(), TaskState::Failed);

    take(&pending).succeed(3);
    driver.process_events();

    assert_eq!(waiting.state(), TaskState::Succeeded);
    assert!(waiting.is_finished());
    assert_ne!(waiting.id(), failing.id());
}

#[test]
fn given_a_stopped_runtime_should_cancel_pending_tasks() {
    let pending = slot::<(), u32>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut driver = given_an_initial_command(Command::perform(
        parked(&pending, &cancelled),
        TestMsg::Loaded,
    ));
    driver.process_events();

    driver.runtime().stop();
    take(&pending).succeed(1);

    assert!(cancelled.load(Ordering::SeqCst));
    assert_eq!(driver.runtime().process_queued(), Err(RuntimeError::Stopped));
    assert_eq!(driver.runtime().outstanding_tasks(), 0);
    assert!(!driver.runtime().is_running());
    assert_eq!(driver.target().snapshot(), None);
}

#[test]
fn given_a_dropped_runtime_should_cancel_pending_tasks() {
    let pending = slot::<(), u32>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut driver = given_an_initial_command(Command::perform(
        parked(&pending, &cancelled),
        TestMsg::Loaded,
    ));
    driver.process_events();
    assert!(!cancelled.load(Ordering::SeqCst));

    drop(driver);

    assert!(cancelled.load(Ordering::SeqCst));
}

#[test]
fn given_a_stopped_runtime_should_refuse_late_messages() {
    let mut driver = given_no_initial_command();
    let emitter = driver.runtime().emitter();
    assert!(emitter.is_connected());

    driver.runtime().stop();
    emitter.emit(TestMsg::Increment);

    assert!(!emitter.is_connected());
    assert_eq!(driver.model().map(|m| m.count), Some(0));
}

#[test]
fn given_a_standalone_scheduler_should_run_spawn_and_kill_tasks() {
    let pending = slot::<(), u32>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut runtime = Runtime::new(test_app(Command::none(), Command::none), TestTarget::new());
    let mut scheduler = Scheduler::new(runtime.emitter(), SchedulerConfig::default());

    let immediate = scheduler.spawn(Task::<(), TestMsg>::succeed(TestMsg::Loaded(1)));
    let waiting = scheduler.spawn(parked(&pending, &cancelled).map(TestMsg::Loaded));
    scheduler.run_ready();

    assert_eq!(immediate.state(), TaskState::Succeeded);
    assert_eq!(waiting.state(), TaskState::Pending);
    assert_eq!(scheduler.outstanding(), 1);

    assert!(scheduler.kill(waiting.id()));
    assert!(cancelled.load(Ordering::SeqCst));
    assert_eq!(waiting.state(), TaskState::Cancelled);

    runtime.start().expect("fresh runtime starts");
    runtime.process_queued().expect("runtime is running");
    assert_eq!(runtime.model().map(|m| m.log.clone()), Some(vec![TestMsg::Loaded(1)]));
}
