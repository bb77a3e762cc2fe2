// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use sitepipe::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use sitepipe_test_utils::fake_executor::FakeExecutor;
use sitepipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn exit_when_idle() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
    }
}

fn trigger(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason: TriggerReason::FileWatch,
    }
}

fn completed(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome: TaskOutcome::Success,
    }
}

#[tokio::test]
async fn burst_of_triggers_while_running_reruns_once() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::holding(executed.clone());

    // First trigger starts `style`; the next two land while it is running.
    for event in [
        trigger("style"),
        trigger("style"),
        trigger("style"),
        completed("style"),
        completed("style"),
    ] {
        rt_tx.send(event).await?;
    }

    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, exit_when_idle());
    with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert_eq!(*executed.lock().unwrap(), vec!["style", "style"]);
    Ok(())
}

#[tokio::test]
async fn drop_mode_ignores_triggers_for_running_tasks() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    rt_tx.send(trigger("markup")).await?;
    rt_tx.send(trigger("markup")).await?;

    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Drop, exit_when_idle());
    with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert_eq!(*executed.lock().unwrap(), vec!["markup"]);
    Ok(())
}

#[tokio::test]
async fn failed_task_does_not_stop_the_loop() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone()).failing("preprocessor");

    // The second trigger is queued behind the failing first run and still
    // gets its turn.
    rt_tx.send(trigger("preprocessor")).await?;
    rt_tx.send(trigger("preprocessor")).await?;

    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, exit_when_idle());
    with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert_eq!(*executed.lock().unwrap(), vec!["preprocessor", "preprocessor"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_request_ends_a_watching_runtime() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    rt_tx.send(trigger("script")).await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
    with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert_eq!(*executed.lock().unwrap(), vec!["script"]);
    Ok(())
}
