//! Activity E2E tests

use crate::fixtures::{GreeterWorkflow, BEATS, FLAKY, FLAKY_ATTEMPTS, LOCAL, WAITING};
use crate::{eventually, started_env, with_timeout};
use cadence_sdk::prelude::*;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_heartbeats_are_throttled() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let sent: Vec<bool> = with_timeout(stub.execute(BEATS, ())).await.unwrap();
    assert_eq!(sent, vec![true, false, true]);

    let heartbeats = env.proxy().heartbeats();
    assert_eq!(heartbeats.len(), 2);
    let task = &env.proxy().activity_tasks()[0];
    assert_eq!(task.activity_type, "e2e.Greeting::beat");
    assert!(heartbeats.iter().all(|hb| hb.task_token == task.task_token));
    env.shutdown().await;
}

#[tokio::test]
async fn test_local_activity_runs_in_process() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let greeting: String = with_timeout(stub.execute(LOCAL, ("Lou".to_string(),)))
        .await
        .unwrap();
    assert_eq!(greeting, "Hello Lou!");
    assert!(env.proxy().activity_tasks().is_empty());
    env.shutdown().await;
}

#[tokio::test]
async fn test_local_activity_retries() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let attempt: u32 = with_timeout(stub.execute(FLAKY, ())).await.unwrap();
    assert_eq!(attempt, 3);
    assert_eq!(FLAKY_ATTEMPTS.load(Ordering::SeqCst), 3);
    env.shutdown().await;
}

#[tokio::test]
async fn test_cancel_notification_reaches_running_activity() {
    let env = started_env().await;
    let client = env.client();
    let stub = client
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();
    stub.start(WAITING, ()).await.unwrap();

    eventually(|| client.activity_counts().0 == 1).await;
    let task = env.proxy().activity_tasks().remove(0);
    assert!(env.proxy().cancel_activity(&task.task_token).await);

    let err = with_timeout(stub.get_result::<()>()).await.unwrap_err();
    assert!(err.is_cancelled(), "unexpected error: {err}");
    eventually(|| client.activity_counts() == (0, 0)).await;
    env.shutdown().await;
}
