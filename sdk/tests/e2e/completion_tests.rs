//! External activity completion E2E tests

use crate::fixtures::{GreeterWorkflow, APPROVAL};
use crate::{eventually, started_env, with_timeout};
use cadence_sdk::prelude::*;
use cadence_sdk::testing::TestEnvironment;
use cadence_sdk::{ActivityTask, WorkflowStub};

/// Start the approval workflow and wait until its activity is pending.
async fn pending_approval(env: &TestEnvironment) -> (WorkflowStub<GreeterWorkflow>, ActivityTask) {
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();
    stub.start(APPROVAL, ()).await.unwrap();
    eventually(|| env.client().activity_counts().1 == 1).await;
    let task = env.proxy().activity_tasks().remove(0);
    (stub, task)
}

#[tokio::test]
async fn test_complete_by_token() {
    let env = started_env().await;
    let client = env.client();
    let (stub, task) = pending_approval(&env).await;

    client
        .activity_heartbeat_by_token(&task.task_token, Some(b"halfway".to_vec()))
        .await
        .unwrap();
    client
        .activity_complete_by_token(&task.task_token, "approved")
        .await
        .unwrap();

    let result: String = with_timeout(stub.get_result()).await.unwrap();
    assert_eq!(result, "approved");
    assert_eq!(client.activity_counts(), (0, 0));
    assert_eq!(
        env.proxy().heartbeats()[0].details.as_deref(),
        Some(b"halfway".as_slice())
    );

    let err = client
        .activity_complete_by_token(&task.task_token, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, CadenceError::AlreadyCompleted(_)));
    let err = client
        .activity_heartbeat_by_token(&task.task_token, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CadenceError::AlreadyCompleted(_)));
    env.shutdown().await;
}

#[tokio::test]
async fn test_fail_by_id() {
    let env = started_env().await;
    let client = env.client();
    let (stub, task) = pending_approval(&env).await;
    let execution = task.workflow_execution.clone();

    client
        .activity_heartbeat_by_id(&execution, &task.activity_id, None)
        .await
        .unwrap();
    client
        .activity_error_by_id(
            &execution,
            &task.activity_id,
            &CadenceError::custom("Rejected", "the reviewer said no"),
        )
        .await
        .unwrap();

    match with_timeout(stub.get_result::<String>()).await {
        Err(CadenceError::Remote(e)) => {
            assert_eq!(e.reason.as_deref(), Some("Rejected"));
            assert_eq!(e.message, "the reviewer said no");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(client.activity_counts(), (0, 0));

    let err = client
        .activity_cancel_by_id(&execution, &task.activity_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CadenceError::AlreadyCompleted(_)));
    env.shutdown().await;
}

#[tokio::test]
async fn test_cancel_by_token() {
    let env = started_env().await;
    let client = env.client();
    let (stub, task) = pending_approval(&env).await;

    client.activity_cancel_by_token(&task.task_token).await.unwrap();

    let err = with_timeout(stub.get_result::<String>()).await.unwrap_err();
    assert!(err.is_cancelled());
    env.shutdown().await;
}

#[tokio::test]
async fn test_complete_by_id() {
    let env = started_env().await;
    let client = env.client();
    let (stub, task) = pending_approval(&env).await;

    client
        .activity_complete_by_id(&task.workflow_execution, &task.activity_id, "approved by id")
        .await
        .unwrap();

    let result: String = with_timeout(stub.get_result()).await.unwrap();
    assert_eq!(result, "approved by id");
    assert_eq!(client.activity_counts(), (0, 0));
    env.shutdown().await;
}

#[tokio::test]
async fn test_fail_by_token() {
    let env = started_env().await;
    let client = env.client();
    let (stub, task) = pending_approval(&env).await;

    client
        .activity_error_by_token(&task.task_token, &CadenceError::custom("Rejected", "too late"))
        .await
        .unwrap();

    match with_timeout(stub.get_result::<String>()).await {
        Err(CadenceError::Remote(e)) => assert_eq!(e.reason.as_deref(), Some("Rejected")),
        other => panic!("unexpected result: {other:?}"),
    }
    let err = client
        .activity_complete_by_token(&task.task_token, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, CadenceError::AlreadyCompleted(_)));
    env.shutdown().await;
}
