//! Workflow stub E2E tests

use crate::fixtures::{GreeterWorkflow, NamedWorkflow, CURRENT, FAMILY, HELLO, RUN, SET_NAME};
use crate::{eventually, started_env, with_timeout};
use cadence_sdk::prelude::*;
use cadence_sdk::testing::{Registration, RegistrationKind, TestEnvironment};
use cadence_sdk::ErrorType;

#[tokio::test]
async fn test_hello_workflow_calls_activity() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let greeting: String = with_timeout(stub.execute(HELLO, ("Jeff".to_string(),)))
        .await
        .unwrap();
    assert_eq!(greeting, "Hello Jeff!");

    let registrations = env.proxy().registrations();
    for (kind, name) in [
        (RegistrationKind::Workflow, "e2e.Greeter"),
        (RegistrationKind::Workflow, "e2e.Greeter::family"),
        (RegistrationKind::Activity, "e2e.Greeting"),
        (RegistrationKind::Activity, "e2e.Greeting::beat"),
    ] {
        assert!(
            registrations.contains(&Registration {
                kind,
                name: name.to_string(),
                domain: TestEnvironment::DOMAIN.to_string(),
            }),
            "{name} was not registered"
        );
    }
    env.shutdown().await;
}

#[tokio::test]
async fn test_typed_stub_starts_once() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let execution = stub.start(HELLO, ("Ann".to_string(),)).await.unwrap();
    assert_eq!(stub.execution(), Some(execution));

    let err = stub.start(HELLO, ("Ann".to_string(),)).await.unwrap_err();
    assert!(matches!(err, CadenceError::InvalidOperation(_)));

    let greeting: String = with_timeout(stub.get_result()).await.unwrap();
    assert_eq!(greeting, "Hello Ann!");
    env.shutdown().await;
}

#[tokio::test]
async fn test_stub_rejects_members_of_other_interfaces() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let err = stub.start(RUN, ()).await.unwrap_err();
    assert!(matches!(err, CadenceError::InvalidOperation(_)));
    assert!(stub.execution().is_none());
    env.shutdown().await;
}

#[tokio::test]
async fn test_untyped_stub_start_twice_and_attach() {
    let env = started_env().await;
    let client = env.client();
    let options = WorkflowOptions::new().with_workflow_id("untyped-hello");
    let stub = client.new_untyped_workflow_stub("e2e.Greeter", options).unwrap();

    // arguments are converted to the declared parameter type
    let execution = stub.start((42,)).await.unwrap();
    assert_eq!(execution.workflow_id, "untyped-hello");

    let err = stub.start(("again",)).await.unwrap_err();
    assert!(matches!(err, CadenceError::InvalidOperation(_)));

    let greeting: String = with_timeout(stub.get_result()).await.unwrap();
    assert_eq!(greeting, "Hello 42!");

    let attached = client
        .attach_untyped_workflow_stub(execution.clone(), None)
        .unwrap();
    assert_eq!(attached.execution(), Some(execution));
    assert!(attached.start(("late",)).await.is_err());
    let again: String = with_timeout(attached.get_result()).await.unwrap();
    assert_eq!(again, greeting);
    env.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_starts_launch_one_execution() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_untyped_workflow_stub("e2e.Greeter", WorkflowOptions::new())
        .unwrap();

    let (a, b) = tokio::join!(stub.start(("a",)), stub.start(("b",)));
    let (started, rejected) = match (a, b) {
        (Ok(execution), Err(err)) | (Err(err), Ok(execution)) => (execution, err),
        other => panic!("expected exactly one start to succeed: {other:?}"),
    };
    assert!(matches!(rejected, CadenceError::InvalidOperation(_)));
    assert_eq!(stub.execution(), Some(started));
    assert_eq!(env.proxy().executions().len(), 1);

    let greeting: String = with_timeout(stub.get_result()).await.unwrap();
    assert!(greeting == "Hello a!" || greeting == "Hello b!");
    env.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_typed_starts_launch_one_execution() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let (a, b) = tokio::join!(
        stub.start(HELLO, ("a".to_string(),)),
        stub.start(HELLO, ("b".to_string(),))
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(env.proxy().executions().len(), 1);

    let _: String = with_timeout(stub.get_result()).await.unwrap();
    env.shutdown().await;
}

#[tokio::test]
async fn test_failed_start_can_be_retried() {
    let env = started_env().await;
    let client = env.client();
    let options = WorkflowOptions::new()
        .with_workflow_id("retry-start")
        .with_id_reuse_policy(WorkflowIdReusePolicy::AllowDuplicate);
    let waiting = client
        .new_workflow_stub::<NamedWorkflow>(options.clone())
        .unwrap();
    waiting.start(RUN, ()).await.unwrap();

    // a running execution holds the id
    let stub = client.new_workflow_stub::<GreeterWorkflow>(options).unwrap();
    assert!(stub.start(HELLO, ("two".to_string(),)).await.is_err());
    assert!(stub.execution().is_none());

    waiting.cancel().await.unwrap();
    assert!(with_timeout(waiting.get_result::<String>()).await.is_err());

    // the rejected start left the stub unbound
    let greeting: String = with_timeout(stub.execute(HELLO, ("two".to_string(),)))
        .await
        .unwrap();
    assert_eq!(greeting, "Hello two!");
    env.shutdown().await;
}

#[tokio::test]
async fn test_untyped_stub_rejects_separator_in_type_name() {
    let env = started_env().await;
    let err = env
        .client()
        .new_untyped_workflow_stub("e2e::Greeter::hello", WorkflowOptions::new())
        .unwrap_err();
    assert!(err.is_validation_error());
    env.shutdown().await;
}

#[tokio::test]
async fn test_workflow_id_reuse_policy() {
    let env = started_env().await;
    let client = env.client();
    let start = |policy: WorkflowIdReusePolicy| {
        client.new_workflow_stub::<GreeterWorkflow>(
            WorkflowOptions::new()
                .with_workflow_id("reused")
                .with_id_reuse_policy(policy),
        )
    };

    let first = start(WorkflowIdReusePolicy::AllowDuplicate).unwrap();
    let _: String = with_timeout(first.execute(HELLO, ("one".to_string(),)))
        .await
        .unwrap();

    let rejected = start(WorkflowIdReusePolicy::AllowDuplicateFailedOnly).unwrap();
    match rejected.start(HELLO, ("two".to_string(),)).await {
        Err(CadenceError::Remote(e)) => {
            assert_eq!(e.reason.as_deref(), Some("WorkflowExecutionAlreadyStartedError"));
        }
        other => panic!("unexpected start outcome: {other:?}"),
    }

    let allowed = start(WorkflowIdReusePolicy::AllowDuplicate).unwrap();
    let greeting: String = with_timeout(allowed.execute(HELLO, ("three".to_string(),)))
        .await
        .unwrap();
    assert_eq!(greeting, "Hello three!");
    assert_ne!(first.execution(), allowed.execution());
    env.shutdown().await;
}

#[tokio::test]
async fn test_signal_and_query() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<NamedWorkflow>(WorkflowOptions::new())
        .unwrap();
    stub.start(RUN, ()).await.unwrap();

    // queries fail until the run has reached the worker
    let mut current: Option<Option<String>> = None;
    with_timeout(async {
        while current.is_none() {
            current = stub.query(CURRENT, ()).await.ok();
            if current.is_none() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        }
    })
    .await;
    assert_eq!(current, Some(None));

    let previous = stub.signal(SET_NAME, ("Bo".to_string(),)).await.unwrap();
    assert_eq!(previous, None);
    let name: String = with_timeout(stub.get_result()).await.unwrap();
    assert_eq!(name, "Bo");

    // the run is closed now
    assert!(stub.signal(SET_NAME, ("Cy".to_string(),)).await.is_err());
    env.shutdown().await;
}

#[tokio::test]
async fn test_cancel_workflow() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<NamedWorkflow>(WorkflowOptions::new())
        .unwrap();
    stub.start(RUN, ()).await.unwrap();
    stub.cancel().await.unwrap();

    let err = with_timeout(stub.get_result::<String>()).await.unwrap_err();
    assert!(err.is_cancelled());
    env.shutdown().await;
}

#[tokio::test]
async fn test_terminate_untyped() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_untyped_workflow_stub("e2e.Named", WorkflowOptions::new())
        .unwrap();
    stub.start(()).await.unwrap();
    stub.terminate("no longer needed", None).await.unwrap();

    match with_timeout(stub.get_result::<String>()).await {
        Err(CadenceError::Remote(e)) => assert_eq!(e.error_type, ErrorType::Terminated),
        other => panic!("unexpected result: {other:?}"),
    }
    env.shutdown().await;
}

#[tokio::test]
async fn test_child_workflow() {
    let env = started_env().await;
    let stub = env
        .client()
        .new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())
        .unwrap();

    let greeting: String = with_timeout(stub.execute(FAMILY, ("Kid".to_string(),)))
        .await
        .unwrap();
    assert_eq!(greeting, "Hello Kid! says the family");
    eventually(|| env.proxy().executions().len() == 2).await;
    env.shutdown().await;
}
