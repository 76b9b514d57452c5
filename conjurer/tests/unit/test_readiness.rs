//! Readiness poller tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use conjurer::deploy::readiness::{wait_for_ready, Options};
use conjurer::errors::ConjureError;
use conjurer::filesys::file::File;

use crate::helpers::{broken, failed, ok, pending, ready, ScriptedRunner, Scripted, SpellFixture};

struct Poll {
    result: Result<(), ConjureError>,
    progress: Vec<String>,
    sleeps: usize,
}

async fn poll(fixture: &SpellFixture, runner: &ScriptedRunner) -> Poll {
    let sleeps = Arc::new(AtomicUsize::new(0));
    let mut progress = Vec::new();
    let counter = sleeps.clone();

    let result = wait_for_ready(
        &Options::default(),
        &File::new(fixture.deploy_done()),
        runner,
        &HashMap::new(),
        |message| progress.push(message),
        move |_wait: Duration| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        },
    )
    .await;

    Poll {
        result,
        progress,
        sleeps: sleeps.load(Ordering::SeqCst),
    }
}

#[tokio::test]
async fn test_complete_resolves_without_retry() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(fixture.deploy_done(), vec![ready()]);

    let poll = poll(&fixture, &runner).await;

    assert!(poll.result.is_ok());
    assert_eq!(runner.calls().len(), 1);
    assert!(poll.progress.is_empty());
    assert_eq!(poll.sleeps, 0);
}

#[tokio::test]
async fn test_progress_fires_once_across_retries() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(
        fixture.deploy_done(),
        vec![
            pending("starting"),
            pending("still starting"),
            pending("almost"),
            ready(),
        ],
    );

    let poll = poll(&fixture, &runner).await;

    assert!(poll.result.is_ok());
    assert_eq!(poll.progress, vec!["starting, please wait".to_string()]);
    assert_eq!(poll.sleeps, 3);
    assert_eq!(runner.calls().len(), 4);
}

#[tokio::test]
async fn test_starting_then_complete() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(
        fixture.deploy_done(),
        vec![
            ok(r#"{"isComplete": false, "message": "starting"}"#),
            ok(r#"{"isComplete": true, "returnCode": 0}"#),
        ],
    );

    let poll = poll(&fixture, &runner).await;

    assert!(poll.result.is_ok());
    assert_eq!(poll.progress, vec!["starting, please wait".to_string()]);
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn test_return_code_stops_immediately() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(
        fixture.deploy_done(),
        vec![
            broken(1, "mysql hook failed"),
            ready(),
        ],
    );

    let poll = poll(&fixture, &runner).await;

    match poll.result {
        Err(ConjureError::DeploymentFailure(message)) => assert_eq!(message, "mysql hook failed"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(runner.calls().len(), 1);
    assert!(poll.progress.is_empty());
}

#[tokio::test]
async fn test_return_code_wins_over_complete() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(
        fixture.deploy_done(),
        vec![ok(r#"{"isComplete": true, "returnCode": 2, "message": "bad"}"#)],
    );

    let poll = poll(&fixture, &runner).await;
    assert!(matches!(poll.result, Err(ConjureError::DeploymentFailure(_))));
}

#[tokio::test]
async fn test_non_zero_exit_is_script_failure() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(fixture.deploy_done(), vec![failed(3, "boom")]);

    let poll = poll(&fixture, &runner).await;

    match poll.result {
        Err(ConjureError::ScriptFailure { code, stderr, .. }) => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "boom");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_output_is_malformed() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(fixture.deploy_done(), vec![ok("not json")]);

    let poll = poll(&fixture, &runner).await;
    assert!(matches!(poll.result, Err(ConjureError::MalformedOutput { .. })));
}

#[tokio::test]
async fn test_spawn_error_is_fatal() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(
        fixture.deploy_done(),
        vec![Scripted::SpawnError("permission denied".to_string())],
    );

    let poll = poll(&fixture, &runner).await;
    assert!(matches!(poll.result, Err(ConjureError::Process(_))));
}

#[tokio::test]
async fn test_missing_script_is_a_no_op() {
    let fixture = SpellFixture::new();
    let runner = ScriptedRunner::new();

    let poll = poll(&fixture, &runner).await;

    assert!(poll.result.is_ok());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_session_env_is_passed() {
    let fixture = SpellFixture::new().with_deploy_done();
    let runner = ScriptedRunner::new().respond(fixture.deploy_done(), vec![ready()]);
    let env = HashMap::from([("CONJURE_UP_SPELL".to_string(), "openstack".to_string())]);

    wait_for_ready(
        &Options::default(),
        &File::new(fixture.deploy_done()),
        &runner,
        &env,
        |_| {},
        |_| async {},
    )
    .await
    .unwrap();

    let calls = runner.calls();
    assert_eq!(calls[0].env.get("CONJURE_UP_SPELL").map(String::as_str), Some("openstack"));
}
