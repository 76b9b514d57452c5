//! Step loading, pipeline ordering and step execution tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use conjurer::deploy::executor::StepExecutor;
use conjurer::deploy::fsm::{PipelineState, StepState};
use conjurer::deploy::loader::load_steps;
use conjurer::deploy::pipeline::{Advance, StepPipeline};
use conjurer::errors::{ConjureError, ErrorTag};
use conjurer::filesys::dir::Dir;
use conjurer::models::step::StepOutcome;

use crate::helpers::{failed, ok, step_yaml, ScriptedRunner, SpellFixture};

async fn run_all(
    pipeline: &mut StepPipeline,
    executor: &StepExecutor,
) -> Result<Vec<String>, ConjureError> {
    let mut order = Vec::new();
    while let Some(job) = pipeline.dispatch()? {
        order.push(job.step.title.clone());
        let outcome = executor.execute(job, |_| {}).await;
        if let Advance::AllDone(_) = pipeline.complete(outcome)? {
            break;
        }
    }
    Ok(order)
}

#[tokio::test]
async fn test_non_viewable_steps_are_excluded() {
    let fixture = SpellFixture::new()
        .with_deploy_done()
        .with_step("01_keys", &step_yaml("Import keys", true))
        .with_step("02_hidden", &step_yaml("Hidden", false))
        .with_step("03_network", &step_yaml("Configure network", true))
        .with_step("04_internal", &step_yaml("Internal", false))
        .with_step("05_admin", &step_yaml("Admin user", true));

    let steps = load_steps(&Dir::new(fixture.steps_dir())).await.unwrap();
    let titles: Vec<_> = steps.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Import keys", "Configure network", "Admin user"]);

    let runner = ScriptedRunner::new()
        .respond(fixture.step_script("01_keys"), vec![ok("keys imported\n")])
        .respond(fixture.step_script("03_network"), vec![ok("bridge br0")])
        .respond(fixture.step_script("05_admin"), vec![ok("admin/secret")]);
    let runner = Arc::new(runner);
    let executor = StepExecutor::new(runner.clone(), HashMap::new(), None);

    let mut pipeline = StepPipeline::new(steps);
    let order = run_all(&mut pipeline, &executor).await.unwrap();

    assert_eq!(order, vec!["Import keys", "Configure network", "Admin user"]);
    assert_eq!(pipeline.state(), PipelineState::AllDone);
    let results = pipeline.results();
    assert_eq!(results.len(), 3);
    assert_eq!(results.titles().collect::<Vec<_>>(), order);
    assert_eq!(results.get("Import keys"), Some("keys imported"));
    assert!(runner.calls_to(fixture.step_script("02_hidden")).is_empty());
    assert!(runner.calls_to(fixture.step_script("04_internal")).is_empty());
}

#[tokio::test]
async fn test_missing_executable_is_skipped() {
    let fixture = SpellFixture::new()
        .with_step("01_first", &step_yaml("First", true))
        .with_orphan_metadata("02_orphan", &step_yaml("Orphan", true));

    let steps = load_steps(&Dir::new(fixture.steps_dir())).await.unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].title, "First");
}

#[tokio::test]
async fn test_missing_steps_dir_has_no_steps() {
    let fixture = SpellFixture::new();
    let steps = load_steps(&Dir::new(fixture.dir.path().join("nope"))).await.unwrap();
    assert!(steps.is_empty());
}

#[tokio::test]
async fn test_prior_results_reach_later_steps() {
    let fixture = SpellFixture::new()
        .with_step("01_first", &step_yaml("First", true))
        .with_step("02_second", &step_yaml("Second", true));
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(fixture.step_script("01_first"), vec![ok("one")])
            .respond(fixture.step_script("02_second"), vec![ok("two")]),
    );
    let env = HashMap::from([("CONJURE_UP_SPELL".to_string(), "openstack".to_string())]);
    let executor = StepExecutor::new(runner.clone(), env, None);

    let steps = load_steps(&Dir::new(fixture.steps_dir())).await.unwrap();
    let mut pipeline = StepPipeline::new(steps);
    run_all(&mut pipeline, &executor).await.unwrap();

    let first = &runner.calls_to(fixture.step_script("01_first"))[0];
    let second = &runner.calls_to(fixture.step_script("02_second"))[0];
    assert_eq!(first.stdin.as_deref(), Some(b"{}".as_slice()));
    let prior: serde_json::Value = serde_json::from_slice(second.stdin.as_deref().unwrap()).unwrap();
    assert_eq!(prior, serde_json::json!({"First": "one"}));
    assert_eq!(second.env.get("CONJURE_UP_SPELL").map(String::as_str), Some("openstack"));
}

#[tokio::test]
async fn test_additional_input_becomes_env() {
    let metadata = "title: Credentials\n\
                    additional-input:\n  \
                    - key: ADMIN_USER\n    label: Admin user\n    default: admin\n  \
                    - key: ADMIN_PASSWORD\n    label: Password\n    type: password\n";
    let fixture = SpellFixture::new().with_step("01_creds", metadata);
    let runner = Arc::new(
        ScriptedRunner::new().respond(fixture.step_script("01_creds"), vec![ok("saved")]),
    );
    let executor = StepExecutor::new(runner.clone(), HashMap::new(), None);

    let steps = load_steps(&Dir::new(fixture.steps_dir())).await.unwrap();
    let mut pipeline = StepPipeline::new(steps);
    pipeline.set_input("Credentials", "ADMIN_PASSWORD", "hunter2").unwrap();
    run_all(&mut pipeline, &executor).await.unwrap();

    let call = &runner.calls()[0];
    assert_eq!(call.env.get("ADMIN_USER").map(String::as_str), Some("admin"));
    assert_eq!(call.env.get("ADMIN_PASSWORD").map(String::as_str), Some("hunter2"));
}

#[tokio::test]
async fn test_failed_step_halts_without_retry() {
    let fixture = SpellFixture::new()
        .with_step("01_first", &step_yaml("First", true))
        .with_step("02_second", &step_yaml("Second", true))
        .with_step("03_third", &step_yaml("Third", true));
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(fixture.step_script("01_first"), vec![ok("one")])
            .respond(fixture.step_script("02_second"), vec![failed(1, "no quota")])
            .respond(fixture.step_script("03_third"), vec![ok("three")]),
    );
    let executor = StepExecutor::new(runner.clone(), HashMap::new(), None);

    let steps = load_steps(&Dir::new(fixture.steps_dir())).await.unwrap();
    let mut pipeline = StepPipeline::new(steps);
    let err = run_all(&mut pipeline, &executor).await.unwrap_err();

    assert_eq!(err.tag(), Some(ErrorTag::Steps));
    assert!(matches!(err, ConjureError::Step { ref step, .. } if step == "Second"));
    assert_eq!(pipeline.state(), PipelineState::Halted);
    assert_eq!(pipeline.step_state(1), Some(StepState::Failed));
    assert_eq!(pipeline.step_state(2), Some(StepState::Pending));
    assert_eq!(pipeline.results().len(), 1);
    assert_eq!(runner.calls_to(fixture.step_script("02_second")).len(), 1);
    assert!(runner.calls_to(fixture.step_script("03_third")).is_empty());
}

#[tokio::test]
async fn test_output_is_streamed() {
    let fixture = SpellFixture::new().with_step("01_first", &step_yaml("First", true));
    let runner = Arc::new(
        ScriptedRunner::new().respond(fixture.step_script("01_first"), vec![ok("line 1\nline 2")]),
    );
    let executor = StepExecutor::new(runner, HashMap::new(), None);
    let steps = load_steps(&Dir::new(fixture.steps_dir())).await.unwrap();
    let mut pipeline = StepPipeline::new(steps);

    let seen = Mutex::new(Vec::new());
    let job = pipeline.dispatch().unwrap().unwrap();
    let outcome = executor
        .execute(job, |tail| seen.lock().unwrap().push(tail.to_string()))
        .await;

    assert!(matches!(outcome, StepOutcome::Completed(ref r) if r.payload == "line 1\nline 2"));
    assert_eq!(seen.into_inner().unwrap(), vec!["line 1\nline 2".to_string()]);
}
