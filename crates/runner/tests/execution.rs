//! End-to-end runs of the executor with fake browser and dev server binaries

#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{spawn_count, test_config, Fixture, FAILING_SERVER, READY_SERVER};
use drt_runner::{Error, Outcome, TestDescriptor};
use tokio_util::sync::CancellationToken;

/// Browser that records its arguments, prints `lines` and then hangs
fn browser(lines: &[&str]) -> String {
    let mut body = String::from("echo \"$@\" > \"$0.args\"\n");
    for line in lines {
        body.push_str(&format!("echo '{}'\n", line));
    }
    body.push_str("exec sleep 30\n");
    body
}

fn descriptor(fixture: &Fixture) -> TestDescriptor {
    TestDescriptor::new(&fixture.project, "app_test.dart").unwrap()
}

#[tokio::test]
async fn pass_then_terminal_marker() {
    let fixture = Fixture::new(READY_SERVER, &browser(&["foo", "PASS", "#EOF"]), test_config());
    let desc = descriptor(&fixture);

    let started = Instant::now();
    let result = fixture.executor.run_test(&desc).await.unwrap();

    assert!(result.success);
    assert_eq!(result.outcome, Outcome::Passed);
    assert!(result.stdout.contains("foo"));
    assert!(result.stdout.contains("PASS"));
    assert!(!result.stdout.contains("#EOF"));
    assert_eq!(result.descriptor, desc);
    // the hanging browser was terminated rather than waited on
    assert!(started.elapsed() < Duration::from_secs(20));

    let generated = fixture.project.join("test").join("__drt_generated");
    assert!(generated.join("app_test.html").is_file());
    assert!(generated.join("app_test.dart").is_file());

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn browser_is_pointed_at_the_harness_page() {
    let fixture = Fixture::new(READY_SERVER, &browser(&["PASS", "#EOF"]), test_config());
    let desc = descriptor(&fixture);

    fixture.executor.run_test(&desc).await.unwrap();

    let url = "http://127.0.0.1:8080/__drt_generated/app_test.html";
    assert_eq!(fixture.executor.harness_url(&desc), url);

    let args = std::fs::read_to_string(fixture.dir.path().join("bin").join("content_shell.args")).unwrap();
    assert_eq!(args.trim(), format!("--args --dump-render-tree --disable-gpu {}", url));

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn ignored_lines_and_no_pass() {
    let fixture = Fixture::new(READY_SERVER, &browser(&["#READY", "bar", "#EOF"]), test_config());

    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(!result.stdout.contains("#READY"));
    assert!(result.stdout.contains("bar"));

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn duplicate_terminal_markers_complete_once() {
    let fixture = Fixture::new(
        READY_SERVER,
        &browser(&["PASS", "#EOF", "after", "#EOF"]),
        test_config(),
    );

    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert!(result.success);
    assert!(!result.stdout.contains("after"));

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn crash_marker_yields_crashed_result() {
    let fixture = Fixture::new(READY_SERVER, &browser(&["PASS", "#CRASHED"]), test_config());

    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.outcome, Outcome::Crashed);

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn exit_without_terminal_marker_is_incomplete() {
    let fixture = Fixture::new(
        READY_SERVER,
        "echo 'some output'\necho PASS\necho 'renderer warning' >&2\nexit 0\n",
        test_config(),
    );

    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert_eq!(result.outcome, Outcome::Incomplete);
    assert!(result.success);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.stdout.contains("some output"));
    assert_eq!(result.stderr, "renderer warning\n");

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn exit_without_terminal_marker_strict() {
    let mut config = test_config();
    config.browser.require_terminal_marker = true;
    let fixture = Fixture::new(READY_SERVER, "echo PASS\nexit 0\n", config);

    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert_eq!(result.outcome, Outcome::Incomplete);
    assert!(!result.success);

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn terminal_marker_written_right_before_exit_still_counts() {
    let fixture = Fixture::new(READY_SERVER, "echo PASS\necho '#EOF'\nexit 0\n", test_config());

    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert_eq!(result.outcome, Outcome::Passed);
    assert!(result.success);

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn server_failure_aborts_before_browser_launch() {
    let fixture = Fixture::new(FAILING_SERVER, "touch \"$0.launched\"\necho '#EOF'\n", test_config());
    let desc = descriptor(&fixture);

    let err = fixture.executor.run_test(&desc).await.unwrap_err();

    match err {
        Error::ServerStartupFailed { log, .. } => {
            assert!(log.contains("pubspec.yaml"));
        }
        other => panic!("expected ServerStartupFailed, got {:?}", other),
    }
    assert!(!fixture.dir.path().join("bin").join("content_shell.launched").exists());
    assert_eq!(spawn_count(&fixture.project), 1);
}

#[tokio::test]
async fn generation_failure_aborts_before_browser_launch() {
    let fixture = Fixture::new(READY_SERVER, "touch \"$0.launched\"\necho '#EOF'\n", test_config());
    let desc = descriptor(&fixture).with_html_harness(fixture.dir.path().join("missing.html"));

    let err = fixture.executor.run_test(&desc).await.unwrap_err();

    assert!(matches!(err, Error::GenerationFailed { .. }));
    assert!(!fixture.dir.path().join("bin").join("content_shell.launched").exists());

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn tests_in_one_project_share_the_server() {
    let fixture = Fixture::new(READY_SERVER, &browser(&["PASS", "#EOF"]), test_config());
    let desc = descriptor(&fixture);

    let (a, b) = tokio::join!(
        fixture.executor.run_test(&desc),
        fixture.executor.run_test(&desc)
    );

    assert!(a.unwrap().success);
    assert!(b.unwrap().success);
    assert_eq!(spawn_count(&fixture.project), 1);

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn deadline_terminates_hanging_browser() {
    let mut config = test_config();
    config.browser.timeout_secs = Some(1);
    let fixture = Fixture::new(READY_SERVER, &browser(&["PASS"]), config);

    let started = Instant::now();
    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert_eq!(result.outcome, Outcome::TimedOut);
    assert!(!result.success);
    assert!(started.elapsed() < Duration::from_secs(15));

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn cancellation_terminates_browser() {
    let fixture = Fixture::new(READY_SERVER, &browser(&["working"]), test_config());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let result = fixture
        .executor
        .run_test_with_cancel(&descriptor(&fixture), cancel)
        .await
        .unwrap();

    assert_eq!(result.outcome, Outcome::Cancelled);
    assert!(!result.success);

    fixture.executor.registry().shutdown().await;
}

#[tokio::test]
async fn invalid_utf8_output_keeps_markers() {
    let body = "printf 'caf\\351\\n'\necho PASS\necho '#EOF'\nexec sleep 30\n";
    let fixture = Fixture::new(READY_SERVER, body, test_config());

    let result = fixture.executor.run_test(&descriptor(&fixture)).await.unwrap();

    assert!(result.success);
    assert_eq!(result.outcome, Outcome::Passed);
    assert!(result.stdout.contains("caf\u{FFFD}"));
    assert!(result.stdout.contains("PASS"));

    fixture.executor.registry().shutdown().await;
}
