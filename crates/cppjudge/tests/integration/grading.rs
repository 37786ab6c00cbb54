use cppjudge::{ResourceLimits, TestSuite, Verdict};

use super::{fixture_source, fixture_suite, test_grader, test_limits};

#[tokio::test]
#[ignore = "requires root"]
async fn test_doubling_program_passes() {
    let grader = test_grader(200, 1);
    let submission = grader.submission(fixture_source("double.cpp"));

    let verdict = grader
        .evaluate(&submission, &fixture_suite("double.json"), &test_limits())
        .await
        .expect("Grading failed");

    assert_eq!(verdict, Verdict::pass(3));
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_doubling_program_passes_with_default_limits() {
    let grader = test_grader(217, 1);
    let submission = grader.submission(fixture_source("double.cpp"));

    let verdict = grader
        .evaluate(
            &submission,
            &fixture_suite("double.json"),
            &ResourceLimits::default(),
        )
        .await
        .expect("Grading failed");

    assert_eq!(verdict, Verdict::pass(3));
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_second_case_fails() {
    let grader = test_grader(202, 1);
    let submission = grader.submission(fixture_source("print_ok.cpp"));

    let verdict = grader
        .evaluate(&submission, &fixture_suite("ok_then_fail.json"), &test_limits())
        .await
        .expect("Grading failed");

    match verdict {
        Verdict::Fail {
            test_index,
            exit_code,
            ref actual_output,
            ref expected_output,
            ..
        } => {
            assert_eq!(test_index, 2);
            assert_eq!(exit_code, 0);
            assert_eq!(actual_output, "OK");
            assert_eq!(expected_output, "FAIL");
        }
        _ => panic!("expected fail, got {verdict:?}"),
    }
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_compile_error_fails_first_case() {
    let grader = test_grader(204, 1);
    let submission = grader.submission(fixture_source("compile_error.cpp"));

    let verdict = grader
        .evaluate(&submission, &fixture_suite("double.json"), &test_limits())
        .await
        .expect("Grading failed");

    match verdict {
        Verdict::Fail {
            test_index,
            exit_code,
            ref stderr,
            ..
        } => {
            assert_eq!(test_index, 1);
            assert_ne!(exit_code, 0);
            assert!(stderr.contains("undeclared_value"), "stderr: {stderr}");
        }
        _ => panic!("expected fail, got {verdict:?}"),
    }
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_nonzero_exit_with_correct_output_fails() {
    let grader = test_grader(206, 1);
    let submission = grader.submission(fixture_source("exit_nonzero.cpp"));

    let verdict = grader
        .evaluate(&submission, &fixture_suite("double.json"), &test_limits())
        .await
        .expect("Grading failed");

    match verdict {
        Verdict::Fail {
            exit_code,
            ref actual_output,
            ref stderr,
            ..
        } => {
            assert_eq!(exit_code, 3);
            assert_eq!(actual_output, "10");
            assert_eq!(stderr, "giving up");
        }
        _ => panic!("expected fail, got {verdict:?}"),
    }
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_infinite_loop_hits_time_limit() {
    let grader = test_grader(208, 1);
    let submission = grader.submission(fixture_source("infinite_loop.cpp"));
    let suite = TestSuite::from_json(r#"[["", ""]]"#).unwrap();

    let verdict = grader
        .evaluate(&submission, &suite, &test_limits())
        .await
        .expect("Grading failed");

    match verdict {
        Verdict::Fail {
            exit_code,
            ref stderr,
            ..
        } => {
            assert_ne!(exit_code, 0);
            assert!(stderr.to_lowercase().contains("time limit"), "stderr: {stderr}");
        }
        _ => panic!("expected fail, got {verdict:?}"),
    }
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_memory_hog_fails() {
    let grader = test_grader(210, 1);
    let submission = grader.submission(fixture_source("memory_hog.cpp"));
    let suite = TestSuite::from_json(r#"[["", ""]]"#).unwrap();

    let limits = test_limits().with_memory_bytes(256 * ResourceLimits::MIB);
    let verdict = grader
        .evaluate(&submission, &suite, &limits)
        .await
        .expect("Grading failed");

    assert!(matches!(verdict, Verdict::Fail { exit_code, .. } if exit_code != 0));
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_network_is_blocked() {
    let grader = test_grader(212, 1);
    let submission = grader.submission(fixture_source("network.cpp"));

    let output = grader
        .run_code(&submission, "", &test_limits())
        .await
        .expect("Run failed");

    assert_eq!(output.exit_code, 0);
    assert_eq!(output.stdout, "blocked");
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_host_files_not_visible() {
    let grader = test_grader(214, 1);
    let submission = grader.submission(fixture_source("read_host_file.cpp"));

    let output = grader
        .run_code(&submission, "", &test_limits())
        .await
        .expect("Run failed");

    assert_eq!(output.stdout, "denied");
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_run_code_returns_normalized_output() {
    let grader = test_grader(216, 1);
    let submission = grader.submission(fixture_source("double.cpp"));

    let output = grader
        .run_code(&submission, "21\n", &test_limits())
        .await
        .expect("Run failed");

    assert_eq!(output.exit_code, 0);
    assert_eq!(output.stdout, "42");
    assert!(output.stderr.is_empty());
}

#[tokio::test]
async fn test_empty_suite_needs_no_sandbox() {
    // A missing isolate binary would fail any run, so passing proves none happened
    let mut config = super::test_config();
    config.isolate_path = Some("/nonexistent/isolate".into());
    let sandbox = cppjudge::IsolateSandbox::new(config.clone()).unwrap();
    let grader = cppjudge::Grader::new(std::sync::Arc::new(sandbox), config.grading.clone());

    let verdict = grader
        .evaluate(
            &grader.submission(fixture_source("double.cpp")),
            &fixture_suite("empty.json"),
            &config.default_limits,
        )
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::pass(0));
}

#[tokio::test]
async fn test_missing_isolate_is_an_error_not_a_fail() {
    let mut config = super::test_config();
    config.isolate_path = Some("/nonexistent/isolate".into());
    let sandbox = cppjudge::IsolateSandbox::new(config.clone()).unwrap();
    let grader = cppjudge::Grader::new(std::sync::Arc::new(sandbox), config.grading.clone());

    let result = grader
        .evaluate(
            &grader.submission(fixture_source("double.cpp")),
            &fixture_suite("double.json"),
            &config.default_limits,
        )
        .await;
    assert!(matches!(
        result,
        Err(cppjudge::GradeError::Sandbox(cppjudge::SandboxError::Unavailable(_)))
    ));
}
