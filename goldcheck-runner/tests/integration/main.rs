// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the full prepare, log, run pipeline, using shell scripts in place of the
//! solver, merge and diff tools.

#![cfg(unix)]

use color_eyre::Result;
use goldcheck_metadata::GoldcheckExitCode;
use goldcheck_runner::{
    config::VerifyConfig,
    reporter::{EventLogger, RunEvent},
    run_log::RunLog,
    runner::{RunResult, StageResult, VerifyRunner},
    test_case::{StageKind, TestCase},
    workspace::prepare_workspace,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::{fs, time::Duration};


use fixtures::*;

fn run(test_case: &TestCase, timeout: Option<Duration>) -> Result<RunResult> {
    let workspace = prepare_workspace(test_case)?;
    let log = RunLog::create(workspace.log_file())?;
    let mut logger = EventLogger::new();
    let result = VerifyRunner::new(test_case, &workspace)
        .timeout(timeout)
        .execute(&log, |event| logger.report_event(event));
    log.close()?;
    Ok(result)
}

fn statuses(result: &RunResult) -> Vec<i32> {
    result.stage_statuses().collect()
}

#[test]
fn all_stages_pass() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits::PASS)?;

    let result = run(&scenario.test_case(), None)?;

    assert_eq!(statuses(&result), [0, 0, 0]);
    assert_eq!(result.aggregate_status(), 0);
    assert!(result.is_success());
    assert!(scenario.output_file().is_file(), "merge wrote the output");
    assert_eq!(
        scenario.read_log()?,
        indoc! {"
            solver: ../Bar.xml
            solver warning
            merge: -p 1 Bar
            diff: -stat Bar.e ../Bar_gold.e -f ../Bar.comp
        "},
    );
    Ok(())
}

#[test]
fn later_stages_run_after_failure() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits {
        solver: 1,
        merge: 0,
        diff: 2,
    })?;

    let result = run(&scenario.test_case(), None)?;

    assert_eq!(statuses(&result), [1, 0, 2]);
    assert_eq!(result.aggregate_status(), 1);
    let failure = result.first_failure().expect("a stage failed");
    assert_eq!(failure.kind, StageKind::Simulate);

    let log = scenario.read_log()?;
    for expected in ["solver: ", "merge: ", "diff: "] {
        assert!(log.contains(expected), "log contains {expected:?}:\n{log}");
    }
    Ok(())
}

#[test]
fn stale_output_is_removed_before_simulate() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits {
        solver: 0,
        merge: 3,
        diff: 0,
    })?;
    fs::write(scenario.output_file(), "stale output from an earlier run\n")?;
    fs::write(scenario.log_file(), "stale log from an earlier run\n")?;

    let result = run(&scenario.test_case(), None)?;

    // The merge failed, so the diff had nothing to compare against.
    assert_eq!(statuses(&result), [0, 3, 2]);
    assert_eq!(result.aggregate_status(), 3);
    assert!(!scenario.output_file().exists(), "stale output is gone");

    let log = scenario.read_log()?;
    assert!(!log.contains("stale log"), "log was truncated:\n{log}");
    assert!(log.contains("diff: cannot open Bar.e"), "log:\n{log}");
    Ok(())
}

#[test]
fn stale_output_is_replaced_by_merge() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits::PASS)?;
    // The solver checks that the old output is already gone when it starts.
    scenario.write_tool(
        "solver",
        "if [ -e Bar.e ]; then echo \"stale output present\"; exit 9; fi\n",
    )?;
    fs::write(scenario.output_file(), "stale output from an earlier run\n")?;

    let result = run(&scenario.test_case(), None)?;

    assert_eq!(statuses(&result), [0, 0, 0]);
    assert_eq!(fs::read_to_string(scenario.output_file())?, "merged\n");
    Ok(())
}

#[test]
fn partitioned_run_uses_launcher() -> Result<()> {
    let scenario = Scenario::new(3)?;
    scenario.write_tools(ToolExits::PASS)?;

    let result = run(&scenario.test_case(), None)?;

    assert_eq!(statuses(&result), [0, 0, 0]);
    let log = scenario.read_log()?;
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(
        lines,
        [
            "launcher: -np 3",
            "solver: ../Bar.xml",
            "solver warning",
            "merge: -p 3 Bar",
            "diff: -stat Bar.e ../Bar_gold.e -f ../Bar.comp",
        ],
    );
    Ok(())
}

#[test]
fn missing_tool_is_recorded_and_run_continues() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits::PASS)?;
    fs::remove_file(scenario.tool_path("solver"))?;

    let test_case = scenario.test_case();
    let workspace = prepare_workspace(&test_case)?;
    let log = RunLog::create(workspace.log_file())?;
    let mut events = Vec::new();
    let result = VerifyRunner::new(&test_case, &workspace).execute(&log, |event| {
        events.push(match event {
            RunEvent::StageStarted { kind, .. } => format!("started {kind}"),
            RunEvent::StageFinished { outcome } => {
                format!("finished {} {}", outcome.kind, outcome.status())
            }
        });
    });
    log.close()?;

    assert_eq!(
        events,
        [
            "started simulate".to_owned(),
            format!("finished simulate {}", GoldcheckExitCode::STAGE_EXEC_FAILED),
            "started merge".to_owned(),
            "finished merge 0".to_owned(),
            "started compare".to_owned(),
            "finished compare 0".to_owned(),
        ],
    );
    assert!(matches!(
        result.stages()[0].result,
        StageResult::ExecFailed { .. }
    ));
    assert_eq!(
        result.aggregate_status(),
        GoldcheckExitCode::STAGE_EXEC_FAILED
    );

    let log = scenario.read_log()?;
    let first_line = log.lines().next().unwrap_or_default();
    assert!(
        first_line.starts_with("goldcheck: simulate stage did not run: failed to start `"),
        "unexpected first line: {first_line}"
    );
    Ok(())
}

#[test]
fn hung_stage_times_out() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits::PASS)?;
    scenario.write_tool("solver", "echo started\nexec sleep 30\n")?;

    let result = run(&scenario.test_case(), Some(Duration::from_millis(500)))?;

    assert_eq!(
        statuses(&result),
        [GoldcheckExitCode::STAGE_TIMED_OUT, 0, 0]
    );
    assert!(matches!(
        result.stages()[0].result,
        StageResult::TimedOut { limit } if limit == Duration::from_millis(500)
    ));

    let log = scenario.read_log()?;
    assert!(log.starts_with("started\n"), "log:\n{log}");
    assert!(
        log.contains("goldcheck: simulate stage timed out after 500ms\n"),
        "log:\n{log}"
    );
    Ok(())
}

#[test]
fn rerun_starts_from_a_clean_slate() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits::PASS)?;
    let test_case = scenario.test_case();

    run(&test_case, None)?;
    let first_log = scenario.read_log()?;

    let result = run(&test_case, None)?;
    assert!(result.is_success());
    assert_eq!(scenario.read_log()?, first_log, "log is not appended to");
    Ok(())
}

#[test]
fn missing_working_directory_aborts_before_any_stage() -> Result<()> {
    let scenario = Scenario::new(1)?;
    scenario.write_tools(ToolExits::PASS)?;
    fs::remove_dir(scenario.working_dir())?;

    let err = prepare_workspace(&scenario.test_case()).expect_err("directory is missing");
    assert!(
        err.to_string().contains("is not accessible"),
        "unexpected error: {err}"
    );
    assert!(!scenario.log_file().exists());
    Ok(())
}

#[test]
fn config_with_relative_tool_paths() -> Result<()> {
    let scenario = Scenario::new(2)?;
    scenario.write_tools(ToolExits::PASS)?;

    let config_file = scenario.root().join(VerifyConfig::CONFIG_FILE_NAME);
    fs::write(
        &config_file,
        indoc! {r#"
            [test]
            name = "Bar"
            dir = "Bar/np2"
            partitions = 2
            timeout = "1m"

            [tools]
            launcher = "../../tools/launcher -np"
            solver = "../../tools/solver"
            merge = "../../tools/merge"
            diff = "../../tools/diff"
        "#},
    )?;

    let config = VerifyConfig::from_file(scenario.root(), &config_file)?;
    let result = run(config.test_case(), config.timeout())?;

    assert_eq!(statuses(&result), [0, 0, 0]);
    let log = scenario.read_log()?;
    assert!(log.starts_with("launcher: -np 2\n"), "log:\n{log}");
    Ok(())
}
