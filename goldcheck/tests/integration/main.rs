// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests that run the `goldcheck` binary against a harness directory of shell-script
//! tools.

#![cfg(unix)]

use color_eyre::Result;
use goldcheck_metadata::GoldcheckExitCode;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;


use fixtures::*;

#[test]
fn passing_run_is_silent() -> Result<()> {
    let harness = HarnessDir::new(1, [0, 0, 0])?;

    let output = GoldcheckCli::new().output_in(harness.root());

    assert_eq!(output.exit_code(), Some(0), "{output}");
    assert_eq!(output.stdout_as_str(), "", "{output}");
    assert_eq!(output.stderr_as_str(), "", "{output}");

    let log = fs::read_to_string(harness.working_dir_for(1).join("Bar.log"))?;
    assert_eq!(
        log,
        indoc! {"
            solver: ../Bar.xml
            solver: warning
            merge: -p 1 Bar
            diff: -stat Bar.e ../Bar_gold.e -f ../Bar.comp
        "}
    );
    Ok(())
}

#[test]
fn first_failure_sets_exit_code() -> Result<()> {
    let harness = HarnessDir::new(1, [1, 0, 2])?;

    let output = GoldcheckCli::new().output_in(harness.root());

    assert_eq!(output.exit_code(), Some(1), "{output}");
    assert_eq!(output.stdout_as_str(), "", "{output}");

    let log = fs::read_to_string(harness.working_dir_for(1).join("Bar.log"))?;
    assert!(log.contains("solver: ../Bar.xml\n"), "{log}");
    assert!(log.contains("merge: -p 1 Bar\n"), "{log}");
    assert!(log.contains("diff: -stat Bar.e"), "{log}");
    Ok(())
}

#[test]
fn comparison_mismatch_sets_exit_code() -> Result<()> {
    let harness = HarnessDir::new(3, [0, 0, 2])?;

    let output = GoldcheckCli::new().output_in(harness.root());

    assert_eq!(output.exit_code(), Some(2), "{output}");
    let log = fs::read_to_string(harness.working_dir_for(3).join("Bar.log"))?;
    assert!(log.starts_with("launcher: -np 3\n"), "{log}");
    Ok(())
}

#[test]
fn verbose_dumps_log_to_stdout() -> Result<()> {
    for flag in ["-verbose", "--verbose", "-v"] {
        let harness = HarnessDir::new(1, [1, 0, 2])?;

        let output = GoldcheckCli::new().arg(flag).output_in(harness.root());

        assert_eq!(output.exit_code(), Some(1), "{output}");
        let log = fs::read(harness.working_dir_for(1).join("Bar.log"))?;
        assert_eq!(output.stdout, log, "flag {flag}: {output}");
    }
    Ok(())
}

#[test]
fn stale_output_does_not_satisfy_comparison() -> Result<()> {
    let harness = HarnessDir::new(1, [0, 5, 0])?;
    let output_file = harness.working_dir_for(1).join("Bar.e");
    fs::write(&output_file, "stale\n")?;

    let output = GoldcheckCli::new().output_in(harness.root());

    assert_eq!(output.exit_code(), Some(5), "{output}");
    assert!(!output_file.exists(), "stale output was removed");
    let log = fs::read_to_string(harness.working_dir_for(1).join("Bar.log"))?;
    assert!(log.contains("diff: cannot open Bar.e\n"), "{log}");
    Ok(())
}

#[test]
fn missing_working_directory_is_a_setup_error() -> Result<()> {
    let harness = HarnessDir::new(1, [0, 0, 0])?;
    fs::remove_dir(harness.working_dir_for(1))?;

    let output = GoldcheckCli::new().arg("--verbose").output_in(harness.root());

    assert_eq!(
        output.exit_code(),
        Some(GoldcheckExitCode::SETUP_ERROR),
        "{output}"
    );
    assert_eq!(output.stdout_as_str(), "", "{output}");
    assert!(
        output.stderr_as_str().contains("is not accessible"),
        "{output}"
    );
    assert!(!harness.working_dir_for(1).exists());
    Ok(())
}

#[test]
fn invalid_config_is_a_setup_error() -> Result<()> {
    let harness = HarnessDir::new(1, [0, 0, 0])?;
    harness.write_config(indoc! {r#"
        [test]
        name = "Bar"
        dir = "Bar/np1"
        partitions = "many"
    "#})?;

    let output = GoldcheckCli::new().output_in(harness.root());

    assert_eq!(
        output.exit_code(),
        Some(GoldcheckExitCode::SETUP_ERROR),
        "{output}"
    );
    assert!(
        output.stderr_as_str().contains("test.partitions"),
        "{output}"
    );
    Ok(())
}

#[test]
fn hung_stage_is_killed_after_timeout() -> Result<()> {
    let harness = HarnessDir::new(1, [0, 0, 0])?;
    harness.write_tool("solver", "exec sleep 30\n")?;
    harness.write_config(indoc! {r#"
        [test]
        name = "Bar"
        dir = "Bar/np1"
        timeout = "500ms"

        [tools]
        solver = "../../tools/solver"
        merge = "../../tools/merge"
        diff = "../../tools/diff"
    "#})?;

    let output = GoldcheckCli::new().output_in(harness.root());

    assert_eq!(
        output.exit_code(),
        Some(GoldcheckExitCode::STAGE_TIMED_OUT),
        "{output}"
    );
    assert!(
        output.stderr_as_str().contains("simulate stage timed out"),
        "{output}"
    );
    Ok(())
}

#[test]
fn unknown_argument_is_rejected() -> Result<()> {
    let harness = HarnessDir::new(1, [0, 0, 0])?;

    let output = GoldcheckCli::new().arg("--test=Bar").output_in(harness.root());

    assert_eq!(output.exit_code(), Some(2), "{output}");
    assert!(!harness.working_dir_for(1).join("Bar.log").exists());
    Ok(())
}
