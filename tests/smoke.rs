use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("keyword-contrast").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn run_requires_a_hash() {
    let mut cmd = Command::cargo_bin("keyword-contrast").expect("binary exists");
    cmd.arg("run").assert().failure();
}
