use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_describes_the_scheduler_flag() {
    Command::cargo_bin("umbridge-gateway")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--scheduler"));
}

#[test]
fn missing_scheduler_flag_is_a_usage_error() {
    Command::cargo_bin("umbridge-gateway")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--scheduler"));
}

#[test]
fn rejects_an_unknown_scheduler_kind() {
    Command::cargo_bin("umbridge-gateway")
        .unwrap()
        .args(["--scheduler", "lsf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lsf"));
}
