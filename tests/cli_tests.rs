use assert_fs::prelude::{FileWriteStr, PathChild};
use common::command::run_changescope;
use common::numbered_lines;
use common::repo::{TestRepo, repo};
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

mod common;

/// `feature` renames `Rule.java` and adds `src/main/java/com/example/checks/MagicNumberCheck.java`
#[fixture]
fn feature_repo(repo: TestRepo) -> TestRepo {
    let rule = numbered_lines("rule", 5);
    let check = "package com.example.checks;\n\npublic class MagicNumberCheck {}\n";
    let root = repo.commit_files(&[("Rule.java", rule.as_str())], &[], "Initial");
    let feature = repo.commit_files(
        &[
            ("Renamed.java", rule.as_str()),
            ("src/main/java/com/example/checks/MagicNumberCheck.java", check),
        ],
        &[&root],
        "Add a check",
    );
    repo.set_branch("master", &root);
    repo.set_branch("feature", &feature);
    repo
}

#[rstest]
fn changes_are_printed_as_text(feature_repo: TestRepo) -> Result<(), Box<dyn std::error::Error>> {
    run_changescope("changes", feature_repo.path(), "feature", &[])
        .assert()
        .success()
        .stdout(
            "Renamed.java\t+\t-\n\
             src/main/java/com/example/checks/MagicNumberCheck.java\t+0-2\t-\n",
        );

    Ok(())
}

#[rstest]
fn changes_are_printed_as_json(feature_repo: TestRepo) -> Result<(), Box<dyn std::error::Error>> {
    let output = run_changescope("changes", feature_repo.path(), "feature", &["--format", "json"])
        .output()?;

    assert!(output.status.success());
    let changes: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        changes,
        serde_json::json!([
            {"path": "Renamed.java", "addedLines": [], "deletedLines": []},
            {
                "path": "src/main/java/com/example/checks/MagicNumberCheck.java",
                "addedLines": [0, 1, 2],
                "deletedLines": []
            }
        ])
    );

    Ok(())
}

#[rstest]
fn renames_can_be_disabled(feature_repo: TestRepo) -> Result<(), Box<dyn std::error::Error>> {
    run_changescope("changes", feature_repo.path(), "feature", &["--no-renames"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Renamed.java\t+0-4\t-\n"));

    Ok(())
}

#[rstest]
fn name_status_lists_renames_and_additions(feature_repo: TestRepo) {
    run_changescope("name-status", feature_repo.path(), "feature", &[])
        .assert()
        .success()
        .stdout(
            "R\tRule.java -> Renamed.java\n\
             A\tsrc/main/java/com/example/checks/MagicNumberCheck.java\n",
        );
}

#[rstest]
fn name_status_without_renames_lists_the_deletion(feature_repo: TestRepo) {
    run_changescope("name-status", feature_repo.path(), "feature", &["--no-renames"])
        .assert()
        .success()
        .stdout(
            "A\tRenamed.java\n\
             D\tRule.java\n\
             A\tsrc/main/java/com/example/checks/MagicNumberCheck.java\n",
        );
}

#[rstest]
#[case("50", "new.txt\t+2-3\t-2-3\n")]
#[case("51", "new.txt\t+0-3\t-\n")]
fn rename_threshold_is_inclusive(
    repo: TestRepo,
    #[case] threshold: &str,
    #[case] expected: &str,
) {
    let root = repo.commit_files(&[("old.txt", "a\nb\nc\nd\n")], &[], "Initial");
    // two of four lines survive the move
    let feature = repo.commit_files(&[("new.txt", "a\nb\nx\ny\n")], &[&root], "Move");
    repo.set_branch("master", &root);
    repo.set_branch("feature", &feature);

    run_changescope(
        "changes",
        repo.path(),
        "feature",
        &["--rename-threshold", threshold],
    )
    .assert()
    .success()
    .stdout(predicate::str::diff(expected.to_string()));
}

#[rstest]
fn out_of_range_threshold_is_rejected(feature_repo: TestRepo) {
    run_changescope(
        "changes",
        feature_repo.path(),
        "feature",
        &["--rename-threshold", "101"],
    )
    .assert()
    .failure();
}

#[rstest]
fn merge_base_is_printed(repo: TestRepo) -> Result<(), Box<dyn std::error::Error>> {
    let root = repo.commit_files(&[("a.txt", "a\n")], &[], "Initial");
    let feature = repo.commit_files(&[("a.txt", "a\nb\n")], &[&root], "Feature");
    repo.set_branch("master", &root);
    repo.set_branch("feature", &feature);

    run_changescope("merge-base", repo.path(), "feature", &[])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{root}\n")));

    Ok(())
}

#[rstest]
fn verbose_merge_base_shows_the_commit_header(repo: TestRepo) {
    let root = repo.commit_files(&[("a.txt", "a\n")], &[], "Initial import\n\nWith a body");
    let feature = repo.commit_files(&[("a.txt", "a\nb\n")], &[&root], "Feature");
    repo.set_branch("master", &root);
    repo.set_branch("feature", &feature);

    run_changescope("merge-base", repo.path(), "feature", &["--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!("commit {root}\n")))
        .stdout(predicate::str::contains("Author: A U Thor <author@example.com>\n"))
        .stdout(predicate::str::contains("Date:   Tue Nov 14 22:14:20 2023 +0000\n"))
        .stdout(predicate::str::ends_with("\n    Initial import\n"));
}

#[rstest]
fn trunk_comes_from_the_environment(repo: TestRepo) -> Result<(), Box<dyn std::error::Error>> {
    let root = repo.commit_files(&[("a.txt", "a\n")], &[], "Initial");
    let develop = repo.commit_files(&[("a.txt", "a\nb\n")], &[&root], "Develop");
    let feature = repo.commit_files(&[("a.txt", "a\nb\nc\n")], &[&develop], "Feature");
    repo.set_branch("develop", &develop);
    repo.set_branch("feature", &feature);

    run_changescope("changes", repo.path(), "feature", &[])
        .env("CHANGESCOPE_TRUNK", "develop")
        .assert()
        .success()
        .stdout("a.txt\t+2\t-\n");

    Ok(())
}

#[rstest]
fn touched_modules_are_listed(feature_repo: TestRepo) -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let catalog = dir.child("modules.json");
    catalog.write_str(
        r#"[
            {"packageName": "com.example.checks", "name": "MagicNumberCheck", "parent": "TreeWalker"},
            {"packageName": "com.example.checks", "name": "UnusedCheck", "parent": "Checker"}
        ]"#,
    )?;

    run_changescope("modules", feature_repo.path(), "feature", &["-c"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout("TreeWalker\tcom.example.checks.MagicNumberCheck\n");

    Ok(())
}

#[rstest]
fn missing_branch_fails_with_a_message(feature_repo: TestRepo) {
    run_changescope("changes", feature_repo.path(), "nope", &[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("branch 'nope' not found"));
}

#[test]
fn missing_repository_fails_with_a_message() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;

    run_changescope("changes", dir.path(), "feature", &[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no git repository found"));

    Ok(())
}
