use assert_cmd::Command;
use std::path::Path;

/// `changescope <subcommand> -r <repo> -p <branch> <extra>` with a clean environment
pub fn run_changescope(subcommand: &str, repository: &Path, branch: &str, extra: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("changescope").expect("Failed to find changescope binary");
    cmd.env_remove("CHANGESCOPE_TRUNK")
        .env_remove("RUST_LOG")
        .arg(subcommand)
        .arg("-r")
        .arg(repository)
        .arg("-p")
        .arg(branch)
        .args(extra);
    cmd
}
