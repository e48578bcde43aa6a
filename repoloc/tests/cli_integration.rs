//! Integration tests for repoloc CLI

use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn run_repoloc(args: &[&str]) -> (String, String, bool) {
    let mut cmd_args = vec!["run", "-q", "-p", "repoloc", "--"];
    cmd_args.extend(args);

    let output = Command::new("cargo")
        .args(&cmd_args)
        .current_dir(env!("CARGO_MANIFEST_DIR").to_string() + "/..")
        .env_remove("REPOLOC_ACCESS_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

fn last_line(stdout: &str) -> &str {
    stdout.lines().last().unwrap_or("").trim()
}

fn sample_project() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/main.rs"),
        "// entry point\nfn main() {\n\n    println!(\"hi\");\n}\n",
    )
    .unwrap();
    fs::write(dir.path().join("setup.py"), "# build\nimport os\nprint(os.name)\n").unwrap();
    fs::write(dir.path().join("README"), "not source\n").unwrap();
    dir
}

#[test]
fn test_cli_help() {
    let (stdout, _, success) = run_repoloc(&["--help"]);

    assert!(success);
    assert!(stdout.contains("repoloc"));
    assert!(stdout.contains("--devops"));
    assert!(stdout.contains("--organization"));
    assert!(stdout.contains("--access-token"));
    assert!(stdout.contains("--clone-repo-using-zip"));
    assert!(stdout.contains("--dump-csvs"));
    assert!(stdout.contains("combine"));
}

#[test]
fn test_cli_version() {
    let (stdout, _, success) = run_repoloc(&["--version"]);

    assert!(success);
    assert!(stdout.contains("repoloc"));
}

#[test]
fn test_local_run_prints_total_last() {
    let project = sample_project();
    let path = project.path().to_str().unwrap();

    let (stdout, stderr, success) =
        run_repoloc(&["--local-file-path", path, "--dump-csvs", "false"]);

    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("local-org-local"));
    assert!(stdout.contains("Failed 0/1 repositories"));
    // main.rs: 3 code lines, setup.py: 2 code lines
    assert_eq!(last_line(&stdout), "5");
}

#[test]
fn test_local_run_writes_reports() {
    let project = sample_project();
    let results = tempdir().unwrap();
    let out = results.path().join("out");

    let (stdout, stderr, success) = run_repoloc(&[
        "--local-file-path",
        project.path().to_str().unwrap(),
        "--results-directory-path",
        out.to_str().unwrap(),
    ]);

    assert!(success, "stderr: {}", stderr);
    assert_eq!(last_line(&stdout), "5");

    let combined = fs::read_to_string(out.join("AAA_combined_results.csv")).unwrap();
    assert_eq!(
        combined,
        "repository,lineOfCodeCount\nlocal-org-local,5\ntotal,5\n"
    );

    let per_repo = fs::read_to_string(out.join("local-org-local.csv")).unwrap();
    assert!(per_repo.starts_with("filePath,blank,comment,code\n"));
    assert!(per_repo.ends_with("total,1,2,5\n"));
}

#[test]
fn test_ignore_file_skips_paths() {
    let project = sample_project();
    let patterns = tempdir().unwrap();
    let ignore = patterns.path().join("ignore.txt");
    fs::write(&ignore, "# python tooling\n*.py\n").unwrap();

    let (stdout, stderr, success) = run_repoloc(&[
        "--local-file-path",
        project.path().to_str().unwrap(),
        "--ignore-file",
        ignore.to_str().unwrap(),
        "--dump-csvs",
        "false",
    ]);

    assert!(success, "stderr: {}", stderr);
    assert_eq!(last_line(&stdout), "3");
}

#[test]
fn test_combine_subcommand() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("acme-api.csv"),
        "filePath,blank,comment,code\nmain.go,1,1,40\ntotal,1,1,40\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("acme-web.csv"),
        "filePath,blank,comment,code\napp.ts,0,0,60\ntotal,0,0,60\n",
    )
    .unwrap();

    let (stdout, stderr, success) = run_repoloc(&["combine", dir.path().to_str().unwrap()]);

    assert!(success, "stderr: {}", stderr);
    assert_eq!(last_line(&stdout), "100");

    let combined = fs::read_to_string(dir.path().join("AAA_combined_results.csv")).unwrap();
    assert_eq!(
        combined,
        "repository,lineOfCodeCount\nacme-web,60\nacme-api,40\ntotal,100\n"
    );
}

#[test]
fn test_local_mode_requires_path() {
    let (_, stderr, success) = run_repoloc(&["--dump-csvs", "false"]);

    assert!(!success);
    assert!(stderr.contains("Error"));
}

#[test]
fn test_remote_mode_requires_token() {
    let (_, stderr, success) = run_repoloc(&[
        "--devops",
        "GitHub",
        "--organization",
        "acme",
        "--dump-csvs",
        "false",
    ]);

    assert!(!success);
    assert!(stderr.contains("Error"));
}

#[test]
fn test_results_directory_conflicts_with_disabled_csvs() {
    let dir = tempdir().unwrap();
    let (_, stderr, success) = run_repoloc(&[
        "--local-file-path",
        dir.path().to_str().unwrap(),
        "--dump-csvs",
        "false",
        "--results-directory-path",
        dir.path().to_str().unwrap(),
    ]);

    assert!(!success);
    assert!(stderr.contains("--results-directory-path"));
}

#[test]
fn test_unknown_provider_rejected() {
    let (_, stderr, success) = run_repoloc(&["--devops", "Subversion"]);

    assert!(!success);
    assert!(stderr.contains("Subversion") || stderr.contains("invalid value"));
}
