//! End-to-end CLI tests for repomap's thin binary front-end.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn repomap() -> Command {
    cargo_bin_cmd!("repomap")
}

fn write_file(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "src/main.ts",
        "import { helper } from './utils/helper';\n\nexport function main() {\n  helper();\n}\n",
    );
    write_file(
        dir.path(),
        "src/utils/helper.ts",
        "export function helper(): void {}\n",
    );
    write_file(
        dir.path(),
        "node_modules/left-pad/index.js",
        "module.exports = function () {};\n",
    );
    dir
}

mod cli_basics {
    use super::*;

    #[test]
    fn shows_usage() {
        repomap()
            .arg("--help")
            .assert()
            .failure()
            .stderr(predicate::str::contains("repomap"))
            .stderr(predicate::str::contains("--exclude"));
    }

    #[test]
    fn rejects_unknown_flag() {
        repomap()
            .arg("--bogus-flag")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unrecognized argument"));
    }
}

mod analysis {
    use super::*;

    #[test]
    fn analyzes_sample_project_and_prints_summary() {
        let dir = sample_project();
        repomap()
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("files"))
            .stdout(predicate::str::contains("dependency nodes"))
            .stdout(predicate::str::contains("components"));
    }

    #[test]
    fn excludes_node_modules_from_analysis() {
        let dir = sample_project();
        // Only the two in-repo files should be counted; node_modules is
        // always excluded regardless of user-supplied patterns.
        repomap()
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("2 files"));
    }

    #[test]
    fn exclude_flag_narrows_discovery_further() {
        let dir = sample_project();
        repomap()
            .arg(dir.path())
            .arg("--exclude")
            .arg("**/utils/**")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 files"));
    }

    #[test]
    fn no_dependency_flag_skips_graph_output() {
        let dir = sample_project();
        repomap()
            .arg(dir.path())
            .arg("--no-dependency")
            .assert()
            .success()
            .stdout(predicate::str::contains("files").and(predicate::str::contains("dependency nodes").not()));
    }

    #[test]
    fn max_file_size_skips_oversized_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "big.js", &"x".repeat(4096));
        repomap()
            .arg(dir.path())
            .arg("--max-file-size")
            .arg("1024")
            .assert()
            .success()
            .stdout(predicate::str::contains("0 files"));
    }

    #[test]
    fn missing_root_reports_error() {
        repomap()
            .arg("/nonexistent/path/for/repomap/tests")
            .assert()
            .failure()
            .stderr(predicate::str::contains("[repomap][error]"));
    }
}
