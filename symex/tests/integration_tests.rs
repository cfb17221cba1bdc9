// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Runs every scenario in tests/run-pass and checks that each of them meets all of the
// expectations it records.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use symex::options::Options;
use symex::scenario;
use walkdir::WalkDir;

// Run the scenarios in the tests/run-pass directory.
#[test]
fn run_pass() {
    let mut run_pass_path = PathBuf::from_str("tests/run-pass").unwrap();
    if !run_pass_path.exists() {
        run_pass_path = PathBuf::from_str("symex/tests/run-pass").unwrap();
    }
    assert_eq!(run_directory(run_pass_path), 0);
}

// Iterates through the scenario files in the directory at the given path and runs each as a
// separate test case. Returns the number of cases that failed.
fn run_directory(directory_path: PathBuf) -> usize {
    let mut files: Vec<PathBuf> = WalkDir::new(directory_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort();
    assert!(!files.is_empty(), "no scenarios found");
    files
        .iter()
        .fold(0, |acc, file_name| acc + invoke_runner(file_name))
}

// Runs the single scenario found in file_name and reports what went wrong, if anything.
fn invoke_runner(file_name: &Path) -> usize {
    let options = Options::default();
    match scenario::run_file(file_name, &options) {
        Ok(report) => {
            if report.failures == 0 {
                return 0;
            }
            println!("{} failed:", file_name.display());
            for line in report.lines.iter() {
                println!("  {}", line);
            }
            1
        }
        Err(e) => {
            println!("{} could not be run: {}", file_name.display(), e);
            1
        }
    }
}
