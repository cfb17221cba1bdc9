// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Runs scenario files against the value layer and prints what they produced.

extern crate env_logger;

use symex::options::Options;
use symex::scenario;
use std::env;
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize loggers.
    if env::var("SYMEX_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("SYMEX_LOG")
            .write_style("SYMEX_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let command_line_arguments: Vec<String> = env::args().skip(1).collect();
    let mut options = Options::default();
    let rest = options.parse(&command_line_arguments)?;
    let mut files = options.scenarios.clone();
    files.extend(rest);

    let mut failures = 0;
    for file in files.iter() {
        let report = scenario::run_file(Path::new(file), &options)?;
        if options.dump {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", file);
            for line in report.lines.iter() {
                println!("  {}", line);
            }
        }
        failures += report.failures;
    }
    if failures > 0 {
        return Err(format!("{} expectation(s) not met", failures).into());
    }
    Ok(())
}
