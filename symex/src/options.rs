// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::k_limits;

use clap::{App, AppSettings, Arg};
use itertools::Itertools;
use thiserror::Error;

/// Creates the clap::App metadata for argument parsing.
fn make_options_parser<'a>() -> App<'a, 'a> {
    App::new("symex")
    .setting(AppSettings::NoBinaryName)
    .version("v0.1.0")
    .arg(Arg::with_name("max_symbol_complexity")
        .long("max_symbol_complexity")
        .takes_value(true)
        .help("The largest symbolic expression that will be built.")
        .long_help("Operations on tainted values whose result would have this many or more leaf symbols produce an unknown value instead. The default is 10000."))
    .arg(Arg::with_name("dump")
        .long("dump")
        .takes_value(false)
        .help("Print the scenario report as JSON."))
    .arg(Arg::with_name("scenario")
        .long("scenario")
        .short("s")
        .takes_value(true)
        .multiple(true)
        .number_of_values(1)
        .help("A JSON scenario file to run.")
        .long_help("May be given more than once. Scenario files can also be listed after --."))
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("cannot parse argument string: {0}")]
    Split(String),
    #[error(transparent)]
    Clap(#[from] clap::Error),
    #[error("--{name} expects an integer, not `{value}`")]
    NotANumber { name: &'static str, value: String },
}

/// Represents options passed to the scenario driver.
#[derive(Clone, Debug)]
pub struct Options {
    pub max_symbol_complexity: usize,
    pub dump: bool,
    pub scenarios: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_symbol_complexity: k_limits::MAX_SYMBOL_COMPLEXITY,
            dump: false,
            scenarios: Vec::new(),
        }
    }
}

impl Options {
    /// Parse options from an argument string. The argument string will be split using unix
    /// shell escaping rules. Any content beyond the leftmost `--` token will be returned
    /// (excluding this token).
    pub fn parse_from_str(&mut self, s: &str) -> Result<Vec<String>, OptionsError> {
        let args = shellwords::split(s).map_err(|e| OptionsError::Split(format!("{:?}", e)))?;
        self.parse(&args)
    }

    /// Parses options from a list of strings. Any content beyond the leftmost `--` token
    /// will be returned (excluding this token).
    pub fn parse(&mut self, args: &[String]) -> Result<Vec<String>, OptionsError> {
        let mut symex_args_end = args.len();
        let mut rest_start = args.len();
        if let Some((p, _)) = args.iter().find_position(|s| s.as_str() == "--") {
            symex_args_end = p;
            rest_start = p + 1;
        }
        let matches = make_options_parser().get_matches_from_safe(args[0..symex_args_end].iter())?;

        if let Some(value) = matches.value_of("max_symbol_complexity") {
            self.max_symbol_complexity =
                value
                    .parse::<usize>()
                    .map_err(|_| OptionsError::NotANumber {
                        name: "max_symbol_complexity",
                        value: value.to_string(),
                    })?;
        }
        if matches.is_present("dump") {
            self.dump = true;
        }
        if let Some(values) = matches.values_of("scenario") {
            self.scenarios.extend(values.map(|s| s.to_string()));
        }
        Ok(args[rest_start..].to_vec())
    }
}
