// Copyright 2023 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! This file runs the compliance corpus under `tests/compliance/`.
//!
//! Each corpus file holds a list of suites; a suite is a `given` document
//! and a list of cases, each expecting either a `result` value or an
//! `error` kind.

use jmespath_engine::{search, Error, Value};
use libtest_mimic::{Arguments, Failed, Trial};
use serde::Deserialize;

fn main() {
    let args = Arguments::from_args();

    let corpus: &[(&str, &str)] = &[
        ("basic", include_str!("compliance/basic.json")),
        ("boolean", include_str!("compliance/boolean.json")),
        ("current", include_str!("compliance/current.json")),
        ("datetime", include_str!("compliance/datetime.json")),
        ("escape", include_str!("compliance/escape.json")),
        ("filters", include_str!("compliance/filters.json")),
        ("functions", include_str!("compliance/functions.json")),
        ("identifiers", include_str!("compliance/identifiers.json")),
        ("indices", include_str!("compliance/indices.json")),
        ("literal", include_str!("compliance/literal.json")),
        ("multiselect", include_str!("compliance/multiselect.json")),
        ("pipe", include_str!("compliance/pipe.json")),
        ("slice", include_str!("compliance/slice.json")),
        ("syntax", include_str!("compliance/syntax.json")),
        ("unicode", include_str!("compliance/unicode.json")),
        ("wildcard", include_str!("compliance/wildcard.json")),
    ];

    let mut tests = Vec::new();
    for (name, content) in corpus {
        let suites: Vec<Suite> = serde_json::from_str(content)
            .unwrap_or_else(|e| panic!("corpus file {name}.json is malformed: {e}"));
        for (si, suite) in suites.into_iter().enumerate() {
            let given = Value::from(suite.given);
            for (ci, case) in suite.cases.into_iter().enumerate() {
                let given = given.clone();
                tests.push(Trial::test(
                    format!("{name}[{si}:{ci}]: {}", case.expression),
                    move || run_case(&given, case),
                ));
            }
        }
    }

    libtest_mimic::run(&args, tests).exit();
}

#[derive(Deserialize)]
struct Suite {
    given: serde_json::Value,
    cases: Vec<Case>,
}

#[derive(Deserialize)]
struct Case {
    expression: String,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Syntax { .. } => "syntax",
        Error::InvalidArity(_) => "invalid-arity",
        Error::InvalidType(_) => "invalid-type",
        Error::InvalidValue(_) => "invalid-value",
        Error::UnknownFunction(_) => "unknown-function",
        _ => "invalid-visit",
    }
}

fn run_case(given: &Value, case: Case) -> Result<(), Failed> {
    let outcome = search(&case.expression, given);
    match (outcome, case.error) {
        (Ok(value), None) => {
            let expected = Value::from(case.result.unwrap_or(serde_json::Value::Null));
            if value == expected {
                Ok(())
            } else {
                Err(format!("expected {expected}, got {value}").into())
            }
        }
        (Ok(value), Some(error)) => Err(format!("expected {error} error, got {value}").into()),
        (Err(err), Some(error)) => {
            if error_kind(&err) == error {
                Ok(())
            } else {
                Err(format!("expected {error} error, got: {err}").into())
            }
        }
        (Err(err), None) => Err(format!("expected a result, got: {err}").into()),
    }
}
