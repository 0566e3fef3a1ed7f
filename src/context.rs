// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The environment a formula is evaluated against, supplied fresh per
/// execution by the scoring engine: per-name lookup tables derived from an
/// assessment's configuration and error inventory, plus a handful of
/// scalars.  Read-only during evaluation.
///
/// Every field defaults to empty/zero so partially-specified contexts
/// (including ones deserialized from JSON) behave per the resolution
/// rules: missing names read as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormulaContext {
    pub dimensions: HashMap<String, f64>,
    pub error_types: HashMap<String, f64>,
    pub weights: HashMap<String, f64>,
    pub constants: HashMap<String, f64>,
    pub variables: HashMap<String, f64>,
    pub total_errors: f64,
    pub unit_count: f64,
    pub error_rate: f64,
    pub max_score: f64,
    pub passing_threshold: f64,
}

impl std::str::FromStr for FormulaContext {
    type Err = crate::common::Error;

    /// Parse a context from the JSON the platform sends.  Absent fields
    /// default to empty maps and zero scalars.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|err| {
            crate::common::Error::new(
                crate::common::ErrorKind::Validation,
                crate::common::ErrorCode::Generic,
                Some(format!("failed to parse context: {err}")),
            )
        })
    }
}

impl FormulaContext {
    pub fn new() -> Self {
        Self::default()
    }
}
