//! Feature vectorization for loosely-shaped patient records.
//!
//! Clients send symptom/vitals records with inconsistent key spellings and
//! value encodings. Every recognized key, alias and default lives in
//! [`SCHEMA`]; nothing else in the crate inspects raw records.
//!
//! The output is always [`FEATURE_COUNT`] values in canonical order:
//! fever, cough, fatigue, difficulty-breathing, age, gender,
//! blood-pressure category, cholesterol category.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{ClinicError, Result};

pub const FEATURE_COUNT: usize = 8;

/// Raw request record as received from a client.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Fever,
    Cough,
    Fatigue,
    DifficultyBreathing,
    Age,
    Gender,
    BloodPressure,
    Cholesterol,
}

impl Feature {
    /// Canonical order of the feature vector.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Fever,
        Feature::Cough,
        Feature::Fatigue,
        Feature::DifficultyBreathing,
        Feature::Age,
        Feature::Gender,
        Feature::BloodPressure,
        Feature::Cholesterol,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used by the training pipeline.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    fn spec(self) -> &'static FieldSpec {
        &SCHEMA[self.index()]
    }

    /// Resolve a declared feature name (canonical name or any alias, case-insensitive).
    pub fn resolve(name: &str) -> Option<Feature> {
        let name = name.trim();
        SCHEMA
            .iter()
            .find(|spec| {
                spec.name.eq_ignore_ascii_case(name)
                    || spec.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
            })
            .map(|spec| spec.feature)
    }

    /// Resolve a whole declared feature list. `None` unless every name is recognized.
    pub fn resolve_all(names: &[String]) -> Option<Vec<Feature>> {
        if names.is_empty() {
            return None;
        }
        names.iter().map(|n| Feature::resolve(n)).collect()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    /// Truthy text ("yes", "y", "true", "1") → 1, anything else → 0
    Flag,
    /// Floating-point number
    Numeric,
    /// Male alias ("male", "m", "1") → 1, anything else → 0
    Male,
    /// "Low" → 0, "Normal" → 1, "High" → 2
    Category,
}

#[derive(Debug)]
struct FieldSpec {
    feature: Feature,
    name: &'static str,
    /// Record keys tried in order; matching is case-insensitive.
    aliases: &'static [&'static str],
    encoding: Encoding,
    default: f64,
}

static SCHEMA: [FieldSpec; FEATURE_COUNT] = [
    FieldSpec {
        feature: Feature::Fever,
        name: "fever",
        aliases: &["Fever"],
        encoding: Encoding::Flag,
        default: 0.0,
    },
    FieldSpec {
        feature: Feature::Cough,
        name: "cough",
        aliases: &["Cough"],
        encoding: Encoding::Flag,
        default: 0.0,
    },
    FieldSpec {
        feature: Feature::Fatigue,
        name: "fatigue",
        aliases: &["Fatigue"],
        encoding: Encoding::Flag,
        default: 0.0,
    },
    FieldSpec {
        feature: Feature::DifficultyBreathing,
        name: "difficulty_breathing",
        aliases: &[
            "DifficultyBreathing",
            "Difficulty Breathing",
            "difficulty_breathing",
            "dbreath",
        ],
        encoding: Encoding::Flag,
        default: 0.0,
    },
    FieldSpec {
        feature: Feature::Age,
        name: "age",
        aliases: &["Age"],
        encoding: Encoding::Numeric,
        default: 0.0,
    },
    FieldSpec {
        feature: Feature::Gender,
        name: "gender",
        aliases: &["Gender"],
        encoding: Encoding::Male,
        default: 0.0,
    },
    FieldSpec {
        feature: Feature::BloodPressure,
        name: "blood_pressure",
        aliases: &["BloodPressure", "Blood Pressure", "blood_pressure", "bp_cat"],
        encoding: Encoding::Category,
        default: 1.0,
    },
    FieldSpec {
        feature: Feature::Cholesterol,
        name: "cholesterol",
        aliases: &["Cholesterol", "Cholesterol Level", "chol"],
        encoding: Encoding::Category,
        default: 1.0,
    },
];

const TRUTHY: &[&str] = &["yes", "y", "true", "1"];
const MALE: &[&str] = &["male", "m", "1"];

/// Policy for an age value that is present but not a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgePolicy {
    /// Fall back to 0, like a missing age.
    #[default]
    Lenient,
    /// Reject the record with `InvalidInput`.
    Strict,
}

/// Fixed-length numeric vector in canonical feature order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    /// Reorder (or subset) the vector to a model's declared feature order.
    pub fn project(&self, order: &[Feature]) -> Vec<f64> {
        order.iter().map(|f| self.get(*f)).collect()
    }
}

/// Maps records into [`FeatureVector`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vectorizer {
    age_policy: AgePolicy,
}

impl Vectorizer {
    pub fn new(age_policy: AgePolicy) -> Self {
        Self { age_policy }
    }

    pub fn age_policy(&self) -> AgePolicy {
        self.age_policy
    }

    /// Vectorize a record. Only fails for an unparsable age under [`AgePolicy::Strict`].
    pub fn vectorize(&self, record: &Record) -> Result<FeatureVector> {
        let mut values = [0.0; FEATURE_COUNT];
        for spec in SCHEMA.iter() {
            values[spec.feature.index()] = match lookup(record, spec) {
                None => spec.default,
                Some(raw) => match encode(spec, raw) {
                    Some(x) => x,
                    None if self.age_policy == AgePolicy::Strict => {
                        return Err(ClinicError::InvalidInput(format!(
                            "{} is not a number: {}",
                            spec.name,
                            as_text(raw)
                        )));
                    }
                    None => spec.default,
                },
            };
        }
        Ok(FeatureVector(values))
    }
}

/// Lenient vectorization; never fails.
pub fn vectorize(record: &Record) -> FeatureVector {
    let mut values = [0.0; FEATURE_COUNT];
    for spec in SCHEMA.iter() {
        values[spec.feature.index()] = lookup(record, spec)
            .and_then(|raw| encode(spec, raw))
            .unwrap_or(spec.default);
    }
    FeatureVector(values)
}

/// First present value among the field's aliases. Exact key spelling wins
/// over a case-insensitive match for the same alias.
fn lookup<'a>(record: &'a Record, spec: &FieldSpec) -> Option<&'a Value> {
    spec.aliases
        .iter()
        .copied()
        .chain(std::iter::once(spec.name))
        .find_map(|alias| {
            record.get(alias).filter(|v| is_present(v)).or_else(|| {
                record
                    .iter()
                    .find(|(k, v)| k.eq_ignore_ascii_case(alias) && is_present(v))
                    .map(|(_, v)| v)
            })
        })
}

/// Empty strings, null, false, zero and empty containers count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Encode a present value. `None` means a numeric field could not be parsed.
fn encode(spec: &FieldSpec, raw: &Value) -> Option<f64> {
    if spec.encoding == Encoding::Numeric {
        return parse_number(raw);
    }
    let text = as_text(raw);
    let trimmed = text.trim();
    Some(match spec.encoding {
        Encoding::Flag => flag(TRUTHY, trimmed),
        Encoding::Male => flag(MALE, trimmed),
        // category names are matched exactly, as the trainer's encoder does
        Encoding::Category => match trimmed {
            "Low" => 0.0,
            "Normal" => 1.0,
            "High" => 2.0,
            _ => spec.default,
        },
        Encoding::Numeric => return parse_number(raw),
    })
}

fn flag(accepted: &[&str], text: &str) -> f64 {
    let lowered = text.to_ascii_lowercase();
    if accepted.contains(&lowered.as_str()) {
        1.0
    } else {
        0.0
    }
}
