//! Small arithmetic formula language used by slot transforms and cabinet sizes.
//!
//! Formulas are infix arithmetic (`+ - * / ( )`) over real literals and named
//! variables. Variables are bound by textual substitution before the
//! arithmetic is parsed:
//!
//! - names are substituted longest first, so `Hank1` is never corrupted by a
//!   binding for `Hank`;
//! - a name directly after a number or a closing parenthesis multiplies it
//!   (`2Width` reads as `2*Width`);
//! - division by zero evaluates to zero.
//!
//! ```
//! use bim_assembly::expression::evaluate;
//! use std::collections::HashMap;
//!
//! let vars = HashMap::from([("Width".to_string(), 3.0_f32)]);
//! assert_eq!(evaluate(&vars, "2Width + 1").unwrap(), 7.0);
//! ```

mod parser;
mod substitute;

pub use parser::evaluate_literal;

use crate::types::{UnitType, UnitValue, AXES};
use glam::Vec3;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Variable environment used by the layout solver.
pub type Variables = BTreeMap<String, f32>;

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*").expect("variable pattern is valid")
});

/// Errors raised while evaluating a formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected '{found}' at {position} in \"{expression}\"")]
    UnexpectedCharacter {
        expression: String,
        position: usize,
        found: char,
    },

    #[error("unexpected end of \"{expression}\"")]
    UnexpectedEnd { expression: String },

    #[error("unmatched parenthesis at {position} in \"{expression}\"")]
    UnmatchedParenthesis { expression: String, position: usize },

    #[error("invalid number '{literal}' in \"{expression}\"")]
    InvalidNumber { expression: String, literal: String },

    #[error("\"{expression}\" nests deeper than {limit} levels")]
    TooDeep { expression: String, limit: usize },

    /// A bound variable cannot be expressed in the common unit.
    #[error("variable {variable} cannot be converted to {unit:?}")]
    IncompatibleUnit { variable: String, unit: UnitType },
}

/// Evaluate `expr` with the given variable bindings.
pub fn evaluate<'a, K>(
    vars: impl IntoIterator<Item = (&'a K, &'a f32)>,
    expr: &str,
) -> Result<f32, ExpressionError>
where
    K: AsRef<str> + ?Sized + 'a,
{
    let mut bindings: Vec<(&str, f32)> = vars
        .into_iter()
        .map(|(name, value)| (name.as_ref(), *value))
        .collect();
    sort_longest_first(&mut bindings);

    let mut text: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    for (name, value) in bindings {
        text = substitute::replace_variable(&text, name, value);
    }

    evaluate_literal(&text)
}

/// Evaluate `expr` over unit-tagged bindings.
///
/// Every variable is converted to the most common unit among the bindings
/// (ties go to the earlier [`UnitType`] variant) and the result carries that
/// unit. With no bindings the result is in world centimeters.
pub fn evaluate_units<'a, K>(
    vars: impl IntoIterator<Item = (&'a K, &'a UnitValue)>,
    expr: &str,
) -> Result<UnitValue, ExpressionError>
where
    K: AsRef<str> + ?Sized + 'a,
{
    let bindings: Vec<(&str, UnitValue)> = vars
        .into_iter()
        .map(|(name, value)| (name.as_ref(), *value))
        .collect();

    let unit = common_unit(bindings.iter().map(|(_, v)| v.unit)).unwrap_or_default();

    let mut converted = Vec::with_capacity(bindings.len());
    for (name, value) in bindings {
        let v = value
            .as_unit(unit)
            .ok_or_else(|| ExpressionError::IncompatibleUnit {
                variable: name.to_string(),
                unit,
            })?;
        converted.push((name, v));
    }

    let value = evaluate(converted.iter().map(|(name, v)| (*name, v)), expr)?;
    Ok(UnitValue::new(value, unit))
}

/// Most frequent unit, ties broken by declaration order. `None` when empty.
fn common_unit(units: impl Iterator<Item = UnitType>) -> Option<UnitType> {
    let mut usage = [0usize; UnitType::ALL.len()];
    for unit in units {
        if let Some(idx) = UnitType::ALL.iter().position(|u| *u == unit) {
            usage[idx] += 1;
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (idx, count) in usage.iter().enumerate() {
        if *count > 0 && best.map_or(true, |(_, c)| *count > c) {
            best = Some((idx, *count));
        }
    }
    best.map(|(idx, _)| UnitType::ALL[idx])
}

fn sort_longest_first(bindings: &mut [(&str, f32)]) {
    bindings.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
}

/// Distinct variable-like tokens in `expr`, in order of first occurrence.
pub fn extract_variables(expr: &str) -> Vec<String> {
    let mut out = Vec::new();
    extract_variables_into(expr, &mut out);
    out
}

/// Append the variables of `expr` to `out`, skipping any already present.
pub fn extract_variables_into(expr: &str, out: &mut Vec<String>) {
    for m in VARIABLE_RE.find_iter(expr) {
        if !out.iter().any(|v| v == m.as_str()) {
            out.push(m.as_str().to_string());
        }
    }
}

/// Three formula strings evaluated as a vector, e.g. a slot's translation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VectorExpression {
    pub x: String,
    pub y: String,
    pub z: String,
}

impl VectorExpression {
    pub fn new(x: impl Into<String>, y: impl Into<String>, z: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
        }
    }

    pub fn zero() -> Self {
        Self::new("0", "0", "0")
    }

    /// `Self.<prefix>X`, `Self.<prefix>Y`, `Self.<prefix>Z`.
    pub fn self_reference(prefix: &str) -> Self {
        let [x, y, z] = AXES.map(|axis| format!("Self.{}{}", prefix, axis));
        Self { x, y, z }
    }

    pub fn components(&self) -> [&str; 3] {
        [&self.x, &self.y, &self.z]
    }

    pub fn extract_variables(&self, out: &mut Vec<String>) {
        for component in self.components() {
            extract_variables_into(component, out);
        }
    }

    /// Evaluate all three components. Blank components evaluate to zero.
    ///
    /// Every component is attempted; the first error is returned.
    pub fn evaluate(&self, vars: &Variables) -> Result<Vec3, ExpressionError> {
        let mut out = [0.0f32; 3];
        let mut first_error = None;
        for (slot, component) in out.iter_mut().zip(self.components()) {
            if component.trim().is_empty() {
                continue;
            }
            match evaluate(vars, component) {
                Ok(v) => *slot = v,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(Vec3::from_array(out)),
        }
    }
}
