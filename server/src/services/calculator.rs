// calc_ledger/src/services/calculator.rs

//! Evaluates catalog operations over user operands.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use super::catalog::OperationKind;
use super::random_org::{RandomSourceError, RandomStringSource};
use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum CalcError {
  #[error("non valid operation selected")]
  InvalidOperation,
  #[error("you didnt specified any input")]
  NoOperands,
  #[error("invalid data provided at estimation: {0}")]
  InvalidOperand(String),
  #[error("division by zero")]
  DivisionByZero,
  #[error("something went wrong on api call to random")]
  Provider(#[source] RandomSourceError),
}

impl From<CalcError> for AppError {
  fn from(err: CalcError) -> Self {
    match err {
      CalcError::Provider(source) => {
        tracing::warn!(error = %source, "Random string provider failed.");
        AppError::Upstream(CalcError::Provider(source).to_string())
      }
      other => AppError::Validation(other.to_string()),
    }
  }
}

/// Result of one calculation. Numbers stay numbers in JSON; square roots and
/// random strings are text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalcOutput {
  Number(f64),
  Text(String),
}

/// Reads operands from a JSON array of numbers or a comma separated string
/// such as `"2, 3, 5"`. Empty input is `CalcError::NoOperands`.
pub fn parse_operands(raw: &Value) -> Result<Vec<f64>, CalcError> {
  let operands = match raw {
    Value::Array(items) => items
      .iter()
      .map(|item| {
        item
          .as_f64()
          .ok_or_else(|| CalcError::InvalidOperand(format!("{} is not a number", item)))
      })
      .collect::<Result<Vec<_>, _>>()?,
    Value::String(text) => {
      if text.trim().is_empty() {
        return Err(CalcError::NoOperands);
      }
      text
        .split(',')
        .map(|part| {
          let part = part.trim();
          part
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| CalcError::InvalidOperand(format!("'{}' is not a number", part)))
        })
        .collect::<Result<Vec<_>, _>>()?
    }
    Value::Number(n) => vec![n
      .as_f64()
      .ok_or_else(|| CalcError::InvalidOperand(n.to_string()))?],
    Value::Null => return Err(CalcError::NoOperands),
    other => return Err(CalcError::InvalidOperand(format!("unsupported operand payload {}", other))),
  };

  if operands.is_empty() {
    return Err(CalcError::NoOperands);
  }
  Ok(operands)
}

fn fold(operands: &[f64], op: impl Fn(f64, f64) -> f64) -> Result<f64, CalcError> {
  let (first, rest) = operands.split_first().ok_or(CalcError::NoOperands)?;
  Ok(rest.iter().fold(*first, |acc, n| op(acc, *n)))
}

fn finite(value: f64) -> Result<CalcOutput, CalcError> {
  if value.is_finite() {
    Ok(CalcOutput::Number(value))
  } else {
    Err(CalcError::InvalidOperand("result is not a finite number".to_string()))
  }
}

/// `2.0`, `1.414`, `0` for negatives.
fn format_root(n: f64) -> String {
  if n < 0.0 {
    return "0".to_string();
  }
  // `+ 0.0` folds a negative zero into `0.0`.
  let rounded = (n.sqrt() * 1000.0).round() / 1000.0 + 0.0;
  if rounded.fract() == 0.0 {
    format!("{:.1}", rounded)
  } else {
    format!("{}", rounded)
  }
}

/// Pure arithmetic. `RandomString` is not handled here.
pub fn evaluate(kind: OperationKind, operands: &[f64]) -> Result<CalcOutput, CalcError> {
  if operands.is_empty() {
    return Err(CalcError::NoOperands);
  }
  match kind {
    OperationKind::Add => finite(fold(operands, |a, b| a + b)?),
    OperationKind::Sub => finite(fold(operands, |a, b| a - b)?),
    OperationKind::Mul => finite(fold(operands, |a, b| a * b)?),
    OperationKind::Div => {
      if operands[1..].iter().any(|n| *n == 0.0) {
        return Err(CalcError::DivisionByZero);
      }
      finite(fold(operands, |a, b| a / b)?)
    }
    OperationKind::SquareRoot => Ok(CalcOutput::Text(
      operands.iter().map(|n| format_root(*n)).collect::<Vec<_>>().join(","),
    )),
    OperationKind::RandomString => Err(CalcError::InvalidOperation),
  }
}

/// Runs `kind`. Random strings come from `random_source`.
#[instrument(name = "calculator::compute", skip(operands, random_source), fields(alias = kind.alias(), operand_count = operands.len()), err(Display))]
pub async fn compute(
  kind: OperationKind,
  operands: &[f64],
  random_source: &dyn RandomStringSource,
) -> Result<CalcOutput, CalcError> {
  let output = match kind {
    OperationKind::RandomString => random_source
      .random_string()
      .await
      .map(CalcOutput::Text)
      .map_err(CalcError::Provider)?,
    arithmetic => evaluate(arithmetic, operands)?,
  };
  debug!(?output, "Calculation finished.");
  Ok(output)
}
