// calc_ledger/src/services/catalog.rs

//! The fixed set of billable operations.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
  pub alias: &'static str,
  pub operation_type: &'static str,
  pub cost: i64,
}

/// Seeded into the `operations` table at startup.
pub const DEFAULT_CATALOG: &[CatalogEntry] = &[
  CatalogEntry { alias: "add", operation_type: "addition", cost: 10 },
  CatalogEntry { alias: "sub", operation_type: "subtraction", cost: 10 },
  CatalogEntry { alias: "mul", operation_type: "multiplication", cost: 10 },
  CatalogEntry { alias: "div", operation_type: "division", cost: 10 },
  CatalogEntry { alias: "sqr", operation_type: "square_root", cost: 40 },
  CatalogEntry { alias: "rand", operation_type: "random_string", cost: 50 },
];

/// What a catalog alias computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Add,
  Sub,
  Mul,
  Div,
  SquareRoot,
  RandomString,
}

impl OperationKind {
  /// Exact, case-sensitive match.
  pub fn from_alias(alias: &str) -> Option<Self> {
    match alias {
      "add" => Some(Self::Add),
      "sub" => Some(Self::Sub),
      "mul" => Some(Self::Mul),
      "div" => Some(Self::Div),
      "sqr" => Some(Self::SquareRoot),
      "rand" => Some(Self::RandomString),
      _ => None,
    }
  }

  pub fn alias(self) -> &'static str {
    match self {
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Mul => "mul",
      Self::Div => "div",
      Self::SquareRoot => "sqr",
      Self::RandomString => "rand",
    }
  }

  /// Whether the operation consumes numeric operands.
  pub fn takes_operands(self) -> bool {
    !matches!(self, Self::RandomString)
  }
}
