// calc_ledger/src/storage/query.rs

use sqlx::{QueryBuilder, Sqlite};

/// Columns a record listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
  #[default]
  Id,
  Date,
  Amount,
  UserBalance,
  OperationType,
  Alias,
}

impl SortColumn {
  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "id" => Some(Self::Id),
      "date" => Some(Self::Date),
      "amount" => Some(Self::Amount),
      "user_balance" => Some(Self::UserBalance),
      "operation_type" => Some(Self::OperationType),
      "alias" => Some(Self::Alias),
      _ => None,
    }
  }

  fn sql(self) -> &'static str {
    match self {
      Self::Id => "r.id",
      Self::Date => "r.created_at",
      Self::Amount => "r.amount",
      Self::UserBalance => "r.user_balance",
      Self::OperationType => "o.operation_type",
      Self::Alias => "o.alias",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

/// Filter, order and window for one page of a user's records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
  /// `None` keeps every operation type; `Some(vec![])` keeps none.
  pub operation_ids: Option<Vec<i64>>,
  pub sort: SortColumn,
  pub direction: SortDirection,
  pub limit: i64,
  pub offset: i64,
}

impl RecordQuery {
  /// Appends the WHERE clause shared by the count and the page query.
  pub(crate) fn push_filters(&self, builder: &mut QueryBuilder<'_, Sqlite>, user_id: i64) {
    builder.push(" WHERE r.user_id = ");
    builder.push_bind(user_id);
    builder.push(" AND r.deleted_at IS NULL");

    if let Some(ids) = &self.operation_ids {
      if ids.is_empty() {
        builder.push(" AND 1 = 0");
      } else {
        builder.push(" AND r.operation_id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
          separated.push_bind(*id);
        }
        separated.push_unseparated(")");
      }
    }
  }

  pub(crate) fn push_order_and_window(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
    let direction = match self.direction {
      SortDirection::Asc => "ASC",
      SortDirection::Desc => "DESC",
    };
    builder.push(" ORDER BY ");
    builder.push(self.sort.sql());
    builder.push(" ");
    builder.push(direction);
    if self.sort != SortColumn::Id {
      builder.push(", r.id ASC");
    }
    builder.push(" LIMIT ");
    builder.push_bind(self.limit);
    builder.push(" OFFSET ");
    builder.push_bind(self.offset);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_only_whitelisted_columns() {
    assert_eq!(SortColumn::parse("user_balance"), Some(SortColumn::UserBalance));
    assert_eq!(SortColumn::parse("date"), Some(SortColumn::Date));
    assert_eq!(SortColumn::parse("id; DROP TABLE records"), None);
    assert_eq!(SortColumn::parse("ID"), None);
  }

  #[test]
  fn builds_filtered_page_sql() {
    let query = RecordQuery {
      operation_ids: Some(vec![1, 3]),
      sort: SortColumn::Amount,
      direction: SortDirection::Desc,
      limit: 5,
      offset: 10,
    };
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT r.id FROM records r JOIN operations o ON o.id = r.operation_id");
    query.push_filters(&mut builder, 7);
    query.push_order_and_window(&mut builder);
    assert_eq!(
      builder.sql(),
      "SELECT r.id FROM records r JOIN operations o ON o.id = r.operation_id WHERE r.user_id = ? AND r.deleted_at IS NULL AND r.operation_id IN (?, ?) ORDER BY r.amount DESC, r.id ASC LIMIT ? OFFSET ?"
    );
  }

  #[test]
  fn empty_filter_matches_nothing() {
    let query = RecordQuery {
      operation_ids: Some(vec![]),
      limit: 5,
      ..Default::default()
    };
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM records r");
    query.push_filters(&mut builder, 1);
    assert!(builder.sql().ends_with("AND 1 = 0"));
  }
}
