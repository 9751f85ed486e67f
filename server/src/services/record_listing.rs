// calc_ledger/src/services/record_listing.rs

//! Request parsing and page arithmetic for the record listing.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::storage::{RecordQuery, SortColumn, SortDirection};

pub const PER_PAGE: i64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct SortCriteria {
  pub column: String,
  /// `"down"` sorts descending, anything else ascending.
  #[serde(default)]
  pub order: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationTypeFilter {
  pub id: i64,
  #[serde(default)]
  pub status: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRecordsRequest {
  #[serde(default)]
  pub page_number: Option<i64>,
  #[serde(default)]
  pub sort_criteria: Option<SortCriteria>,
  #[serde(default)]
  pub filter_operation_type: Option<Vec<OperationTypeFilter>>,
}

impl ListRecordsRequest {
  /// Page numbers below 1 read as 1.
  pub fn page(&self) -> i64 {
    self.page_number.unwrap_or(1).clamp(1, i64::from(i32::MAX))
  }

  pub fn to_query(&self) -> Result<RecordQuery, AppError> {
    let (sort, direction) = match &self.sort_criteria {
      Some(criteria) => {
        let column = SortColumn::parse(&criteria.column)
          .ok_or_else(|| AppError::Validation(format!("cannot sort by '{}'", criteria.column)))?;
        let direction = if criteria.order == "down" {
          SortDirection::Desc
        } else {
          SortDirection::Asc
        };
        (column, direction)
      }
      None => (SortColumn::Id, SortDirection::Asc),
    };

    let operation_ids = self
      .filter_operation_type
      .as_ref()
      .map(|filters| filters.iter().filter(|f| f.status).map(|f| f.id).collect());

    Ok(RecordQuery {
      operation_ids,
      sort,
      direction,
      limit: PER_PAGE,
      offset: (self.page() - 1).saturating_mul(PER_PAGE),
    })
  }
}

/// Page descriptor returned next to the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginator {
  pub page_number: i64,
  pub pages: i64,
  pub total_items: i64,
  pub next_page: i64,
  pub previous_page: i64,
  /// Up to four page numbers before the current one.
  pub prev_range: Vec<i64>,
  /// Up to three page numbers after the current one.
  pub next_range: Vec<i64>,
}

impl Paginator {
  pub fn new(page_number: i64, total_items: i64, per_page: i64) -> Self {
    let pages = (total_items + per_page - 1) / per_page;
    Self {
      page_number,
      pages,
      total_items,
      next_page: (page_number + 1).min(pages),
      previous_page: (page_number - 1).max(1),
      prev_range: ((page_number - 4).max(1)..page_number).collect(),
      next_range: (page_number + 1..(page_number + 4).min(pages + 1)).collect(),
    }
  }
}
