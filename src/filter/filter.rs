use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::Query;

/// Applies a whole [`Query`] to an in-memory row set: where conditions,
/// then ordering, then offset/limit with the configured max-limit cap.
pub struct Filter;

impl Filter {
    pub fn apply(
        rows: Vec<Map<String, Value>>,
        query: &Query,
    ) -> Result<Vec<Map<String, Value>>, FilterError> {
        let mut selected = match &query.where_clause {
            Some(where_data) => {
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if FilterWhere::matches(where_data, &row)? {
                        kept.push(row);
                    }
                }
                kept
            }
            None => rows,
        };

        if let Some(order) = &query.order {
            let infos = FilterOrder::validate_and_parse(order)?;
            FilterOrder::sort(&mut selected, &infos);
        }

        let offset = query.effective_offset();
        if offset > 0 {
            selected.drain(..offset.min(selected.len()));
        }

        if let Some(limit) = query.limit {
            // Apply max limit from config
            let max_limit = crate::config::CONFIG.query.max_limit.unwrap_or(usize::MAX);
            let applied_limit = if limit > max_limit {
                if crate::config::CONFIG.query.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
                }
                max_limit
            } else {
                limit
            };
            selected.truncate(applied_limit);
        }

        Ok(selected)
    }

    /// Count rows matching the where conditions, ignoring pagination.
    pub fn count(
        rows: &[Map<String, Value>],
        where_clause: Option<&Value>,
    ) -> Result<usize, FilterError> {
        match where_clause {
            None => Ok(rows.len()),
            Some(where_data) => {
                let mut count = 0;
                for row in rows {
                    if FilterWhere::matches(where_data, row)? {
                        count += 1;
                    }
                }
                Ok(count)
            }
        }
    }
}
