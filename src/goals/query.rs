//! Interpretation of a goal-listing request: filters, ordering,
//! pagination and the aggregate statistics block.

use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::goals::dto::ListGoalsQuery;

pub const DEFAULT_PER_PAGE: i64 = 20;

/// Goal priority. Stored lowercase in the database; ordering uses the
/// fixed rank table high=1, medium=2, low=3 rather than the alphabetical
/// order of the labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    CreatedAt,
    StartDate,
    EndDate,
    Priority,
}

impl SortBy {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "created_at" => Some(Self::CreatedAt),
            "start_date" => Some(Self::StartDate),
            "end_date" => Some(Self::EndDate),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Exact-match predicates the caller asked for. Absent fields impose no
/// constraint.
#[derive(Debug, Clone, Default)]
pub struct GoalFilters {
    pub goal_type: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub is_completed: Option<bool>,
}

/// A fully validated listing request.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub filters: GoalFilters,
    pub page: i64,
    pub per_page: i64,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl ListParams {
    /// Validates raw query-string values. Malformed page, per_page,
    /// sort_order, priority and is_completed values are rejected; an
    /// unknown sort_by falls back to created_at descending.
    pub fn from_query(raw: ListGoalsQuery) -> ApiResult<Self> {
        let page = parse_positive("page", raw.page.as_deref(), 1)?;
        let per_page = parse_positive("per_page", raw.per_page.as_deref(), DEFAULT_PER_PAGE)?;

        let mut sort_order = match non_empty(raw.sort_order) {
            None => SortOrder::Desc,
            Some(value) => SortOrder::parse(&value)
                .ok_or_else(|| ApiError::validation("sort_order must be one of: asc, desc"))?,
        };
        let sort_by = match non_empty(raw.sort_by) {
            None => SortBy::CreatedAt,
            Some(value) => match SortBy::parse(&value) {
                Some(by) => by,
                None => {
                    // Unknown sort columns never error; the listing falls
                    // back to the default ordering instead.
                    sort_order = SortOrder::Desc;
                    SortBy::CreatedAt
                }
            },
        };

        let priority = match non_empty(raw.priority) {
            None => None,
            Some(value) => Some(Priority::parse(&value).ok_or_else(|| {
                ApiError::validation("Priority must be one of: low, medium, high")
            })?),
        };
        let is_completed = match non_empty(raw.is_completed) {
            None => None,
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => return Err(ApiError::validation("is_completed must be true or false")),
            },
        };

        Ok(Self {
            filters: GoalFilters {
                goal_type: non_empty(raw.goal_type),
                priority,
                category: non_empty(raw.category),
                is_completed,
            },
            page,
            per_page,
            sort_by,
            sort_order,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// Empty query-string values count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_positive(name: &str, value: Option<&str>, default: i64) -> ApiResult<i64> {
    match value.filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => match v.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(ApiError::Validation(format!(
                "{name} must be a positive integer"
            ))),
        },
    }
}

/// ORDER BY clause for a sort spec. Priority ordering goes through the
/// rank table, so descending means high first; every non-created_at sort
/// carries a created_at tie-break to keep pages stable.
pub fn order_by_sql(sort_by: SortBy, sort_order: SortOrder) -> &'static str {
    match (sort_by, sort_order) {
        (SortBy::CreatedAt, SortOrder::Asc) => "created_at ASC",
        (SortBy::CreatedAt, SortOrder::Desc) => "created_at DESC",
        (SortBy::StartDate, SortOrder::Asc) => "start_date ASC, created_at DESC",
        (SortBy::StartDate, SortOrder::Desc) => "start_date DESC, created_at DESC",
        (SortBy::EndDate, SortOrder::Asc) => "end_date ASC, created_at DESC",
        (SortBy::EndDate, SortOrder::Desc) => "end_date DESC, created_at DESC",
        (SortBy::Priority, SortOrder::Asc) => {
            "CASE priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END DESC, created_at DESC"
        }
        (SortBy::Priority, SortOrder::Desc) => {
            "CASE priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END ASC, created_at DESC"
        }
    }
}

/// Offset-pagination bookkeeping returned with every listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: i64, per_page: i64, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items - 1) / per_page + 1
        };
        Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Aggregates over the whole of a user's goal set, unaffected by the
/// filters applied to the listing itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalStatistics {
    pub total_goals: i64,
    pub completed_goals: i64,
    pub pending_goals: i64,
    pub overdue_goals: i64,
    pub completion_rate: f64,
}

impl GoalStatistics {
    pub fn from_counts(total: i64, completed: i64, overdue: i64) -> Self {
        let completion_rate = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        };
        Self {
            total_goals: total,
            completed_goals: completed,
            pending_goals: total - completed,
            overdue_goals: overdue,
            completion_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(entries: &[(&str, &str)]) -> ListGoalsQuery {
        let mut raw = ListGoalsQuery::default();
        for (key, value) in entries {
            let slot = match *key {
                "goal_type" => &mut raw.goal_type,
                "priority" => &mut raw.priority,
                "category" => &mut raw.category,
                "is_completed" => &mut raw.is_completed,
                "page" => &mut raw.page,
                "per_page" => &mut raw.per_page,
                "sort_by" => &mut raw.sort_by,
                "sort_order" => &mut raw.sort_order,
                other => panic!("unknown query key {other}"),
            };
            *slot = Some((*value).to_string());
        }
        raw
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let params = ListParams::from_query(ListGoalsQuery::default()).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, DEFAULT_PER_PAGE);
        assert_eq!(params.sort_by, SortBy::CreatedAt);
        assert_eq!(params.sort_order, SortOrder::Desc);
        assert!(params.filters.goal_type.is_none());
        assert!(params.filters.priority.is_none());
        assert!(params.filters.category.is_none());
        assert!(params.filters.is_completed.is_none());
    }

    #[test]
    fn empty_string_values_count_as_absent() {
        let params = ListParams::from_query(query(&[
            ("goal_type", ""),
            ("priority", ""),
            ("is_completed", ""),
            ("page", ""),
            ("sort_order", ""),
        ]))
        .unwrap();
        assert!(params.filters.goal_type.is_none());
        assert!(params.filters.priority.is_none());
        assert!(params.filters.is_completed.is_none());
        assert_eq!(params.page, 1);
        assert_eq!(params.sort_order, SortOrder::Desc);
    }

    #[test]
    fn filters_are_carried_through() {
        let params = ListParams::from_query(query(&[
            ("goal_type", "personal"),
            ("priority", "HIGH"),
            ("category", "health"),
            ("is_completed", "false"),
        ]))
        .unwrap();
        assert_eq!(params.filters.goal_type.as_deref(), Some("personal"));
        assert_eq!(params.filters.priority, Some(Priority::High));
        assert_eq!(params.filters.category.as_deref(), Some("health"));
        assert_eq!(params.filters.is_completed, Some(false));
    }

    #[test]
    fn priority_filter_must_be_a_known_label() {
        let err = ListParams::from_query(query(&[("priority", "urgent")])).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn is_completed_only_accepts_true_or_false() {
        for value in ["yes", "1", "TRUEISH"] {
            let err = ListParams::from_query(query(&[("is_completed", value)])).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{value}");
        }
        let params = ListParams::from_query(query(&[("is_completed", "True")])).unwrap();
        assert_eq!(params.filters.is_completed, Some(true));
    }

    #[test]
    fn page_and_per_page_must_be_positive_integers() {
        for (key, value) in [
            ("page", "0"),
            ("page", "-3"),
            ("page", "two"),
            ("per_page", "0"),
            ("per_page", "1.5"),
        ] {
            let err = ListParams::from_query(query(&[(key, value)])).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{key}={value}");
        }
        let params = ListParams::from_query(query(&[("page", "3"), ("per_page", "5")])).unwrap();
        assert_eq!(params.page, 3);
        assert_eq!(params.per_page, 5);
        assert_eq!(params.offset(), 10);
    }

    #[test]
    fn unknown_sort_by_falls_back_to_newest_first() {
        let params =
            ListParams::from_query(query(&[("sort_by", "color"), ("sort_order", "asc")])).unwrap();
        assert_eq!(params.sort_by, SortBy::CreatedAt);
        assert_eq!(params.sort_order, SortOrder::Desc);
    }

    #[test]
    fn unknown_sort_order_is_rejected() {
        let err = ListParams::from_query(query(&[("sort_order", "sideways")])).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn sort_params_are_case_insensitive() {
        let params =
            ListParams::from_query(query(&[("sort_by", "Priority"), ("sort_order", "ASC")]))
                .unwrap();
        assert_eq!(params.sort_by, SortBy::Priority);
        assert_eq!(params.sort_order, SortOrder::Asc);
    }

    #[test]
    fn priority_ordering_flips_the_rank_direction() {
        let desc = order_by_sql(SortBy::Priority, SortOrder::Desc);
        assert!(desc.contains("END ASC"), "desc priority walks rank upward");
        let asc = order_by_sql(SortBy::Priority, SortOrder::Asc);
        assert!(asc.contains("END DESC"), "asc priority walks rank downward");
    }

    #[test]
    fn secondary_ordering_is_always_newest_first() {
        for (by, order) in [
            (SortBy::StartDate, SortOrder::Asc),
            (SortBy::EndDate, SortOrder::Desc),
            (SortBy::Priority, SortOrder::Asc),
        ] {
            assert!(order_by_sql(by, order).ends_with("created_at DESC"));
        }
    }

    #[test]
    fn pagination_meta_counts_pages() {
        let meta = PaginationMeta::new(2, 10, 35);
        assert_eq!(meta.total_pages, 4);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let last = PaginationMeta::new(4, 10, 35);
        assert!(!last.has_next);

        let exact = PaginationMeta::new(2, 10, 20);
        assert_eq!(exact.total_pages, 2);
        assert!(!exact.has_next);
    }

    #[test]
    fn empty_sets_have_zero_pages() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn completion_rate_rounds_to_two_decimals() {
        let stats = GoalStatistics::from_counts(3, 1, 0);
        assert_eq!(stats.completion_rate, 33.33);
        assert_eq!(stats.pending_goals, 2);

        let stats = GoalStatistics::from_counts(3, 2, 1);
        assert_eq!(stats.completion_rate, 66.67);
        assert_eq!(stats.overdue_goals, 1);
    }

    #[test]
    fn empty_goal_set_reports_zero_rate() {
        let stats = GoalStatistics::from_counts(0, 0, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.total_goals, 0);
        assert_eq!(stats.pending_goals, 0);
    }
}
