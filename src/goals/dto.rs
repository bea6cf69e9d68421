use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::goals::query::{GoalStatistics, ListParams, PaginationMeta, Priority};
use crate::goals::repo::Goal;

static DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn parse_date(value: &str) -> Result<Date, time::error::Parse> {
    Date::parse(value, DATE_FORMAT)
}

/// Wire shape of a goal. Field order matches what the API has always
/// returned; dates serialize as YYYY-MM-DD and timestamps as RFC 3339.
#[derive(Debug, Serialize)]
pub struct GoalDto {
    pub id: Uuid,
    pub goal_title: String,
    pub description: Option<String>,
    pub goal_type: String,
    pub priority: String,
    pub category: String,
    pub start_date: Date,
    pub end_date: Date,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_completed: bool,
    pub completion_date: Option<Date>,
}

impl From<Goal> for GoalDto {
    fn from(goal: Goal) -> Self {
        Self {
            id: goal.id,
            goal_title: goal.goal_title,
            description: goal.description,
            goal_type: goal.goal_type,
            priority: goal.priority,
            category: goal.category,
            start_date: goal.start_date,
            end_date: goal.end_date,
            user_id: goal.user_id,
            created_at: goal.created_at,
            updated_at: goal.updated_at,
            is_completed: goal.is_completed,
            completion_date: goal.completion_date,
        }
    }
}

/// Create payload. Everything arrives as optional text so a bad field
/// produces a named validation error instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateGoalRequest {
    pub goal_title: Option<String>,
    pub description: Option<String>,
    pub goal_type: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A create request with every field checked and parsed.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub goal_title: String,
    pub description: String,
    pub goal_type: String,
    pub priority: Priority,
    pub category: String,
    pub start_date: Date,
    pub end_date: Date,
}

impl CreateGoalRequest {
    /// Checks fields in the order callers see errors reported: presence,
    /// date format, date logic, priority label.
    pub fn validate(self) -> ApiResult<NewGoal> {
        let provided = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());

        let mut missing = Vec::new();
        for (name, value) in [
            ("goal_title", &self.goal_title),
            ("goal_type", &self.goal_type),
            ("priority", &self.priority),
            ("category", &self.category),
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
        ] {
            if !provided(value) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(ApiError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let start_date = parse_date(&self.start_date.unwrap_or_default()).map_err(|e| {
            ApiError::Validation(format!("Invalid date format. Use YYYY-MM-DD. Error: {e}"))
        })?;
        let end_date = parse_date(&self.end_date.unwrap_or_default()).map_err(|e| {
            ApiError::Validation(format!("Invalid date format. Use YYYY-MM-DD. Error: {e}"))
        })?;
        if start_date > end_date {
            return Err(ApiError::validation("End date must be on or after start date"));
        }

        let priority = Priority::parse(&self.priority.unwrap_or_default())
            .ok_or_else(|| ApiError::validation("Priority must be one of: low, medium, high"))?;

        Ok(NewGoal {
            goal_title: self.goal_title.unwrap_or_default(),
            // An omitted description stores as empty text, not NULL.
            description: self.description.unwrap_or_default(),
            goal_type: self.goal_type.unwrap_or_default(),
            priority,
            category: self.category.unwrap_or_default(),
            start_date,
            end_date,
        })
    }
}

/// Update payload; only supplied fields change. `description` keeps the
/// null/absent distinction so an explicit null clears the stored text.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGoalRequest {
    pub goal_title: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub goal_type: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_completed: Option<bool>,
}

/// Typed patch produced from a validated update request.
#[derive(Debug, Clone, Default)]
pub struct GoalPatch {
    pub goal_title: Option<String>,
    pub description: Option<Option<String>>,
    pub goal_type: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub is_completed: Option<bool>,
}

impl UpdateGoalRequest {
    pub fn into_patch(self) -> ApiResult<GoalPatch> {
        let priority = match self.priority.as_deref() {
            None => None,
            Some(value) => Some(Priority::parse(value).ok_or_else(|| {
                ApiError::validation("Priority must be one of: low, medium, high")
            })?),
        };
        let start_date = match self.start_date.as_deref() {
            None => None,
            Some(value) => Some(parse_date(value).map_err(|_| {
                ApiError::validation("Invalid start_date format. Use YYYY-MM-DD")
            })?),
        };
        let end_date = match self.end_date.as_deref() {
            None => None,
            Some(value) => Some(
                parse_date(value)
                    .map_err(|_| ApiError::validation("Invalid end_date format. Use YYYY-MM-DD"))?,
            ),
        };

        Ok(GoalPatch {
            goal_title: self.goal_title,
            description: self.description,
            goal_type: self.goal_type,
            priority,
            category: self.category,
            start_date,
            end_date,
            is_completed: self.is_completed,
        })
    }
}

impl GoalPatch {
    /// Applies the supplied fields to a loaded row. Completion toggling is
    /// transition-based: completion_date is stamped when a goal first
    /// becomes completed and cleared when completion is revoked, so
    /// re-sending is_completed=true keeps the original date.
    pub fn apply(&self, goal: &mut Goal, now: OffsetDateTime) {
        if let Some(goal_title) = &self.goal_title {
            goal.goal_title = goal_title.clone();
        }
        if let Some(description) = &self.description {
            goal.description = description.clone();
        }
        if let Some(goal_type) = &self.goal_type {
            goal.goal_type = goal_type.clone();
        }
        if let Some(priority) = self.priority {
            goal.priority = priority.as_str().to_string();
        }
        if let Some(category) = &self.category {
            goal.category = category.clone();
        }
        if let Some(start_date) = self.start_date {
            goal.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            goal.end_date = end_date;
        }
        if let Some(is_completed) = self.is_completed {
            if is_completed && !goal.is_completed {
                goal.completion_date = Some(now.date());
            } else if !is_completed && goal.is_completed {
                goal.completion_date = None;
            }
            goal.is_completed = is_completed;
        }
        goal.updated_at = now;
    }
}

/// Raw `GET /goals` query string; `ListParams::from_query` validates it.
#[derive(Debug, Default, Deserialize)]
pub struct ListGoalsQuery {
    pub goal_type: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub is_completed: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Echo of the normalized filters and the sort actually used.
#[derive(Debug, Serialize)]
pub struct FiltersApplied {
    pub goal_type: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub is_completed: Option<bool>,
    pub sort_by: String,
    pub sort_order: String,
}

impl From<&ListParams> for FiltersApplied {
    fn from(params: &ListParams) -> Self {
        Self {
            goal_type: params.filters.goal_type.clone(),
            priority: params.filters.priority.map(|p| p.as_str().to_string()),
            category: params.filters.category.clone(),
            is_completed: params.filters.is_completed,
            sort_by: params.sort_by.as_str().to_string(),
            sort_order: params.sort_order.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GoalListResponse {
    pub goals: Vec<GoalDto>,
    pub pagination: PaginationMeta,
    pub statistics: GoalStatistics,
    pub filters_applied: FiltersApplied,
}

#[derive(Debug, Serialize)]
pub struct GoalDetailResponse {
    pub goal: GoalDto,
}

/// Mutation response with the affected goal attached.
#[derive(Debug, Serialize)]
pub struct GoalMessageResponse {
    pub message: String,
    pub goal: GoalDto,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
