use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, repo::User},
    error::{ApiError, ApiResult},
    goals::{
        dto::{
            CreateGoalRequest, FiltersApplied, GoalDetailResponse, GoalDto, GoalListResponse,
            GoalMessageResponse, ListGoalsQuery, MessageResponse, UpdateGoalRequest,
        },
        query::{ListParams, PaginationMeta},
        repo,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add/goal", post(add_goal))
        .route("/goals", get(list_goals))
        .route(
            "/goal/:id",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
}

#[instrument(skip(state, payload))]
pub async fn add_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGoalRequest>,
) -> ApiResult<(StatusCode, Json<GoalMessageResponse>)> {
    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let new_goal = payload.validate()?;
    let goal = repo::insert(&state.db, user_id, new_goal).await?;

    info!(user_id = %user_id, goal_id = %goal.id, "goal created");
    Ok((
        StatusCode::CREATED,
        Json(GoalMessageResponse {
            message: "Goal created successfully".into(),
            goal: GoalDto::from(goal),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(raw): Query<ListGoalsQuery>,
) -> ApiResult<Json<GoalListResponse>> {
    let params = ListParams::from_query(raw)?;
    let today = OffsetDateTime::now_utc().date();

    let page = repo::list_page(&state.db, user_id, &params, today).await?;
    let pagination = PaginationMeta::new(params.page, params.per_page, page.total_items);
    let filters_applied = FiltersApplied::from(&params);

    Ok(Json(GoalListResponse {
        goals: page.goals.into_iter().map(GoalDto::from).collect(),
        pagination,
        statistics: page.statistics,
        filters_applied,
    }))
}

#[instrument(skip(state))]
pub async fn get_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
) -> ApiResult<Json<GoalDetailResponse>> {
    let goal = repo::fetch(&state.db, user_id, goal_id).await?;
    Ok(Json(GoalDetailResponse {
        goal: GoalDto::from(goal),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
    Json(payload): Json<UpdateGoalRequest>,
) -> ApiResult<Json<GoalMessageResponse>> {
    let patch = payload.into_patch()?;
    let goal = repo::update(&state.db, user_id, goal_id, &patch).await?;

    info!(user_id = %user_id, goal_id = %goal.id, "goal updated");
    Ok(Json(GoalMessageResponse {
        message: "Goal updated successfully".into(),
        goal: GoalDto::from(goal),
    }))
}

#[instrument(skip(state))]
pub async fn delete_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    repo::delete(&state.db, user_id, goal_id).await?;

    info!(user_id = %user_id, goal_id = %goal_id, "goal deleted");
    Ok(Json(MessageResponse {
        message: "Goal deleted successfully".into(),
    }))
}
