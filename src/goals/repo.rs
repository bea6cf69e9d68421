use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::goals::dto::{GoalPatch, NewGoal};
use crate::goals::query::{order_by_sql, GoalFilters, GoalStatistics, ListParams};

/// Goal record as stored. `priority` stays plain lowercase text in the
/// row; the `Priority` enum guards it at the boundaries.
#[derive(Debug, Clone, FromRow)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_title: String,
    pub description: Option<String>,
    pub goal_type: String,
    pub priority: String,
    pub category: String,
    pub start_date: Date,
    pub end_date: Date,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub is_completed: bool,
    pub completion_date: Option<Date>,
}

/// One page of goals plus the numbers the listing response is built
/// from, all read from the same snapshot.
#[derive(Debug)]
pub struct GoalPage {
    pub goals: Vec<Goal>,
    pub total_items: i64,
    pub statistics: GoalStatistics,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filters: &GoalFilters) {
    builder.push(" WHERE user_id = ");
    builder.push_bind(user_id);
    if let Some(goal_type) = &filters.goal_type {
        builder.push(" AND goal_type = ");
        builder.push_bind(goal_type.clone());
    }
    if let Some(priority) = filters.priority {
        builder.push(" AND priority = ");
        builder.push_bind(priority.as_str());
    }
    if let Some(category) = &filters.category {
        builder.push(" AND category = ");
        builder.push_bind(category.clone());
    }
    if let Some(is_completed) = filters.is_completed {
        builder.push(" AND is_completed = ");
        builder.push_bind(is_completed);
    }
}

/// Reads the page, the filtered total and the per-user statistics inside
/// one REPEATABLE READ transaction. READ COMMITTED would take a fresh
/// snapshot per statement and let the numbers drift apart under
/// concurrent writes.
pub async fn list_page(
    db: &PgPool,
    user_id: Uuid,
    params: &ListParams,
    today: Date,
) -> ApiResult<GoalPage> {
    let mut tx = db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM goals");
    push_filters(&mut count, user_id, &params.filters);
    let total_items: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

    let mut page = QueryBuilder::<Postgres>::new(
        "SELECT id, user_id, goal_title, description, goal_type, priority, category, \
         start_date, end_date, created_at, updated_at, is_completed, completion_date \
         FROM goals",
    );
    push_filters(&mut page, user_id, &params.filters);
    page.push(" ORDER BY ");
    page.push(order_by_sql(params.sort_by, params.sort_order));
    page.push(" LIMIT ");
    page.push_bind(params.per_page);
    page.push(" OFFSET ");
    page.push_bind(params.offset());
    let goals: Vec<Goal> = page.build_query_as().fetch_all(&mut *tx).await?;

    // Statistics cover the whole account, ignoring the listing filters.
    let (total, completed, overdue): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE is_completed),
               COUNT(*) FILTER (WHERE NOT is_completed AND end_date < $2)
        FROM goals
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(today)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(GoalPage {
        goals,
        total_items,
        statistics: GoalStatistics::from_counts(total, completed, overdue),
    })
}

pub async fn insert(db: &PgPool, user_id: Uuid, new_goal: NewGoal) -> ApiResult<Goal> {
    let goal = sqlx::query_as::<_, Goal>(
        r#"
        INSERT INTO goals (user_id, goal_title, description, goal_type, priority, category, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, user_id, goal_title, description, goal_type, priority, category,
                  start_date, end_date, created_at, updated_at, is_completed, completion_date
        "#,
    )
    .bind(user_id)
    .bind(&new_goal.goal_title)
    .bind(&new_goal.description)
    .bind(&new_goal.goal_type)
    .bind(new_goal.priority.as_str())
    .bind(&new_goal.category)
    .bind(new_goal.start_date)
    .bind(new_goal.end_date)
    .fetch_one(db)
    .await?;
    Ok(goal)
}

pub async fn fetch(db: &PgPool, user_id: Uuid, goal_id: Uuid) -> ApiResult<Goal> {
    sqlx::query_as::<_, Goal>(
        r#"
        SELECT id, user_id, goal_title, description, goal_type, priority, category,
               start_date, end_date, created_at, updated_at, is_completed, completion_date
        FROM goals
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::not_found("Goal not found"))
}

/// Loads the goal, applies the patch in memory, re-checks the date
/// invariant against the merged state and writes the row back. The load
/// and write share a transaction so concurrent updates serialize on the
/// row lock instead of interleaving.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    goal_id: Uuid,
    patch: &GoalPatch,
) -> ApiResult<Goal> {
    let mut tx = db.begin().await?;

    let mut goal = sqlx::query_as::<_, Goal>(
        r#"
        SELECT id, user_id, goal_title, description, goal_type, priority, category,
               start_date, end_date, created_at, updated_at, is_completed, completion_date
        FROM goals
        WHERE id = $1 AND user_id = $2
        FOR UPDATE
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Goal not found"))?;

    patch.apply(&mut goal, OffsetDateTime::now_utc());

    if goal.start_date > goal.end_date {
        return Err(ApiError::validation("End date must be on or after start date"));
    }

    sqlx::query(
        r#"
        UPDATE goals
        SET goal_title = $1, description = $2, goal_type = $3, priority = $4, category = $5,
            start_date = $6, end_date = $7, is_completed = $8, completion_date = $9, updated_at = $10
        WHERE id = $11 AND user_id = $12
        "#,
    )
    .bind(&goal.goal_title)
    .bind(&goal.description)
    .bind(&goal.goal_type)
    .bind(&goal.priority)
    .bind(&goal.category)
    .bind(goal.start_date)
    .bind(goal.end_date)
    .bind(goal.is_completed)
    .bind(goal.completion_date)
    .bind(goal.updated_at)
    .bind(goal.id)
    .bind(goal.user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(goal)
}

pub async fn delete(db: &PgPool, user_id: Uuid, goal_id: Uuid) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
        .bind(goal_id)
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Goal not found"));
    }
    Ok(())
}
