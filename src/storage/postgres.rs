//! PostgreSQL query implementations.
//!
//! Mirrors the SQLite module with native DATE / TIMESTAMPTZ / NUMERIC / JSONB
//! types. The posting claim runs `FOR UPDATE SKIP LOCKED` inside the caller's
//! transaction so multiple workers can drain the due queue concurrently.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row, Transaction};

use crate::domain::{
    Account, AccountType, ActionType, Agent, AgentStatus, AuditLog, AuditStatus, CostLog,
    DailyPdca, ExternalPost, ExternalPostMetrics, FetchLog, FetchStatus, MetricsCollectionType,
    NewPost, OAuthState, Post, PostType, Result, SearchLog, SearchLogPayload, SearchSource,
    TargetPost, TargetPostCandidate, XAuthToken,
};

// ---------------------------------------------------------------------------
// Row mapping

pub(crate) fn map_account(row: &PgRow) -> Result<Account> {
    let api_keys: Json<Value> = row.try_get("api_keys")?;
    Ok(Account {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        account_type: AccountType::parse(&row.try_get::<String, _>("account_type")?),
        api_keys: api_keys.0.as_object().cloned().unwrap_or_default(),
        media_assets_path: row.try_get("media_assets_path")?,
    })
}

pub(crate) fn map_agent(row: &PgRow) -> Result<Agent> {
    let toggles: Json<Value> = row.try_get("feature_toggles")?;
    Ok(Agent {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        status: AgentStatus::parse(&row.try_get::<String, _>("status")?),
        feature_toggles: toggles.0.as_object().cloned().unwrap_or_default(),
        daily_budget: row.try_get("daily_budget")?,
        budget_split_x: row.try_get("budget_split_x")?,
        budget_split_llm: row.try_get("budget_split_llm")?,
        stop_reason: row.try_get("stop_reason")?,
        stopped_at: row.try_get("stopped_at")?,
        stop_until: row.try_get("stop_until")?,
    })
}

pub(crate) fn map_post(row: &PgRow) -> Result<Post> {
    let media_urls: Json<Vec<String>> = row.try_get("media_urls")?;
    let thread_parts: Option<Json<Vec<String>>> = row.try_get("thread_parts")?;
    Ok(Post {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        external_id: row.try_get("external_id")?,
        content: row.try_get("content")?,
        post_type: PostType::parse(&row.try_get::<String, _>("post_type")?),
        media_urls: media_urls.0,
        scheduled_at: row.try_get("scheduled_at")?,
        posted_at: row.try_get("posted_at")?,
        target_post_url: row.try_get("target_post_url")?,
        thread_parts: thread_parts.map(|parts| parts.0),
        allow_url: row.try_get("allow_url")?,
        content_hash: row.try_get("content_hash")?,
        content_bucket_date: row.try_get("content_bucket_date")?,
    })
}

fn map_cost_log(row: &PgRow) -> Result<CostLog> {
    let raw: Json<Value> = row.try_get("x_usage_raw")?;
    Ok(CostLog {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        date: row.try_get("date")?,
        x_api_cost: row.try_get("x_api_cost")?,
        x_api_cost_estimate: row.try_get("x_api_cost_estimate")?,
        llm_cost: row.try_get("llm_cost")?,
        image_gen_cost: row.try_get("image_gen_cost")?,
        total: row.try_get("total")?,
        x_usage_units: row.try_get("x_usage_units")?,
        x_usage_raw: raw.0,
        x_api_cost_actual: row.try_get("x_api_cost_actual")?,
    })
}

fn map_audit(row: &PgRow) -> Result<AuditLog> {
    let payload: Json<Value> = row.try_get("payload")?;
    Ok(AuditLog {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        date: row.try_get("date")?,
        source: row.try_get("source")?,
        event_type: row.try_get("event_type")?,
        status: AuditStatus::parse(&row.try_get::<String, _>("status")?),
        reason: row.try_get("reason")?,
        payload: payload.0,
        created_at: row.try_get("created_at")?,
    })
}

fn map_pdca(row: &PgRow) -> Result<DailyPdca> {
    let analytics: Json<Value> = row.try_get("analytics_summary")?;
    let analysis: Json<Value> = row.try_get("analysis")?;
    let strategy: Json<Value> = row.try_get("strategy")?;
    let posts_created: Json<Value> = row.try_get("posts_created")?;
    Ok(DailyPdca {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        date: row.try_get("date")?,
        analytics_summary: serde_json::from_value(analytics.0).unwrap_or_default(),
        analysis: serde_json::from_value(analysis.0).unwrap_or_default(),
        strategy: serde_json::from_value(strategy.0).unwrap_or_default(),
        posts_created: serde_json::from_value(posts_created.0).unwrap_or_default(),
    })
}

fn map_search_log(row: &PgRow) -> Result<SearchLog> {
    let payload: Json<Value> = row.try_get("payload")?;
    Ok(SearchLog {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        date: row.try_get("date")?,
        source: SearchSource::parse(&row.try_get::<String, _>("source")?),
        query: row.try_get("query")?,
        payload: serde_json::from_value(payload.0).unwrap_or_default(),
        cost_estimate: row.try_get("cost_estimate")?,
    })
}

fn map_fetch_log(row: &PgRow) -> Result<FetchLog> {
    let summary: Option<Json<Value>> = row.try_get("summary")?;
    Ok(FetchLog {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        date: row.try_get("date")?,
        url: row.try_get("url")?,
        status: FetchStatus::parse(&row.try_get::<String, _>("status")?),
        http_status: row.try_get("http_status")?,
        content_type: row.try_get("content_type")?,
        content_length: row.try_get("content_length")?,
        extracted_text: row.try_get("extracted_text")?,
        summary: summary.and_then(|value| serde_json::from_value(value.0).ok()),
        failure_reason: row.try_get("failure_reason")?,
        cost_estimate: row.try_get("cost_estimate")?,
    })
}

fn map_target(row: &PgRow) -> Result<TargetPostCandidate> {
    Ok(TargetPostCandidate {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        date: row.try_get("date")?,
        url: row.try_get("url")?,
        author_handle: row.try_get("author_handle")?,
        text: row.try_get("text")?,
        post_created_at: row.try_get("post_created_at")?,
        used: row.try_get("used")?,
    })
}

fn map_token(row: &PgRow) -> Result<XAuthToken> {
    Ok(XAuthToken {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        expires_at: row.try_get("expires_at")?,
        scope: row.try_get("scope")?,
        token_type: row.try_get("token_type")?,
    })
}

fn map_oauth_state(row: &PgRow) -> Result<OAuthState> {
    Ok(OAuthState {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        state: row.try_get("state")?,
        code_verifier: row.try_get("code_verifier")?,
        expires_at: row.try_get("expires_at")?,
    })
}

// ---------------------------------------------------------------------------
// Accounts & agents

pub async fn get_account(pool: &Pool<Postgres>, id: i64) -> Result<Option<Account>> {
    let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_account).transpose()
}

pub async fn insert_account(
    pool: &Pool<Postgres>,
    name: &str,
    account_type: AccountType,
    api_keys: &Value,
    media_assets_path: &str,
) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO accounts (name, account_type, api_keys, media_assets_path) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(account_type.as_str())
    .bind(Json(api_keys))
    .bind(media_assets_path)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("id")?)
}

pub async fn get_agent(pool: &Pool<Postgres>, id: i64) -> Result<Option<Agent>> {
    let row = sqlx::query("SELECT * FROM agents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_agent).transpose()
}

pub async fn list_agents(pool: &Pool<Postgres>) -> Result<Vec<Agent>> {
    let rows = sqlx::query("SELECT * FROM agents ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_agent).collect()
}

pub async fn list_active_agent_ids(pool: &Pool<Postgres>) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT id FROM agents WHERE status = 'active' ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|row| row.try_get::<i64, _>("id").map_err(Into::into))
        .collect()
}

pub async fn insert_agent_with_id(
    pool: &Pool<Postgres>,
    id: i64,
    account_id: i64,
    status: AgentStatus,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO agents (id, account_id, status, feature_toggles) VALUES ($1, $2, $3, '{}')",
    )
    .bind(id)
    .bind(account_id)
    .bind(status.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_agent_budget(pool: &Pool<Postgres>, id: i64, daily_budget: i64) -> Result<()> {
    sqlx::query("UPDATE agents SET daily_budget = $1 WHERE id = $2")
        .bind(daily_budget)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_agent_budget_splits(
    pool: &Pool<Postgres>,
    id: i64,
    daily_budget: i64,
    split_x: i64,
    split_llm: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE agents SET daily_budget = $1, budget_split_x = $2, budget_split_llm = $3 \
         WHERE id = $4",
    )
    .bind(daily_budget)
    .bind(split_x)
    .bind(split_llm)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_agent_toggles(pool: &Pool<Postgres>, id: i64, toggles: &Value) -> Result<()> {
    sqlx::query("UPDATE agents SET feature_toggles = $1 WHERE id = $2")
        .bind(Json(toggles))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn stop_agent(
    pool: &Pool<Postgres>,
    id: i64,
    reason: &str,
    stopped_at: DateTime<Utc>,
    stop_until: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        "UPDATE agents SET status = 'stopped', stop_reason = $1, stopped_at = $2, \
         stop_until = $3 WHERE id = $4",
    )
    .bind(reason)
    .bind(stopped_at)
    .bind(stop_until)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn resume_agent(pool: &Pool<Postgres>, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE agents SET status = 'active', stop_reason = NULL, stopped_at = NULL, \
         stop_until = NULL WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Posts

pub async fn list_agent_posts(pool: &Pool<Postgres>, agent_id: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query("SELECT * FROM posts WHERE agent_id = $1 ORDER BY id ASC")
        .bind(agent_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_post).collect()
}

pub async fn get_post(pool: &Pool<Postgres>, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query("SELECT * FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_post).transpose()
}

pub async fn find_post_by_external_id(
    pool: &Pool<Postgres>,
    agent_id: i64,
    external_id: &str,
) -> Result<Option<Post>> {
    let row = sqlx::query("SELECT * FROM posts WHERE agent_id = $1 AND external_id = $2")
        .bind(agent_id)
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_post).transpose()
}

pub async fn insert_post(pool: &Pool<Postgres>, post: &NewPost) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO posts (agent_id, external_id, content, post_type, media_urls, \
         scheduled_at, posted_at, target_post_url, thread_parts, allow_url, content_hash, \
         content_bucket_date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING id",
    )
    .bind(post.agent_id)
    .bind(&post.external_id)
    .bind(&post.content)
    .bind(post.post_type.as_str())
    .bind(Json(&post.media_urls))
    .bind(post.scheduled_at)
    .bind(post.posted_at)
    .bind(&post.target_post_url)
    .bind(post.thread_parts.as_ref().map(Json))
    .bind(post.allow_url)
    .bind(&post.content_hash)
    .bind(post.content_bucket_date)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("id")?)
}

pub async fn update_external_post(
    pool: &Pool<Postgres>,
    post_id: i64,
    external: &ExternalPost,
) -> Result<()> {
    sqlx::query(
        "UPDATE posts SET content = $1, post_type = $2, posted_at = $3, media_urls = $4 \
         WHERE id = $5",
    )
    .bind(&external.text)
    .bind(external.post_type.as_str())
    .bind(external.posted_at)
    .bind(Json(&external.media_urls))
    .bind(post_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count_scheduled_in_window(
    pool: &Pool<Postgres>,
    agent_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM posts WHERE agent_id = $1 AND scheduled_at IS NOT NULL \
         AND scheduled_at >= $2 AND scheduled_at < $3 AND posted_at IS NULL",
    )
    .bind(agent_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("n")?)
}

pub async fn hash_bucket_exists(
    pool: &Pool<Postgres>,
    agent_id: i64,
    content_hash: &str,
    bucket_date: NaiveDate,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM posts WHERE agent_id = $1 AND content_hash = $2 \
         AND content_bucket_date = $3",
    )
    .bind(agent_id)
    .bind(content_hash)
    .bind(bucket_date)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}

pub async fn find_posted_duplicate(
    pool: &Pool<Postgres>,
    agent_id: i64,
    content_hash: &str,
    bucket_date: NaiveDate,
    exclude_post_id: i64,
) -> Result<Option<i64>> {
    let row = sqlx::query(
        "SELECT id FROM posts WHERE agent_id = $1 AND id != $2 AND content_hash = $3 \
         AND content_bucket_date = $4 AND posted_at IS NOT NULL LIMIT 1",
    )
    .bind(agent_id)
    .bind(exclude_post_id)
    .bind(content_hash)
    .bind(bucket_date)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.try_get("id")).transpose()?)
}

pub async fn set_post_dedupe_fields(
    pool: &Pool<Postgres>,
    post_id: i64,
    content_hash: &str,
    bucket_date: NaiveDate,
) -> Result<()> {
    sqlx::query("UPDATE posts SET content_hash = $1, content_bucket_date = $2 WHERE id = $3")
        .bind(content_hash)
        .bind(bucket_date)
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Row-locked claim; posts claimed by another worker are skipped, not waited
/// on. Must run inside the transaction that later marks the posts.
pub async fn select_due_posts_for_update(
    tx: &mut Transaction<'static, Postgres>,
    now: DateTime<Utc>,
    batch_size: i64,
) -> Result<Vec<Post>> {
    let rows = sqlx::query(
        "SELECT * FROM posts WHERE scheduled_at IS NOT NULL AND scheduled_at <= $1 \
         AND posted_at IS NULL ORDER BY scheduled_at ASC, id ASC LIMIT $2 \
         FOR UPDATE SKIP LOCKED",
    )
    .bind(now)
    .bind(batch_size)
    .fetch_all(&mut **tx)
    .await?;
    rows.iter().map(map_post).collect()
}

/// Publish marker inside the claim transaction.
pub async fn mark_posted_in_tx(
    tx: &mut Transaction<'static, Postgres>,
    post_id: i64,
    external_id: &str,
    posted_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE posts SET external_id = $1, posted_at = $2 WHERE id = $3 AND posted_at IS NULL",
    )
    .bind(external_id)
    .bind(posted_at)
    .bind(post_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

// ---------------------------------------------------------------------------
// Metrics

pub async fn has_metrics(
    pool: &Pool<Postgres>,
    post_id: i64,
    collection_type: MetricsCollectionType,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM post_metrics WHERE post_id = $1 AND collection_type = $2",
    )
    .bind(post_id)
    .bind(collection_type.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}

pub async fn count_metrics(
    pool: &Pool<Postgres>,
    post_id: i64,
    collection_type: MetricsCollectionType,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM post_metrics WHERE post_id = $1 AND collection_type = $2",
    )
    .bind(post_id)
    .bind(collection_type.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("n")?)
}

pub async fn insert_post_metrics(
    pool: &Pool<Postgres>,
    post_id: i64,
    collection_type: MetricsCollectionType,
    collected_at: DateTime<Utc>,
    metrics: &ExternalPostMetrics,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO post_metrics (post_id, collection_type, collected_at, impressions, \
         engagements, likes, retweets, replies, clicks) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(post_id)
    .bind(collection_type.as_str())
    .bind(collected_at)
    .bind(metrics.impressions)
    .bind(metrics.engagements())
    .bind(metrics.likes)
    .bind(metrics.retweets)
    .bind(metrics.replies)
    .bind(metrics.clicks)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Cost logs

pub async fn get_cost_log(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
) -> Result<Option<CostLog>> {
    let row = sqlx::query("SELECT * FROM cost_logs WHERE agent_id = $1 AND date = $2")
        .bind(agent_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_cost_log).transpose()
}

/// Read-modify-write cost increment; the row lock serializes writers.
pub async fn add_costs(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    x_cost: Decimal,
    llm_cost: Decimal,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let existing =
        sqlx::query("SELECT * FROM cost_logs WHERE agent_id = $1 AND date = $2 FOR UPDATE")
            .bind(agent_id)
            .bind(date)
            .fetch_optional(&mut *tx)
            .await?;

    match existing {
        Some(row) => {
            let current = map_cost_log(&row)?;
            sqlx::query(
                "UPDATE cost_logs SET x_api_cost = $1, x_api_cost_estimate = $2, llm_cost = $3, \
                 total = $4 WHERE id = $5",
            )
            .bind(current.x_api_cost + x_cost)
            .bind(current.x_api_cost_estimate + x_cost)
            .bind(current.llm_cost + llm_cost)
            .bind(current.total + x_cost + llm_cost)
            .bind(current.id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO cost_logs (agent_id, date, x_api_cost, x_api_cost_estimate, \
                 llm_cost, image_gen_cost, total) VALUES ($1, $2, $3, $4, $5, 0, $6)",
            )
            .bind(agent_id)
            .bind(date)
            .bind(x_cost)
            .bind(x_cost)
            .bind(llm_cost)
            .bind(x_cost + llm_cost)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

pub async fn record_usage(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    units: i64,
    raw: &Value,
    actual_cost: Option<Decimal>,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let existing =
        sqlx::query("SELECT id FROM cost_logs WHERE agent_id = $1 AND date = $2 FOR UPDATE")
            .bind(agent_id)
            .bind(date)
            .fetch_optional(&mut *tx)
            .await?;

    match existing {
        Some(row) => {
            let id: i64 = row.try_get("id")?;
            sqlx::query(
                "UPDATE cost_logs SET x_usage_units = $1, x_usage_raw = $2, \
                 x_api_cost_actual = $3 WHERE id = $4",
            )
            .bind(units)
            .bind(Json(raw))
            .bind(actual_cost)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO cost_logs (agent_id, date, x_usage_units, x_usage_raw, \
                 x_api_cost_actual) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(agent_id)
            .bind(date)
            .bind(units)
            .bind(Json(raw))
            .bind(actual_cost)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Engagement actions

pub async fn count_engagements(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM engagement_actions WHERE agent_id = $1 \
         AND executed_at::date = $2",
    )
    .bind(agent_id)
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("n")?)
}

pub async fn count_engagements_by_type(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    action_type: ActionType,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM engagement_actions WHERE agent_id = $1 AND action_type = $2 \
         AND executed_at::date = $3",
    )
    .bind(agent_id)
    .bind(action_type.as_str())
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("n")?)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_engagement(
    pool: &Pool<Postgres>,
    agent_id: i64,
    target_account_id: i64,
    action_type: ActionType,
    target_post_url: &str,
    content: Option<&str>,
    executed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO engagement_actions (agent_id, target_account_id, action_type, \
         target_post_url, content, executed_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(agent_id)
    .bind(target_account_id)
    .bind(action_type.as_str())
    .bind(target_post_url)
    .bind(content)
    .bind(executed_at)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Search, fetch and target logs

pub async fn count_search_logs(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    source: SearchSource,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM search_logs WHERE agent_id = $1 AND date = $2 \
         AND source = $3",
    )
    .bind(agent_id)
    .bind(date)
    .bind(source.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("n")?)
}

pub async fn insert_search_log(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    source: SearchSource,
    query: &str,
    payload: &SearchLogPayload,
    cost_estimate: Decimal,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO search_logs (agent_id, date, source, query, payload, cost_estimate) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(agent_id)
    .bind(date)
    .bind(source.as_str())
    .bind(query)
    .bind(Json(serde_json::to_value(payload)?))
    .bind(cost_estimate)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_search_logs(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
) -> Result<Vec<SearchLog>> {
    let rows = sqlx::query(
        "SELECT * FROM search_logs WHERE agent_id = $1 AND date = $2 ORDER BY id ASC",
    )
    .bind(agent_id)
    .bind(date)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_search_log).collect()
}

pub async fn count_fetch_attempts(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM fetch_logs WHERE agent_id = $1 AND date = $2 \
         AND status IN ('succeeded', 'failed')",
    )
    .bind(agent_id)
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("n")?)
}

pub async fn insert_fetch_log(pool: &Pool<Postgres>, log: &FetchLog) -> Result<()> {
    sqlx::query(
        "INSERT INTO fetch_logs (agent_id, date, url, status, http_status, content_type, \
         content_length, extracted_text, summary, failure_reason, cost_estimate) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(log.agent_id)
    .bind(log.date)
    .bind(&log.url)
    .bind(log.status.as_str())
    .bind(log.http_status)
    .bind(&log.content_type)
    .bind(log.content_length)
    .bind(&log.extracted_text)
    .bind(
        log.summary
            .as_ref()
            .map(|summary| serde_json::to_value(summary).map(Json))
            .transpose()?,
    )
    .bind(&log.failure_reason)
    .bind(log.cost_estimate)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_fetch_logs(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
) -> Result<Vec<FetchLog>> {
    let rows = sqlx::query(
        "SELECT * FROM fetch_logs WHERE agent_id = $1 AND date = $2 ORDER BY id ASC",
    )
    .bind(agent_id)
    .bind(date)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_fetch_log).collect()
}

pub async fn insert_target_candidate(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    target: &TargetPost,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO target_post_candidates (agent_id, date, url, author_handle, text, \
         post_created_at, used) VALUES ($1, $2, $3, $4, $5, $6, FALSE) \
         ON CONFLICT (agent_id, date, url) DO NOTHING",
    )
    .bind(agent_id)
    .bind(date)
    .bind(&target.url)
    .bind(&target.author_handle)
    .bind(&target.text)
    .bind(target.created_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_unused_targets(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
) -> Result<Vec<TargetPostCandidate>> {
    let rows = sqlx::query(
        "SELECT * FROM target_post_candidates WHERE agent_id = $1 AND date = $2 \
         AND used = FALSE ORDER BY post_created_at ASC, id ASC",
    )
    .bind(agent_id)
    .bind(date)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_target).collect()
}

pub async fn mark_target_used(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    url: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE target_post_candidates SET used = TRUE WHERE agent_id = $1 AND date = $2 \
         AND url = $3",
    )
    .bind(agent_id)
    .bind(date)
    .bind(url)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// PDCA

pub async fn get_pdca(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
) -> Result<Option<DailyPdca>> {
    let row = sqlx::query("SELECT * FROM daily_pdca WHERE agent_id = $1 AND date = $2")
        .bind(agent_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_pdca).transpose()
}

pub async fn upsert_pdca(pool: &Pool<Postgres>, pdca: &DailyPdca) -> Result<()> {
    sqlx::query(
        "INSERT INTO daily_pdca (agent_id, date, analytics_summary, analysis, strategy, \
         posts_created) VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (agent_id, date) DO UPDATE SET \
         analytics_summary = excluded.analytics_summary, analysis = excluded.analysis, \
         strategy = excluded.strategy, posts_created = excluded.posts_created",
    )
    .bind(pdca.agent_id)
    .bind(pdca.date)
    .bind(Json(serde_json::to_value(&pdca.analytics_summary)?))
    .bind(Json(serde_json::to_value(&pdca.analysis)?))
    .bind(Json(serde_json::to_value(&pdca.strategy)?))
    .bind(Json(serde_json::to_value(&pdca.posts_created)?))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_recent_pdca(
    pool: &Pool<Postgres>,
    agent_id: i64,
    limit: i64,
) -> Result<Vec<DailyPdca>> {
    let rows = sqlx::query(
        "SELECT * FROM daily_pdca WHERE agent_id = $1 ORDER BY date DESC LIMIT $2",
    )
    .bind(agent_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_pdca).collect()
}

// ---------------------------------------------------------------------------
// Audit logs

#[allow(clippy::too_many_arguments)]
pub async fn insert_audit(
    pool: &Pool<Postgres>,
    agent_id: i64,
    date: NaiveDate,
    source: &str,
    event_type: &str,
    status: AuditStatus,
    reason: Option<&str>,
    payload: &Value,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO audit_logs (agent_id, date, source, event_type, status, reason, payload, \
         created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(agent_id)
    .bind(date)
    .bind(source)
    .bind(event_type)
    .bind(status.as_str())
    .bind(reason)
    .bind(Json(payload))
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recent_audit_statuses(
    pool: &Pool<Postgres>,
    agent_id: i64,
    source: &str,
    event_type: &str,
    limit: i64,
) -> Result<Vec<AuditStatus>> {
    let rows = sqlx::query(
        "SELECT status FROM audit_logs WHERE agent_id = $1 AND source = $2 \
         AND event_type = $3 ORDER BY id DESC LIMIT $4",
    )
    .bind(agent_id)
    .bind(source)
    .bind(event_type)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>("status").ok())
        .map(|status| AuditStatus::parse(&status))
        .collect())
}

pub async fn list_audits(
    pool: &Pool<Postgres>,
    agent_id: i64,
    limit: i64,
) -> Result<Vec<AuditLog>> {
    let rows =
        sqlx::query("SELECT * FROM audit_logs WHERE agent_id = $1 ORDER BY id DESC LIMIT $2")
            .bind(agent_id)
            .bind(limit)
            .fetch_all(pool)
            .await?;
    rows.iter().map(map_audit).collect()
}

// ---------------------------------------------------------------------------
// OAuth tokens & PKCE state

pub async fn get_token_for_account(
    pool: &Pool<Postgres>,
    account_id: i64,
) -> Result<Option<XAuthToken>> {
    let row = sqlx::query("SELECT * FROM x_auth_tokens WHERE account_id = $1")
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_token).transpose()
}

pub async fn upsert_token(pool: &Pool<Postgres>, token: &XAuthToken) -> Result<()> {
    sqlx::query(
        "INSERT INTO x_auth_tokens (account_id, access_token, refresh_token, expires_at, \
         scope, token_type) VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (account_id) DO UPDATE SET \
         access_token = excluded.access_token, refresh_token = excluded.refresh_token, \
         expires_at = excluded.expires_at, scope = excluded.scope, \
         token_type = excluded.token_type",
    )
    .bind(token.account_id)
    .bind(&token.access_token)
    .bind(&token.refresh_token)
    .bind(token.expires_at)
    .bind(&token.scope)
    .bind(&token.token_type)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_oauth_state(pool: &Pool<Postgres>, state: &OAuthState) -> Result<()> {
    sqlx::query(
        "INSERT INTO oauth_states (account_id, state, code_verifier, expires_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(state.account_id)
    .bind(&state.state)
    .bind(&state.code_verifier)
    .bind(state.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn take_oauth_state(
    pool: &Pool<Postgres>,
    state: &str,
    now: DateTime<Utc>,
) -> Result<Option<OAuthState>> {
    let row = sqlx::query("DELETE FROM oauth_states WHERE state = $1 RETURNING *")
        .bind(state)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let parsed = map_oauth_state(&row)?;
    if parsed.expires_at <= now {
        return Ok(None);
    }
    Ok(Some(parsed))
}
