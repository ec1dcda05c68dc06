//! Next-day content planning: derive facts from the research trail, compute
//! the post-type mix, and create hash-deduplicated scheduled posts.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{PlanConfig, WorkerConfig};
use crate::controls::BudgetLedger;
use crate::domain::{
    build_post_content_hash, CreatedPostRef, FetchLog, NewPost, PostType, Result, SearchLog,
};
use crate::storage::Store;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));

/// One planned post before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub post_type: PostType,
    pub text: String,
    pub thread_parts: Option<Vec<String>>,
    pub target_post_url: Option<String>,
    pub allow_url: bool,
}

#[derive(Debug, Clone)]
pub struct PlanBuildResult {
    pub drafts: Vec<PostDraft>,
    pub used_search_material: bool,
}

fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(240)
        .collect()
}

fn strip_urls(text: &str) -> String {
    URL_RE.replace_all(text, "").trim().to_string()
}

fn append_optional_url(text: &str, target_url: Option<&str>, allow_url: bool) -> String {
    let clean = strip_urls(text);
    match target_url {
        Some(url) if allow_url => format!("{clean} {url}").trim().to_string(),
        _ => clean,
    }
}

/// Facts from the day's research: search snippets and fetch summaries with
/// URLs stripped.
fn extract_web_facts(search_logs: &[SearchLog], fetch_logs: &[FetchLog]) -> Vec<String> {
    let mut facts = Vec::new();
    for log in search_logs {
        for result in &log.payload.results {
            let snippet = clean_text(&result.snippet);
            if !snippet.is_empty() {
                facts.push(strip_urls(&snippet));
            }
        }
    }
    for log in fetch_logs {
        if let Some(summary) = &log.summary {
            let summary_text = clean_text(&summary.summary);
            if !summary_text.is_empty() {
                facts.push(strip_urls(&summary_text));
                continue;
            }
        }
        if let Some(extracted) = &log.extracted_text {
            let extracted = clean_text(extracted);
            if !extracted.is_empty() {
                facts.push(strip_urls(&extracted));
            }
        }
    }
    facts.retain(|fact| !fact.is_empty());
    facts
}

/// Deterministic boilerplate for days without research material.
fn fallback_facts(agent_id: i64, target_date: NaiveDate) -> Vec<String> {
    vec![
        format!("Agent {agent_id} focus for {target_date}"),
        "One useful lesson from recent work and a practical next step".to_string(),
        "A short observation plus a concrete action for tomorrow".to_string(),
    ]
}

/// Post-type mix: threads first, then replies and quotes, tweets fill the
/// rest. Without targets the engagement share folds back into threads; the
/// reply+quote sum is hard-capped at 3, shaved from quotes first.
pub fn compute_mix(
    posts_per_day: usize,
    plan: &PlanConfig,
    has_targets: bool,
) -> (usize, usize, usize, usize) {
    let n = posts_per_day;
    let mut thread = n.min((n as f64 * plan.thread_ratio) as usize);
    let mut reply = (n - thread).min((n as f64 * plan.reply_ratio) as usize);
    let mut quote = (n - thread - reply).min((n as f64 * plan.quote_ratio) as usize);

    if !has_targets {
        thread = n.min(thread + reply + quote);
        reply = 0;
        quote = 0;
    }

    if reply + quote > 3 {
        let mut overflow = reply + quote - 3;
        while overflow > 0 && quote > 0 {
            quote -= 1;
            overflow -= 1;
        }
        while overflow > 0 && reply > 0 {
            reply -= 1;
            overflow -= 1;
        }
    }

    let tweet = n.saturating_sub(thread + reply + quote);
    (tweet, thread, reply, quote)
}

/// Build the day's drafts, reserving the fixed plan cost.
pub async fn build_post_drafts(
    store: &Store,
    agent_id: i64,
    target_date: NaiveDate,
    posts_per_day: usize,
    ledger: &mut BudgetLedger,
    plan: &PlanConfig,
    plan_cost: rust_decimal::Decimal,
) -> Result<PlanBuildResult> {
    if posts_per_day == 0 {
        return Ok(PlanBuildResult {
            drafts: Vec::new(),
            used_search_material: false,
        });
    }

    ledger.reserve(rust_decimal::Decimal::ZERO, plan_cost).await?;

    let search_logs = store.list_search_logs(agent_id, target_date).await?;
    let fetch_logs = store.list_fetch_logs(agent_id, target_date).await?;
    let mut facts = extract_web_facts(&search_logs, &fetch_logs);
    let targets: Vec<String> = store
        .list_unused_targets(agent_id, target_date)
        .await?
        .into_iter()
        .map(|candidate| candidate.url)
        .collect();

    let used_search_material = !facts.is_empty() || !targets.is_empty();
    if facts.is_empty() {
        facts = fallback_facts(agent_id, target_date);
    }

    let (tweet_count, thread_count, reply_count, quote_count) =
        compute_mix(posts_per_day, plan, !targets.is_empty());

    let mut drafts = Vec::new();
    for idx in 0..tweet_count {
        let fact = &facts[idx % facts.len()];
        drafts.push(PostDraft {
            post_type: PostType::Tweet,
            text: append_optional_url(&format!("Insight: {fact}"), None, false),
            thread_parts: None,
            target_post_url: None,
            allow_url: false,
        });
    }

    for idx in 0..thread_count {
        let fact = &facts[(tweet_count + idx) % facts.len()];
        let parts = vec![
            strip_urls(&format!("Thread {}/2: {fact}", idx + 1)),
            strip_urls(&format!(
                "Thread {}/2 action: verify impact and report observations.",
                idx + 1
            )),
        ];
        drafts.push(PostDraft {
            post_type: PostType::Thread,
            text: parts[0].clone(),
            thread_parts: Some(parts),
            target_post_url: None,
            allow_url: false,
        });
    }

    for idx in 0..reply_count {
        let target = targets[idx % targets.len()].clone();
        drafts.push(PostDraft {
            post_type: PostType::Reply,
            text: append_optional_url(
                "Thanks for the perspective. One practical point is to test assumptions.",
                Some(&target),
                plan.allow_url_for_validation,
            ),
            thread_parts: None,
            target_post_url: Some(target),
            allow_url: plan.allow_url_for_validation,
        });
    }

    for idx in 0..quote_count {
        let target = targets[(reply_count + idx) % targets.len()].clone();
        drafts.push(PostDraft {
            post_type: PostType::QuoteRt,
            text: append_optional_url(
                "Useful context. We should compare with recent outcomes before scaling.",
                Some(&target),
                plan.allow_url_for_validation,
            ),
            thread_parts: None,
            target_post_url: Some(target),
            allow_url: plan.allow_url_for_validation,
        });
    }

    Ok(PlanBuildResult {
        drafts,
        used_search_material,
    })
}

/// First posting slot of the day after `target_date`, in the worker
/// timezone, converted to UTC for storage.
pub fn scheduled_start(worker: &WorkerConfig, target_date: NaiveDate) -> (DateTime<Utc>, NaiveDate) {
    let next_date = target_date + Duration::days(1);
    let local = worker
        .timezone
        .with_ymd_and_hms(
            next_date.year(),
            next_date.month(),
            next_date.day(),
            worker.post_hour,
            worker.post_minute,
            0,
        )
        .single()
        .unwrap_or_else(|| {
            worker
                .timezone
                .with_ymd_and_hms(next_date.year(), next_date.month(), next_date.day(), 12, 0, 0)
                .single()
                .expect("noon exists in every timezone")
        });
    (local.with_timezone(&Utc), next_date)
}

/// Create posts for the drafts, staggered by 5-minute steps from the count
/// of already-scheduled posts, skipping content-hash duplicates and marking
/// consumed targets.
pub async fn create_next_day_posts(
    store: &Store,
    agent_id: i64,
    target_date: NaiveDate,
    posts_per_day: usize,
    drafts: &[PostDraft],
    worker: &WorkerConfig,
) -> Result<Vec<CreatedPostRef>> {
    let (start, schedule_date) = scheduled_start(worker, target_date);
    let day_start = start
        - Duration::hours(i64::from(worker.post_hour))
        - Duration::minutes(i64::from(worker.post_minute));
    let day_end = day_start + Duration::days(1);

    let existing = store
        .count_scheduled_in_window(agent_id, day_start, day_end)
        .await? as usize;
    let missing = posts_per_day.saturating_sub(existing);

    let mut created = Vec::new();
    for draft in drafts {
        if created.len() >= missing {
            break;
        }

        let content_hash =
            build_post_content_hash(&draft.text, draft.thread_parts.as_deref());
        if store
            .hash_bucket_exists(agent_id, &content_hash, schedule_date)
            .await?
        {
            continue;
        }

        let scheduled_at = start + Duration::minutes(5 * (existing + created.len()) as i64);
        let post = NewPost {
            agent_id,
            content: draft.text.clone(),
            post_type: draft.post_type,
            scheduled_at: Some(scheduled_at),
            target_post_url: draft.target_post_url.clone(),
            thread_parts: draft.thread_parts.clone(),
            allow_url: draft.allow_url,
            content_hash: Some(content_hash),
            content_bucket_date: Some(schedule_date),
            ..Default::default()
        };
        let id = store.insert_post(&post).await?;

        if let Some(target_url) = &draft.target_post_url {
            store
                .mark_target_used(agent_id, target_date, target_url)
                .await?;
        }

        created.push(CreatedPostRef {
            id: Some(id),
            external_id: None,
            scheduled_at: Some(scheduled_at.to_rfc3339()),
            post_type: Some(draft.post_type.as_str().to_string()),
        });
    }

    Ok(created)
}
