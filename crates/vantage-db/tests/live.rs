//! Live integration tests for vantage-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/vantage-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{Duration, Utc};
use uuid::Uuid;
use vantage_core::{
    AnalysisKind, CompanyConfig, Entity, EntityType, ImpactLevel, PersonaConfig, PersonaSeed, PipelineKind,
    RelationshipType, RunStatus, Sentiment, SourceCategory, SourceConfig, SourceType,
    TriggerKind,
};
use vantage_db::{
    article_exists_by_hash, complete_pipeline_run, count_successful_runs, fail_pipeline_run,
    get_analysis, get_article, get_company_by_slug, get_default_persona, get_latest_briefing, insert_analysis,
    insert_article, insert_briefing, insert_connections, insert_enrichment, insert_pipeline_run,
    list_articles_with_enrichment, list_connections_for_article, list_enabled_sources,
    list_pipeline_runs_for_date, list_recent_enriched, list_sources, list_unenriched_articles,
    list_watchlist_companies, mark_source_fetched, reserve_pipeline_run, search_articles_by_title,
    seed_companies, seed_persona, seed_sources, usage_for_date, DbError, NewAnalysis,
    NewArticle, NewBriefing, NewConnection, NewEnrichment, NewPipelineRun, Reservation,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn source_config(name: &str, source_type: SourceType, enabled: bool) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        source_type,
        url: format!("https://{}.example.com/feed", name.to_lowercase().replace(' ', "-")),
        category: SourceCategory::Cyber,
        enabled,
        fetch_interval_minutes: 120,
        metadata: serde_json::json!({}),
    }
}

async fn seed_one_source(pool: &sqlx::PgPool) -> Uuid {
    seed_sources(pool, &[source_config("Krebs", SourceType::Rss, true)])
        .await
        .expect("seed_sources failed");
    list_enabled_sources(pool)
        .await
        .expect("list_enabled_sources failed")[0]
        .id
}

async fn seed_default_persona(pool: &sqlx::PgPool) -> Uuid {
    let seed = PersonaSeed {
        name: "Default".to_string(),
        description: None,
        config: PersonaConfig::default(),
    };
    seed_persona(pool, &seed).await.expect("seed_persona failed").id
}

fn new_article(source_id: Uuid, title: &str, hours_ago: i64) -> NewArticle {
    NewArticle {
        source_id,
        external_id: format!("ext-{title}"),
        title: title.to_string(),
        url: format!("https://news.example.com/{}", title.replace(' ', "-")),
        content: format!("Body of {title}"),
        summary: Some(format!("Summary of {title}")),
        author: None,
        published_at: Utc::now() - Duration::hours(hours_ago),
        categories: vec!["security".to_string()],
        metadata: serde_json::json!({}),
        content_hash: format!("hash-{title}"),
    }
}

async fn insert_articles(pool: &sqlx::PgPool, source_id: Uuid, titles: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for (i, title) in titles.iter().enumerate() {
        let article = new_article(source_id, title, i64::try_from(i).unwrap());
        assert!(insert_article(pool, &article).await.unwrap());
        let id: Uuid = sqlx::query_scalar("SELECT id FROM articles WHERE content_hash = $1")
            .bind(&article.content_hash)
            .fetch_one(pool)
            .await
            .unwrap();
        ids.push(id);
    }
    ids
}

fn enrichment(article_id: Uuid, persona_id: Uuid, relevance: f64) -> NewEnrichment {
    NewEnrichment {
        article_id,
        persona_id,
        executive_summary: "Something happened".to_string(),
        relevance_score: relevance,
        impact_level: ImpactLevel::High,
        sentiment: Sentiment::Negative,
        entities: vec![Entity {
            name: "CrowdStrike".to_string(),
            entity_type: EntityType::Company,
        }],
        category_tags: vec!["edr".to_string()],
        key_facts: vec!["fact".to_string()],
        connection_hints: vec![],
        model_used: "test-model".to_string(),
        token_count: 120,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Seeding
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seed_sources_upserts_by_name(pool: sqlx::PgPool) {
    let first = vec![
        source_config("Krebs", SourceType::Rss, true),
        source_config("NVD", SourceType::NistNvd, true),
    ];
    assert_eq!(seed_sources(&pool, &first).await.unwrap(), 2);

    let mut second = first.clone();
    second[1].enabled = false;
    seed_sources(&pool, &second).await.unwrap();

    let enabled = list_enabled_sources(&pool).await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].name, "Krebs");
    assert_eq!(enabled[0].descriptor().unwrap().source_type, SourceType::Rss);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 2, "re-seeding must not duplicate rows");
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_sources_includes_disabled(pool: sqlx::PgPool) {
    seed_sources(
        &pool,
        &[
            source_config("Reddit", SourceType::Reddit, false),
            source_config("CISA KEV", SourceType::Cisa, true),
        ],
    )
    .await
    .unwrap();

    let all = list_sources(&pool).await.unwrap();
    let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["CISA KEV", "Reddit"]);
    assert!(!all[1].enabled);
    assert_eq!(list_enabled_sources(&pool).await.unwrap().len(), 1);
}

fn company(ticker: &str, name: &str, slug: &str, is_main: bool) -> CompanyConfig {
    CompanyConfig {
        ticker: ticker.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        sector: "Cybersecurity".to_string(),
        description: format!("{name} platform"),
        is_main,
        metadata: serde_json::json!({}),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_companies_upserts_by_ticker_and_moves_main(pool: sqlx::PgPool) {
    let first = vec![
        company("PANW", "Palo Alto Networks", "palo-alto-networks", false),
        company("CRWD", "CrowdStrike", "crowdstrike", true),
    ];
    assert_eq!(seed_companies(&pool, &first).await.unwrap(), 2);

    let listed = list_watchlist_companies(&pool).await.unwrap();
    assert_eq!(listed[0].ticker, "CRWD", "main company is listed first");
    assert_eq!(listed[1].ticker, "PANW");

    let mut second = first.clone();
    second[0].is_main = true;
    second[1].is_main = false;
    second[1].description = "Endpoint protection".to_string();
    seed_companies(&pool, &second).await.unwrap();

    let listed = list_watchlist_companies(&pool).await.unwrap();
    assert_eq!(listed.len(), 2, "re-seeding must not duplicate rows");
    assert_eq!(listed[0].ticker, "PANW");
    assert!(!listed[1].is_main);

    let crowdstrike = get_company_by_slug(&pool, "crowdstrike").await.unwrap();
    assert_eq!(crowdstrike.description, "Endpoint protection");

    let missing = get_company_by_slug(&pool, "zscaler").await.unwrap_err();
    assert!(matches!(missing, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_persona_sets_default_once(pool: sqlx::PgPool) {
    let seed = PersonaSeed {
        name: "Default".to_string(),
        description: Some("exec".to_string()),
        config: PersonaConfig::default(),
    };
    let first = seed_persona(&pool, &seed).await.unwrap();
    assert!(first.inserted);
    assert!(first.is_default);

    let again = seed_persona(&pool, &seed).await.unwrap();
    assert!(!again.inserted);
    assert_eq!(again.id, first.id);

    let other = PersonaSeed {
        name: "Analyst".to_string(),
        description: None,
        config: PersonaConfig::default(),
    };
    let second = seed_persona(&pool, &other).await.unwrap();
    assert!(second.inserted);
    assert!(!second.is_default, "an existing default must be kept");

    let default = get_default_persona(&pool).await.unwrap().unwrap();
    assert_eq!(default.id, first.id);
    assert_eq!(default.config.0, PersonaConfig::default());
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_source_fetched_sets_timestamp(pool: sqlx::PgPool) {
    let source_id = seed_one_source(&pool).await;
    mark_source_fetched(&pool, source_id).await.unwrap();

    let sources = list_enabled_sources(&pool).await.unwrap();
    assert!(sources[0].last_fetched_at.is_some());

    let missing = mark_source_fetched(&pool, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(DbError::NotFound)));
}

// ---------------------------------------------------------------------------
// Section 2: Articles and enrichments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_article_ignores_duplicate_hash(pool: sqlx::PgPool) {
    let source_id = seed_one_source(&pool).await;
    let article = new_article(source_id, "Patch Tuesday", 1);

    assert!(!article_exists_by_hash(&pool, &article.content_hash).await.unwrap());
    assert!(insert_article(&pool, &article).await.unwrap());
    assert!(article_exists_by_hash(&pool, &article.content_hash).await.unwrap());

    let mut duplicate = article.clone();
    duplicate.external_id = "other-id".to_string();
    assert!(!insert_article(&pool, &duplicate).await.unwrap());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unenriched_articles_exclude_enriched_ones(pool: sqlx::PgPool) {
    let source_id = seed_one_source(&pool).await;
    let persona_id = seed_default_persona(&pool).await;
    let ids = insert_articles(&pool, source_id, &["newest", "middle", "oldest"]).await;

    let pending = list_unenriched_articles(&pool, persona_id, 10).await.unwrap();
    let titles: Vec<&str> = pending.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    assert_eq!(pending[0].source_name, "Krebs");

    assert!(insert_enrichment(&pool, &enrichment(ids[1], persona_id, 0.7))
        .await
        .unwrap());
    assert!(
        !insert_enrichment(&pool, &enrichment(ids[1], persona_id, 0.9))
            .await
            .unwrap(),
        "second enrichment for the same persona must be ignored"
    );

    let pending = list_unenriched_articles(&pool, persona_id, 10).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|a| a.id != ids[1]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn recent_enriched_orders_by_relevance_within_window(pool: sqlx::PgPool) {
    let source_id = seed_one_source(&pool).await;
    let persona_id = seed_default_persona(&pool).await;
    let ids = insert_articles(&pool, source_id, &["a", "b"]).await;
    let old = new_article(source_id, "stale", 72);
    insert_article(&pool, &old).await.unwrap();
    let old_id: Uuid = sqlx::query_scalar("SELECT id FROM articles WHERE title = 'stale'")
        .fetch_one(&pool)
        .await
        .unwrap();

    insert_enrichment(&pool, &enrichment(ids[0], persona_id, 0.4)).await.unwrap();
    insert_enrichment(&pool, &enrichment(ids[1], persona_id, 0.9)).await.unwrap();
    insert_enrichment(&pool, &enrichment(old_id, persona_id, 1.0)).await.unwrap();

    let since = Utc::now() - Duration::hours(48);
    let rows = list_recent_enriched(&pool, persona_id, since, 30).await.unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["b", "a"]);
    assert_eq!(rows[0].impact_level, "high");
}

#[sqlx::test(migrations = "../../migrations")]
async fn article_feed_joins_enrichment_and_filters(pool: sqlx::PgPool) {
    let source_id = seed_one_source(&pool).await;
    let persona_id = seed_default_persona(&pool).await;
    let ids = insert_articles(&pool, source_id, &["Ransomware wave", "Cloud outage"]).await;
    insert_enrichment(&pool, &enrichment(ids[0], persona_id, 0.8)).await.unwrap();

    let all = list_articles_with_enrichment(&pool, None, None, 50, 0).await.unwrap();
    assert_eq!(all.len(), 2);
    let ransomware = all.iter().find(|a| a.id == ids[0]).unwrap();
    assert_eq!(ransomware.impact_level.as_deref(), Some("high"));
    let outage = all.iter().find(|a| a.id == ids[1]).unwrap();
    assert!(outage.executive_summary.is_none());

    let filtered = list_articles_with_enrichment(&pool, Some(persona_id), Some("RANSOM"), 50, 0)
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, ids[0]);

    let by_topic = search_articles_by_title(&pool, "outage", None, 15).await.unwrap();
    assert_eq!(by_topic.len(), 1);
    assert!(by_topic[0].executive_summary.is_none());

    let fetched = get_article(&pool, ids[1]).await.unwrap();
    assert_eq!(fetched.title, "Cloud outage");
}

// ---------------------------------------------------------------------------
// Section 3: Connections, briefings, analyses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn connection_insert_ignores_reversed_duplicate(pool: sqlx::PgPool) {
    let source_id = seed_one_source(&pool).await;
    let ids = insert_articles(&pool, source_id, &["one", "two"]).await;

    let edge = |src: Uuid, tgt: Uuid, rel: RelationshipType| NewConnection {
        source_article_id: src,
        target_article_id: tgt,
        relationship_type: rel,
        reasoning: "same campaign".to_string(),
        confidence: 0.8,
    };

    let inserted = insert_connections(
        &pool,
        &[
            edge(ids[0], ids[1], RelationshipType::Related),
            edge(ids[1], ids[0], RelationshipType::Related),
            edge(ids[1], ids[0], RelationshipType::FollowUp),
        ],
    )
    .await
    .unwrap();
    assert_eq!(inserted, 2);

    let again = insert_connections(&pool, &[edge(ids[0], ids[1], RelationshipType::Related)])
        .await
        .unwrap();
    assert_eq!(again, 0);

    let edges = list_connections_for_article(&pool, ids[0]).await.unwrap();
    assert_eq!(edges.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn latest_briefing_is_most_recent(pool: sqlx::PgPool) {
    let persona_id = seed_default_persona(&pool).await;
    assert!(get_latest_briefing(&pool, None).await.unwrap().is_none());

    for body in ["first", "second"] {
        insert_briefing(
            &pool,
            &NewBriefing {
                persona_id,
                content: format!("## Key Takeaways\n- {body}"),
                article_ids: vec![Uuid::new_v4()],
                model_used: "test-model".to_string(),
                token_count: 10,
            },
        )
        .await
        .unwrap();
    }

    let latest = get_latest_briefing(&pool, Some(persona_id)).await.unwrap().unwrap();
    assert!(latest.content.contains("second"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn analysis_round_trip_and_not_found(pool: sqlx::PgPool) {
    let row = insert_analysis(
        &pool,
        &NewAnalysis {
            persona_id: None,
            analysis_type: AnalysisKind::Threat,
            topic: "ransomware".to_string(),
            title: "Threat Analysis: ransomware".to_string(),
            content: "## Executive Summary".to_string(),
            article_ids: vec![],
            model_used: "test-model".to_string(),
            token_count: 42,
        },
    )
    .await
    .unwrap();

    let fetched = get_analysis(&pool, row.id).await.unwrap();
    assert_eq!(fetched.analysis_type, "threat");

    let missing = get_analysis(&pool, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(DbError::NotFound)));
}

// ---------------------------------------------------------------------------
// Section 4: Usage ledger
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn reservation_denies_at_limit_and_failed_runs_do_not_count(pool: sqlx::PgPool) {
    let today = Utc::now().date_naive();
    let reserve = || {
        reserve_pipeline_run(&pool, PipelineKind::Fetch, TriggerKind::Manual, today, 2, 1800)
    };

    let Reservation::Reserved(first) = reserve().await.unwrap() else {
        panic!("first reservation should be admitted");
    };
    fail_pipeline_run(&pool, first.id, "boom").await.unwrap();

    let Reservation::Reserved(second) = reserve().await.unwrap() else {
        panic!("failed run must not consume quota");
    };
    complete_pipeline_run(&pool, second.id, 5, 0).await.unwrap();

    let Reservation::Reserved(third) = reserve().await.unwrap() else {
        panic!("second success slot should be admitted");
    };
    // Still running: counts against the quota.
    match reserve().await.unwrap() {
        Reservation::Denied { used } => assert_eq!(used, 2),
        Reservation::Reserved(_) => panic!("quota should be exhausted"),
    }
    complete_pipeline_run(&pool, third.id, 1, 0).await.unwrap();

    let used = count_successful_runs(&pool, PipelineKind::Fetch, TriggerKind::Manual, today)
        .await
        .unwrap();
    assert_eq!(used, 2);

    let cron = count_successful_runs(&pool, PipelineKind::Fetch, TriggerKind::Cron, today)
        .await
        .unwrap();
    assert_eq!(cron, 0, "trigger buckets are independent");
}

#[sqlx::test(migrations = "../../migrations")]
async fn stale_reservations_stop_counting(pool: sqlx::PgPool) {
    let today = Utc::now().date_naive();
    let Reservation::Reserved(run) =
        reserve_pipeline_run(&pool, PipelineKind::Briefing, TriggerKind::Cron, today, 1, 1800)
            .await
            .unwrap()
    else {
        panic!("first reservation should be admitted");
    };

    sqlx::query("UPDATE pipeline_runs SET created_at = NOW() - INTERVAL '2 hours' WHERE id = $1")
        .bind(run.id)
        .execute(&pool)
        .await
        .unwrap();

    let next =
        reserve_pipeline_run(&pool, PipelineKind::Briefing, TriggerKind::Cron, today, 1, 1800)
            .await
            .unwrap();
    assert!(matches!(next, Reservation::Reserved(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn finishing_a_finished_run_is_rejected(pool: sqlx::PgPool) {
    let today = Utc::now().date_naive();
    let row = insert_pipeline_run(
        &pool,
        &NewPipelineRun {
            pipeline: PipelineKind::Enrich,
            trigger: TriggerKind::Cron,
            status: RunStatus::Success,
            token_count: 900,
            items_processed: 3,
            error_message: None,
            run_date: today,
        },
    )
    .await
    .unwrap();
    assert!(row.completed_at.is_some());

    let result = complete_pipeline_run(&pool, row.id, 1, 1).await;
    assert!(matches!(
        result,
        Err(DbError::InvalidRunTransition {
            expected_status: "running",
            ..
        })
    ));

    let usage = usage_for_date(&pool, today).await.unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].pipeline, "enrich");
    assert_eq!(usage[0].successes, 1);
    assert_eq!(usage[0].tokens, 900);
}

#[sqlx::test(migrations = "../../migrations")]
async fn runs_for_date_are_newest_first_and_scoped_to_the_day(pool: sqlx::PgPool) {
    let today = Utc::now().date_naive();
    let run = |pipeline: PipelineKind, run_date| NewPipelineRun {
        pipeline,
        trigger: TriggerKind::Cron,
        status: RunStatus::Success,
        token_count: 0,
        items_processed: 1,
        error_message: None,
        run_date,
    };

    let older = insert_pipeline_run(&pool, &run(PipelineKind::Fetch, today))
        .await
        .unwrap();
    sqlx::query("UPDATE pipeline_runs SET created_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(older.id)
        .execute(&pool)
        .await
        .unwrap();
    let newer = insert_pipeline_run(&pool, &run(PipelineKind::Enrich, today))
        .await
        .unwrap();
    insert_pipeline_run(&pool, &run(PipelineKind::Fetch, today - Duration::days(1)))
        .await
        .unwrap();

    let rows = list_pipeline_runs_for_date(&pool, today).await.unwrap();
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}
