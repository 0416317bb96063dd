//! End-to-end tests driving the orchestrator over real stores.
//!
//! A full learning day: project setup, tree building, scheduling, block
//! completion with opportunity signals, and strategy evolution.

use std::sync::Arc;

use chrono::NaiveDate;
use frontier_core::evolution::EvolutionStrategy;
use frontier_core::graph::OpportunityTag;
use frontier_core::intelligence::GenerationSource;
use frontier_core::{
    BlockOutcome, BlockType, Config, CoreError, DocumentStore, GeneratorChain, MemoryStore, NextAction,
    NextTaskRequest, OpportunityContext, Orchestrator, ProjectInit, ScheduleRequest, Scope, Session,
    Sentiment, SqliteStore, Urgency,
};
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn orchestrator(store: Box<dyn DocumentStore>) -> Orchestrator {
    Orchestrator::new(store, Config::default()).with_generator(GeneratorChain::fallback_only())
}

fn init(orch: &Orchestrator) {
    orch.init_project(ProjectInit {
        id: "piano".into(),
        goal: "play jazz standards".into(),
        urgency: Urgency::High,
        paths: vec!["theory".into()],
        wake_time: Some("7:00 AM".into()),
        sleep_time: Some("10:00 PM".into()),
        meal_times: Some(vec!["12:00 PM".into()]),
    })
    .unwrap();
}

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, n).unwrap()
}

fn schedule_request(date: NaiveDate, energy: u8) -> ScheduleRequest {
    ScheduleRequest {
        date,
        energy,
        hours: Vec::new(),
        focus_type: None,
        context: None,
    }
}

fn next_request(energy: u8, time: &str) -> NextTaskRequest {
    NextTaskRequest {
        context: None,
        energy,
        time_available: time.into(),
    }
}

// ============================================================================
// Full day
// ============================================================================

#[test]
fn full_learning_day_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("frontier.db");
    let orch = orchestrator(Box::new(SqliteStore::open_at(&db).unwrap()));
    init(&orch);
    let session = Session::general("piano");

    let tree = orch.build_tree(&session, "hands-on", &[]).unwrap();
    assert_eq!(tree.data.branches.len(), 4);
    assert_eq!(tree.data.nodes.len(), 12);

    let schedule = orch.generate_daily_schedule(&session, &schedule_request(day(14), 3)).unwrap();
    let first = &schedule.data.blocks[0];
    assert_eq!(first.block_type, BlockType::Learning);
    assert_eq!(first.title, "Explore Foundations");
    assert_eq!(first.start_time, "7:00 AM");
    assert_eq!(schedule.data.blocks[1].block_type, BlockType::Break);

    let outcome = BlockOutcome {
        learned: Some("Shell voicings are just 3rds and 7ths".into()),
        next_questions: Some("Which voicings suit ballads. Why drop the root".into()),
        energy_after: Some(4),
        difficulty_rating: Some(2),
        breakthrough: true,
        opportunity: Some(OpportunityContext {
            engagement_level: 9,
            ..Default::default()
        }),
        ..Default::default()
    };
    let done = orch.complete_block(&session, day(14), &first.id, &outcome).unwrap();
    assert!(done.data.block.completed);
    assert_eq!(done.data.history.insights, 1);
    assert_eq!(done.data.history.knowledge_gaps, 2);
    let update = done.data.graph.as_ref().unwrap();
    assert_eq!(update.completed_node.as_deref(), Some("foundations-explore-foundations"));
    assert_eq!(update.follow_ups.len(), 2);
    assert_eq!(update.opportunity_nodes.len(), 1);
    assert!(matches!(done.data.next, NextAction::Block { .. }));
    assert!(done.summary.contains("natural_talent"));

    // Reopen the store: everything must have been persisted.
    drop(orch);
    let orch = orchestrator(Box::new(SqliteStore::open_at(&db).unwrap()));

    let status = orch.get_status(&session).unwrap();
    assert_eq!(status.data.completed, 1);
    assert_eq!(status.data.total, 15);
    assert_eq!(status.data.ready, 5);
    assert!(status.data.orphaned.is_empty());

    let next = orch.get_next_task(&session, &next_request(4, "45 minutes")).unwrap();
    let task = next.data.task.unwrap();
    assert_eq!(task.title, "Go deeper: Explore Foundations");
    assert_eq!(task.priority, 350);
    assert_eq!(task.opportunity, Some(OpportunityTag::BreakthroughAmplification));
    assert_eq!(next.data.available_minutes, 45);

    let reasoning = orch.analyze_reasoning(&session, true).unwrap();
    let detail = reasoning.data.detail.unwrap();
    assert_eq!(detail.skills[0].branch, "foundations");
    assert_eq!(detail.knowledge_gaps.len(), 2);
    assert_eq!(reasoning.data.breakthroughs.breakthroughs, 1);
}

#[test]
fn completed_follow_up_leaves_readiness() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(Box::new(Arc::clone(&store)));
    init(&orch);
    let session = Session::general("piano");
    orch.build_tree(&session, "hands-on", &[]).unwrap();

    let first = orch.generate_daily_schedule(&session, &schedule_request(day(14), 3)).unwrap();
    let outcome = BlockOutcome {
        learned: Some("left hand shapes".into()),
        breakthrough: true,
        opportunity: Some(OpportunityContext {
            engagement_level: 9,
            ..Default::default()
        }),
        ..Default::default()
    };
    orch.complete_block(&session, day(14), &first.data.blocks[0].id, &outcome).unwrap();

    // The amplification node leads the next day.
    let second = orch.generate_daily_schedule(&session, &schedule_request(day(15), 4)).unwrap();
    let block = &second.data.blocks[0];
    assert_eq!(block.title, "Go deeper: Explore Foundations");
    let amplified = block.task_id.clone().unwrap();

    let outcome = BlockOutcome {
        learned: Some("comping rhythm".into()),
        ..Default::default()
    };
    orch.complete_block(&session, day(15), &block.id, &outcome).unwrap();

    let next = orch.get_next_task(&session, &next_request(4, "2 hours")).unwrap();
    assert_ne!(next.data.task.unwrap().id, amplified);
    let status = orch.get_status(&session).unwrap();
    assert_eq!(status.data.completed, 2);
}

#[test]
fn completing_twice_is_rejected() {
    let orch = orchestrator(Box::new(MemoryStore::new()));
    init(&orch);
    let session = Session::general("piano");
    orch.build_tree(&session, "hands-on", &[]).unwrap();
    orch.generate_daily_schedule(&session, &schedule_request(day(14), 3)).unwrap();

    orch.complete_block(&session, day(14), "b01", &BlockOutcome::default()).unwrap();
    let err = orch
        .complete_block(&session, day(14), "b01", &BlockOutcome::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

// ============================================================================
// Evolution
// ============================================================================

#[test]
fn negative_feedback_addresses_concerns() {
    let orch = orchestrator(Box::new(MemoryStore::new()));
    init(&orch);
    let session = Session::general("piano");
    orch.build_tree(&session, "hands-on", &[]).unwrap();
    orch.generate_daily_schedule(&session, &schedule_request(day(14), 3)).unwrap();
    let outcome = BlockOutcome {
        learned: Some("scales".into()),
        next_questions: Some("Modes. Arpeggios".into()),
        energy_after: Some(4),
        ..Default::default()
    };
    orch.complete_block(&session, day(14), "b01", &outcome).unwrap();

    let evolved = orch
        .evolve_strategy(&session, Some("this is so boring and I feel stuck"))
        .unwrap();
    assert_eq!(evolved.data.analysis.sentiment, Sentiment::Negative);
    assert!(evolved.data.analysis.available >= 3);
    assert_eq!(evolved.data.strategy, EvolutionStrategy::AddressUserConcerns);
    assert_eq!(evolved.data.new_tasks.len(), 2);
    assert_eq!(evolved.data.source, GenerationSource::Fallback);
    assert!(evolved.summary.contains("address_user_concerns"));

    let status = orch.get_status(&session).unwrap();
    assert!(status.data.last_evolution.is_some());
}

#[test]
fn exhausted_frontier_generates_new_tasks() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(Box::new(Arc::clone(&store)));
    init(&orch);
    let session = Session::general("piano");
    orch.build_tree(&session, "hands-on", &[]).unwrap();

    // Replace the tree with one whose only node waits on a missing prerequisite.
    store
        .save_document(
            &Scope::path("piano", "general"),
            "graph",
            &json!({
                "project_id": "piano",
                "path": "general",
                "created_at": "2026-03-01T00:00:00Z",
                "nodes": [{
                    "id": "n1", "title": "Blocked", "description": "", "branch": "b",
                    "difficulty": 2, "duration": "30 minutes", "prerequisites": ["gone"],
                    "priority": 200
                }]
            }),
        )
        .unwrap();

    let status = orch.get_status(&session).unwrap();
    assert_eq!(status.data.ready, 0);
    assert_eq!(status.data.orphaned[0].orphaned, vec!["gone"]);

    let evolved = orch.evolve_strategy(&session, Some("great progress")).unwrap();
    assert_eq!(evolved.data.strategy, EvolutionStrategy::GenerateNewTasks);
    assert!(evolved
        .data
        .new_tasks
        .iter()
        .all(|n| n.generated && n.prerequisites.is_empty()));
}

// ============================================================================
// Storage rules
// ============================================================================

#[test]
fn general_path_reads_legacy_project_documents() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(Box::new(Arc::clone(&store)));
    init(&orch);
    store
        .save_document(
            &Scope::project("piano"),
            "graph",
            &json!({
                "project_id": "piano",
                "path": "general",
                "created_at": "2026-03-01T00:00:00Z",
                "nodes": [{
                    "id": "legacy", "title": "Legacy task", "branch": "b",
                    "difficulty": 1, "duration": "20 minutes", "priority": 200
                }]
            }),
        )
        .unwrap();

    let next = orch.get_next_task(&Session::general("piano"), &next_request(2, "30 minutes")).unwrap();
    assert_eq!(next.data.task.unwrap().id, "legacy");

    let err = orch.get_status(&Session::new("piano", "theory")).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { kind: "task graph", .. }));
}

#[test]
fn foreign_document_is_an_integrity_violation() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(Box::new(Arc::clone(&store)));
    init(&orch);
    store
        .save_document(
            &Scope::path("piano", "theory"),
            "graph",
            &json!({
                "project_id": "guitar",
                "path": "theory",
                "created_at": "2026-03-01T00:00:00Z"
            }),
        )
        .unwrap();

    let err = orch.get_status(&Session::new("piano", "theory")).unwrap_err();
    assert!(matches!(err, CoreError::DataIntegrity { .. }), "got {err:?}");
    let logged = store.errors();
    assert_eq!(logged.last().unwrap().operation, "get_status");
}

#[test]
fn failures_are_logged_to_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open_at(&dir.path().join("frontier.db")).unwrap());
    let orch = orchestrator(Box::new(Arc::clone(&store)));

    assert!(orch.get_status(&Session::general("missing")).is_err());
    assert!(orch.evolve_strategy(&Session::general(""), None).is_err());
    assert_eq!(store.error_count().unwrap(), 2);
}

// ============================================================================
// Scheduling scenario
// ============================================================================

#[test]
fn single_task_day_with_noon_meal() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(Box::new(Arc::clone(&store)));
    init(&orch);
    store
        .save_document(
            &Scope::path("piano", "general"),
            "graph",
            &json!({
                "project_id": "piano",
                "path": "general",
                "created_at": "2026-03-01T00:00:00Z",
                "nodes": [{
                    "id": "only", "title": "Only task", "branch": "b",
                    "difficulty": 2, "duration": "30 minutes", "priority": 200
                }]
            }),
        )
        .unwrap();

    let schedule = orch
        .generate_daily_schedule(&Session::general("piano"), &schedule_request(day(14), 3))
        .unwrap()
        .data;

    let learning: Vec<_> = schedule.learning_blocks().collect();
    assert_eq!(learning.len(), 1);
    assert_eq!(learning[0].task_id.as_deref(), Some("only"));
    assert_eq!(learning[0].duration_minutes, 30);

    let index = schedule.blocks.iter().position(|b| b.task_id.is_some()).unwrap();
    assert_eq!(schedule.blocks[index + 1].block_type, BlockType::Break);

    let meals: Vec<_> = schedule
        .blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Meal)
        .collect();
    assert_eq!(meals.len(), 1);
    assert!((11 * 60 + 45..=12 * 60 + 15).contains(&meals[0].start_minute));

    for pair in schedule.blocks.windows(2) {
        assert!(pair[0].end_minute() <= pair[1].start_minute);
    }
    assert!(schedule.blocks.len() <= 50);
}
