//! Common test utilities for integration tests
//!
//! Provides an in-memory database wired to the goal progress service, data
//! builders for goals, sessions and blocks, and a tracing layer that records
//! error events emitted by the crate.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use uuid::Uuid;

use practice_tracker::adapters::sqlite::{
    create_migrated_test_pool, SqliteGoalRepository, SqliteSessionRepository,
    SqliteTransactionManager,
};
use practice_tracker::domain::models::{
    BlockStatus, Goal, GoalTarget, GoalType, ProgressConfig, Session, SessionBlock,
};
use practice_tracker::domain::ports::{GoalRepository, SessionRepository};
use practice_tracker::services::{GoalProgressService, StrategyRegistry, TransactionalExecutor};

/// In-memory database with repositories and a progress service on top.
pub struct Harness {
    pub pool: sqlx::SqlitePool,
    pub goals: Arc<SqliteGoalRepository>,
    pub sessions: Arc<SqliteSessionRepository>,
    pub service: Arc<GoalProgressService>,
}

impl Harness {
    pub async fn new() -> Self {
        let pool = create_migrated_test_pool()
            .await
            .expect("Failed to create test database");
        let goals = Arc::new(SqliteGoalRepository::new(pool.clone()));
        let sessions = Arc::new(SqliteSessionRepository::new(pool.clone()));

        let session_port: Arc<dyn SessionRepository> = sessions.clone();
        let service = Arc::new(GoalProgressService::new(
            goals.clone(),
            session_port.clone(),
            StrategyRegistry::with_defaults(session_port),
            TransactionalExecutor::new(Arc::new(SqliteTransactionManager::new(pool.clone()))),
            ProgressConfig::default(),
        ));

        Self { pool, goals, sessions, service }
    }

    pub async fn insert_goal(&self, goal: &Goal) {
        self.goals.create(goal).await.expect("Failed to insert goal");
    }

    pub async fn insert_session(&self, session: &Session) {
        self.sessions.create(session).await.expect("Failed to insert session");
    }

    pub async fn reload(&self, goal_id: Uuid) -> Goal {
        self.goals
            .get(goal_id)
            .await
            .expect("Failed to load goal")
            .expect("Goal should exist")
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .expect("valid timestamp")
}

/// Goal over all of January 2024.
pub fn january_goal(user_id: Uuid, goal_type: GoalType, target: GoalTarget) -> Goal {
    Goal::new(user_id, format!("{goal_type} goal"), goal_type, target, date(2024, 1, 1))
        .with_end_date(date(2024, 1, 31))
}

/// A completed block finished at `completed_at`.
pub fn completed_block(
    session_id: Uuid,
    block_type: &str,
    sort_order: i32,
    completed_at: DateTime<Utc>,
) -> SessionBlock {
    let mut block = SessionBlock::new(session_id, block_type, 300, sort_order);
    block.status = BlockStatus::Completed;
    block.actual_duration_secs = Some(300);
    block.started_at = Some(completed_at - chrono::Duration::seconds(300));
    block.completed_at = Some(completed_at);
    block
}

/// Tracing layer counting ERROR events whose target belongs to this crate.
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Install a subscriber with this layer for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR || !metadata.target().starts_with("practice_tracker") {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(visitor.0);
        }
    }
}
