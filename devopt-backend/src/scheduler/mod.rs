//! Cron-driven background jobs
//!
//! Schedules are six-field cron expressions (seconds first) evaluated in UTC.
//! The loop polls on an interval; a job runs at most once per tick for the
//! latest scheduled instant it has not yet handled, so missed instants
//! while the process was down collapse into one run.

pub mod jobs;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};
use tokio::sync::oneshot;

use crate::analytics::AnalyticsService;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::executions::ExecutionTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum JobKind {
    DailyMatrixUpdate,
    PeriodicAgentAnalysis,
    OptimizationTips,
    WeeklySummary,
}

impl JobKind {
    pub fn id(&self) -> &'static str {
        match self {
            JobKind::DailyMatrixUpdate => "daily_matrix_update",
            JobKind::PeriodicAgentAnalysis => "periodic_agent_analysis",
            JobKind::OptimizationTips => "optimization_tips",
            JobKind::WeeklySummary => "weekly_summary",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobKind::DailyMatrixUpdate => "Daily Matrix Update",
            JobKind::PeriodicAgentAnalysis => "Periodic Agent Analysis",
            JobKind::OptimizationTips => "Optimization Tips",
            JobKind::WeeklySummary => "Weekly Summary",
        }
    }

    pub fn schedule(&self) -> &'static str {
        match self {
            JobKind::DailyMatrixUpdate => "0 0 8 * * *",
            JobKind::PeriodicAgentAnalysis => "0 0 */6 * * *",
            JobKind::OptimizationTips => "0 0 10 */2 * *",
            JobKind::WeeklySummary => "0 0 9 * * Sun",
        }
    }

    fn setting_key(&self) -> String {
        format!("scheduler.last_run.{}", self.id())
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: &'static str,
    pub name: &'static str,
    pub schedule: &'static str,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: Vec<JobStatus>,
}

struct ScheduledJob {
    kind: JobKind,
    schedule: Schedule,
}

pub struct Scheduler {
    db: Arc<Database>,
    analytics: Arc<AnalyticsService>,
    tracker: Arc<ExecutionTracker>,
    config: SchedulerConfig,
    jobs: Vec<ScheduledJob>,
    /// Baseline for jobs that have never run
    started_at: DateTime<Utc>,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(
        db: Arc<Database>,
        analytics: Arc<AnalyticsService>,
        tracker: Arc<ExecutionTracker>,
        config: SchedulerConfig,
    ) -> AppResult<Self> {
        let jobs = JobKind::iter()
            .map(|kind| {
                Schedule::from_str(kind.schedule())
                    .map(|schedule| ScheduledJob { kind, schedule })
                    .map_err(|e| AppError::config(format!("invalid schedule for {}: {}", kind.id(), e)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            db,
            analytics,
            tracker,
            config,
            jobs,
            started_at: Utc::now(),
            running: AtomicBool::new(false),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_run(&self, kind: JobKind) -> AppResult<Option<DateTime<Utc>>> {
        let Some(value) = self.db.get_setting(&kind.setting_key())? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&value) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                log::warn!("[SCHEDULER] Ignoring unreadable last run for {}: {}", kind.id(), e);
                Ok(None)
            }
        }
    }

    /// Latest scheduled instant after the previous run (or start) and not after `now`
    fn due_instant(&self, job: &ScheduledJob, now: DateTime<Utc>) -> AppResult<Option<DateTime<Utc>>> {
        let since = self.last_run(job.kind)?.unwrap_or(self.started_at);
        Ok(job.schedule.after(&since).take_while(|at| *at <= now).last())
    }

    fn run_job(&self, kind: JobKind, now: DateTime<Utc>) -> AppResult<()> {
        match kind {
            JobKind::DailyMatrixUpdate => jobs::daily_matrix_update(&self.db, &self.analytics, now),
            JobKind::PeriodicAgentAnalysis => jobs::periodic_agent_analysis(&self.tracker),
            JobKind::OptimizationTips => jobs::optimization_tips(&self.db, &self.analytics),
            JobKind::WeeklySummary => jobs::weekly_summary(&self.db, &self.analytics, now),
        }
    }

    /// Run every job that is due at `now`; returns the jobs that ran
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<JobKind> {
        let mut ran = Vec::new();
        for job in &self.jobs {
            let instant = match self.due_instant(job, now) {
                Ok(Some(instant)) => instant,
                Ok(None) => continue,
                Err(e) => {
                    log::error!("[SCHEDULER] Could not read state for {}: {}", job.kind.id(), e);
                    continue;
                }
            };

            log::info!("[SCHEDULER] Running {} (scheduled {})", job.kind.id(), instant);
            if let Err(e) = self.run_job(job.kind, now) {
                log::error!("[SCHEDULER] {} failed: {}", job.kind.id(), e);
            }
            // Recorded even on failure so a broken job waits for its next instant
            if let Err(e) = self
                .db
                .set_setting(&job.kind.setting_key(), &instant.to_rfc3339(), Some(job.kind.name()))
            {
                log::error!("[SCHEDULER] Could not record run of {}: {}", job.kind.id(), e);
            }
            ran.push(job.kind);
        }
        ran
    }

    pub async fn start(&self, mut shutdown: oneshot::Receiver<()>) {
        self.running.store(true, Ordering::SeqCst);
        log::info!(
            "[SCHEDULER] Started with {} jobs, polling every {:?}",
            self.jobs.len(),
            self.config.poll_interval
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now());
                }
                _ = &mut shutdown => {
                    log::info!("[SCHEDULER] Shutting down");
                    break;
                }
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn status(&self) -> AppResult<SchedulerStatus> {
        let now = Utc::now();
        let jobs = self
            .jobs
            .iter()
            .map(|job| {
                Ok(JobStatus {
                    id: job.kind.id(),
                    name: job.kind.name(),
                    schedule: job.kind.schedule(),
                    next_run: job.schedule.after(&now).next(),
                    last_run: self.last_run(job.kind)?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(SchedulerStatus {
            running: self.is_running(),
            jobs,
        })
    }
}
