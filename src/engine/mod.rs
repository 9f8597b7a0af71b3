// ==========================================
// 定制钣金排产系统 - 引擎层
// ==========================================
// 职责: 排产业务规则引擎
// 红线: 引擎不做 I/O; 软信号以数据返回, 不抛错
// ==========================================

pub mod batch;
pub mod door_flow;
pub mod duration;
pub mod error;
pub mod feasibility;
pub mod ledger;
pub mod orchestrator;
pub mod progress;
pub mod scheduler;
pub mod urgency;

// 重导出核心引擎
pub use batch::{BatchClassifier, BatchCohort, BatchSignature, QueuedJob, Strictness};
pub use door_flow::{classify_door, is_door_leaf, DoorWeldingPlan};
pub use duration::{DurationCalculator, DurationRequest};
pub use error::EngineError;
pub use feasibility::FeasibilityAnalyzer;
pub use ledger::CapacityLedger;
pub use orchestrator::{ScheduleInsights, ScheduleOrchestrator, ScheduleRunResult, SkippedJob};
pub use progress::ProgressTracker;
pub use scheduler::PlacementEngine;
pub use urgency::{DefaultUrgencyScorer, UrgencyAssessment, UrgencyScorer};
