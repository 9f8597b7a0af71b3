// ==========================================
// 定制钣金排产系统 - 核心库
// ==========================================
// 系统定位: 产能感知排产引擎 (决策支持, 人工最终控制权)
// 流水线: 工程 → 激光 → 折弯 → 焊接 → 打磨 → 装配
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 工作日历 - 工作日算术
pub mod calendar;

// 配置层 - 流水线产能配置
pub mod config;

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 日志系统
pub mod logging;

// 数据仓储层 - 持久化边界
pub mod repository;

// ==========================================
// 重导出核心类型
// ==========================================

// 日历
pub use calendar::{WeekKey, WorkCalendar};

// 配置
pub use config::{DepartmentConfig, OvertimeTier, PipelineConfig, WorkerPool};

// 领域类型
pub use domain::{
    Department, DepartmentSchedule, DepartmentWindow, FeasibilityReport, HalfDays, Job, Points,
    ProductType, ProgressStatus, QuoteEstimate, QuoteInput, Recommendation, SizeTier, PIPELINE,
};

// 引擎
pub use engine::{
    BatchClassifier, CapacityLedger, DurationCalculator, EngineError, FeasibilityAnalyzer,
    PlacementEngine, ProgressTracker, ScheduleInsights, ScheduleOrchestrator, ScheduleRunResult,
    UrgencyScorer,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "定制钣金排产系统";
