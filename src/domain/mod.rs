// ==========================================
// 定制钣金排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、定点单位
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod job;
pub mod quote;
pub mod types;
pub mod units;

// 重导出核心类型
pub use job::{DepartmentSchedule, DepartmentWindow, Job};
pub use quote::{
    Bottleneck, DepartmentSlot, FeasibilityReport, MovedJob, OvertimeOutcome, QuoteEstimate,
    QuoteInput, TierOutcome,
};
pub use types::{
    BatchCategory, Department, DoorSubtype, ProductType, ProgressStatus, Recommendation,
    SizeTier, PIPELINE,
};
pub use units::{ceil_div_i128, HalfDays, Points};
