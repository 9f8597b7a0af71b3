// ==========================================
// 定制钣金排产系统 - 配置层
// ==========================================
// 职责: 流水线/工人池/客户画像等静态配置
// 红线: 引擎不读全局可变状态, 配置以显式参数注入
// ==========================================

pub mod pipeline;

pub use pipeline::{
    ConfigError, CustomerProfile, DepartmentConfig, DoorFlowConfig, FloodFlowConfig,
    OvertimeTier, PipelineConfig, PointConversion, WorkerPool,
};
