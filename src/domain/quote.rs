// ==========================================
// 定制钣金排产系统 - 报价领域模型
// ==========================================
// 职责: 可行性分析的输入与结构化输出
// ==========================================

use crate::domain::types::{Department, ProductType, Recommendation};
use crate::domain::units::{HalfDays, Points};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// QuoteInput - 待评估报价
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteInput {
    pub quote_name: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub product_type: ProductType,
    /// 报价金额 (美分), 按产品族换算率折算为点数
    pub dollar_value_cents: i64,
    /// 可选的大石块拆分 (子作业点数)
    #[serde(default)]
    pub big_rock_breakdown: Option<Vec<Points>>,
    /// 工程资料齐备日 (最早可开工)
    pub engineering_ready: NaiveDate,
    /// 目标完工日 (checkFeasibility 必填)
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub requires_painting: bool,
}

// ==========================================
// 结构化输出
// ==========================================

/// 单部门试排结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSlot {
    pub department: Department,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: HalfDays,
}

/// 瓶颈记录: 某部门的最早可排时段晚于期望
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    pub department: Department,
    /// 流水线上游推算出的期望开工日
    pub requested_start: NaiveDate,
    /// 产能允许的实际开工日
    pub granted_start: NaiveDate,
}

/// 单档评估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierOutcome {
    pub achievable: bool,
    pub projected_completion: Option<NaiveDate>,
    pub department_plan: Vec<DepartmentSlot>,
    pub bottlenecks: Vec<Bottleneck>,
}

/// 第二档: 被推移的既有作业
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovedJob {
    pub job_id: String,
    pub slack_days: i64,
    pub pushed_back_days: i64,
}

/// 第三档: 采用的加班档位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvertimeOutcome {
    pub tier_name: String,
    pub weekly_bonus: Points,
    pub labor_note: String,
    pub outcome: TierOutcome,
}

/// 报价试排估算 (Tier 1 口径, 不做目标判定)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteEstimate {
    pub quote_id: String,
    pub quote_name: String,
    pub points: Points,
    pub department_plan: Vec<DepartmentSlot>,
    pub projected_completion: Option<NaiveDate>,
    pub bottlenecks: Vec<Bottleneck>,
}

/// 三档可行性报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub quote_id: String,
    pub quote_name: String,
    pub points: Points,
    pub target_date: NaiveDate,
    pub recommendation: Recommendation,
    /// 可读结论, 指明受限部门与日期
    pub rationale: String,
    pub as_is: TierOutcome,
    #[serde(default)]
    pub with_moves: Option<(TierOutcome, Vec<MovedJob>)>,
    #[serde(default)]
    pub with_overtime: Option<OvertimeOutcome>,
}
