// ==========================================
// 定制钣金排产系统 - 作业领域模型
// ==========================================
// 职责: 作业主数据 + 排程窗口 + 进度跟踪字段
// 红线: 排程冲突/超期/停滞均为软信号, 以数据返回, 绝不抛错
// ==========================================

use crate::calendar::WorkCalendar;
use crate::domain::types::{Department, ProductType, ProgressStatus, PIPELINE};
use crate::domain::units::Points;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// DepartmentWindow - 部门时间窗口
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DepartmentWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// 部门排程: 按流水线顺序排列的部门→窗口映射
pub type DepartmentSchedule = BTreeMap<Department, DepartmentWindow>;

// ==========================================
// Job - 作业
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    // ===== 主数据 =====
    pub job_id: String,
    pub job_name: String,
    pub description: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub product_type: ProductType,
    /// 点数: 产能与工期计算的通用货币
    pub welding_points: Points,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub current_department: Department,
    #[serde(default)]
    pub requires_painting: bool,
    /// 跳过工序间最小间隔 (人工覆写)
    #[serde(default)]
    pub no_gaps: bool,
    #[serde(default)]
    pub completed: bool,

    // ===== 排程输出 =====
    #[serde(default)]
    pub department_schedule: DepartmentSchedule,
    /// 限定当前及下游部门的排程
    #[serde(default)]
    pub remaining_department_schedule: DepartmentSchedule,
    /// 日期 → 当日应处部门 (漂移检测用)
    #[serde(default)]
    pub scheduled_department_by_date: BTreeMap<NaiveDate, Department>,

    // ===== 软信号 =====
    #[serde(default)]
    pub is_overdue: bool,
    #[serde(default)]
    pub scheduling_conflict: bool,
    #[serde(default)]
    pub progress_status: ProgressStatus,
    #[serde(default)]
    pub needs_reschedule: bool,

    // ===== 排序/跟踪辅助 =====
    /// 外部注入的紧急评分, 仅用于排序
    #[serde(default)]
    pub urgency_score: Option<i64>,
    #[serde(default)]
    pub last_department_change: Option<NaiveDate>,
}

impl Job {
    /// 最小构造 (测试与导入边界用)
    pub fn new(
        job_id: impl Into<String>,
        job_name: impl Into<String>,
        product_type: ProductType,
        welding_points: Points,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            job_name: job_name.into(),
            description: String::new(),
            customer: None,
            product_type,
            welding_points,
            quantity: None,
            due_date: None,
            current_department: Department::Engineering,
            requires_painting: false,
            no_gaps: false,
            completed: false,
            department_schedule: BTreeMap::new(),
            remaining_department_schedule: BTreeMap::new(),
            scheduled_department_by_date: BTreeMap::new(),
            is_overdue: false,
            scheduling_conflict: false,
            progress_status: ProgressStatus::OnTrack,
            needs_reschedule: false,
            urgency_score: None,
            last_department_change: None,
        }
    }

    pub fn has_schedule(&self) -> bool {
        !self.department_schedule.is_empty()
    }

    /// 整体开工日 (首个部门窗口起点)
    pub fn schedule_start(&self) -> Option<NaiveDate> {
        self.department_schedule.values().map(|w| w.start).min()
    }

    /// 整体完工日 (末个部门窗口终点)
    pub fn schedule_end(&self) -> Option<NaiveDate> {
        self.department_schedule.values().map(|w| w.end).max()
    }

    /// 超期天数 (日历日, 未超期为 0)
    pub fn overdue_days(&self, today: NaiveDate) -> i64 {
        match self.due_date {
            Some(due) if due < today => (today - due).num_days(),
            _ => 0,
        }
    }

    /// 依据完整排程重建派生映射
    ///
    /// - remaining_department_schedule: 仅保留当前及下游部门
    /// - scheduled_department_by_date: 同日多部门重叠时取更下游者
    pub fn rebuild_derived_schedules(&mut self, calendar: &WorkCalendar) {
        let current_index = self.current_department.pipeline_index();
        self.remaining_department_schedule = self
            .department_schedule
            .iter()
            .filter(|(dept, _)| dept.pipeline_index() >= current_index)
            .map(|(dept, window)| (*dept, *window))
            .collect();

        self.scheduled_department_by_date.clear();
        for dept in PIPELINE {
            if let Some(window) = self.department_schedule.get(&dept) {
                let mut date = calendar.normalize_forward(window.start);
                while date <= window.end {
                    // 流水线顺序迭代, 下游部门覆盖上游
                    self.scheduled_department_by_date.insert(date, dept);
                    date = calendar.next_workday(date);
                }
            }
        }
    }

    /// 清除排程输出 (重排前调用; 旧排程由调用方归档, 不原地改写)
    pub fn retire_schedule(&mut self) {
        self.department_schedule.clear();
        self.remaining_department_schedule.clear();
        self.scheduled_department_by_date.clear();
        self.scheduling_conflict = false;
    }
}
