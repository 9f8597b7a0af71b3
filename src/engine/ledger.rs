// ==========================================
// 定制钣金排产系统 - 产能台账
// ==========================================
// 职责: 按日/按周/按池记账已占用产能, 支撑试配与预占
// 红线: canFit 失败无副作用; reserve 一经调用必然入账
//       (调用方负责先试配, 或接受随之而来的冲突标记)
// ==========================================

use crate::calendar::{WeekKey, WorkCalendar};
use crate::config::PipelineConfig;
use crate::domain::job::DepartmentWindow;
use crate::domain::types::{Department, ProductType};
use crate::domain::units::Points;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ==========================================
// BigRockDay - 单部门单日的大石块占用
// ==========================================
// 记录作业号集合, 跨多日的大石块在同一部门只计一次并发
#[derive(Debug, Clone, Default)]
pub struct BigRockDay {
    pub job_ids: BTreeSet<String>,
    pub total: Points,
}

// ==========================================
// CapacityLedger - 产能台账
// ==========================================
#[derive(Debug, Clone)]
pub struct CapacityLedger {
    config: Arc<PipelineConfig>,
    calendar: WorkCalendar,
    /// (部门, 日期) → 已占点数
    daily: BTreeMap<(Department, NaiveDate), Points>,
    /// (部门, 池下标, ISO周) → 已占点数
    weekly_pool: BTreeMap<(Department, usize, WeekKey), Points>,
    /// (部门, 日期) → 大石块占用
    big_rock: BTreeMap<(Department, NaiveDate), BigRockDay>,
}

impl CapacityLedger {
    pub fn new(config: Arc<PipelineConfig>, calendar: WorkCalendar) -> Self {
        Self {
            config,
            calendar,
            daily: BTreeMap::new(),
            weekly_pool: BTreeMap::new(),
            big_rock: BTreeMap::new(),
        }
    }

    /// 试配: 提议窗口能否在不破坏任何产能约束的前提下入账
    ///
    /// 逐工作日检查:
    /// 1) 部门日合计 ≤ 部门日产能
    /// 2) (按产品族选池) 池周合计 ≤ 池周产能
    /// 3) 大石块: 并发数 ≤ 上限, 且大石块合计 ≤ 日产能 × 配比上限
    ///
    /// 失败无任何副作用
    pub fn can_fit(
        &self,
        department: Department,
        start: NaiveDate,
        points: Points,
        duration_days: i64,
        product: ProductType,
        job_id: &str,
        is_big_rock: bool,
    ) -> bool {
        let dept_config = self.config.department(department);
        let daily_capacity = dept_config.daily_capacity();
        let (pool_index, pool) = dept_config.pool_for(product);
        let pool_weekly_capacity = pool.weekly_capacity();
        let big_rock_limit = Points::from_centi(
            daily_capacity.centi() * self.config.big_rock_daily_fraction_pct / 100,
        );

        let start = self.calendar.normalize_forward(start);
        let days = self.calendar.workdays_in_span(start, duration_days.max(1));
        let loads = points.spread_over_days(days.len());

        // 周合计先按提议窗口聚桶, 再与台账比对
        let mut week_loads: BTreeMap<WeekKey, Points> = BTreeMap::new();
        for (date, load) in days.iter().zip(loads.iter()) {
            let key = (department, *date);
            let daily_used = self.daily.get(&key).copied().unwrap_or(Points::ZERO);
            if daily_used + *load > daily_capacity {
                return false;
            }
            *week_loads
                .entry(self.calendar.week_key(*date))
                .or_insert(Points::ZERO) += *load;

            if is_big_rock {
                if let Some(state) = self.big_rock.get(&key) {
                    let already_counted = state.job_ids.contains(job_id);
                    if !already_counted
                        && state.job_ids.len() >= self.config.max_concurrent_big_rocks
                    {
                        return false;
                    }
                    if state.total + *load > big_rock_limit {
                        return false;
                    }
                } else if *load > big_rock_limit {
                    return false;
                }
            }
        }

        for (week, load) in week_loads {
            let used = self
                .weekly_pool
                .get(&(department, pool_index, week))
                .copied()
                .unwrap_or(Points::ZERO);
            if used + load > pool_weekly_capacity {
                return false;
            }
        }

        true
    }

    /// 预占: 无条件入账 (约束校验由 can_fit 前置)
    pub fn reserve(
        &mut self,
        department: Department,
        start: NaiveDate,
        points: Points,
        duration_days: i64,
        product: ProductType,
        job_id: &str,
        is_big_rock: bool,
    ) {
        let dept_config = self.config.department(department);
        let (pool_index, _) = dept_config.pool_for(product);

        let start = self.calendar.normalize_forward(start);
        let days = self.calendar.workdays_in_span(start, duration_days.max(1));
        let loads = points.spread_over_days(days.len());

        for (date, load) in days.iter().zip(loads.iter()) {
            *self
                .daily
                .entry((department, *date))
                .or_insert(Points::ZERO) += *load;
            *self
                .weekly_pool
                .entry((department, pool_index, self.calendar.week_key(*date)))
                .or_insert(Points::ZERO) += *load;

            if is_big_rock {
                let state = self.big_rock.entry((department, *date)).or_default();
                state.job_ids.insert(job_id.to_string());
                state.total += *load;
            }
        }
    }

    /// 按既有窗口回放入账 (重排前重建台账用)
    pub fn reserve_window(
        &mut self,
        department: Department,
        window: &DepartmentWindow,
        points: Points,
        product: ProductType,
        job_id: &str,
        is_big_rock: bool,
    ) {
        let start = self.calendar.normalize_forward(window.start);
        let duration_days = self.calendar.workdays_between(start, window.end).max(0) + 1;
        self.reserve(
            department,
            start,
            points,
            duration_days,
            product,
            job_id,
            is_big_rock,
        );
    }

    // ==========================================
    // 查询口 (测试与报表)
    // ==========================================

    pub fn daily_load(&self, department: Department, date: NaiveDate) -> Points {
        self.daily
            .get(&(department, date))
            .copied()
            .unwrap_or(Points::ZERO)
    }

    pub fn weekly_pool_load(
        &self,
        department: Department,
        pool_index: usize,
        week: WeekKey,
    ) -> Points {
        self.weekly_pool
            .get(&(department, pool_index, week))
            .copied()
            .unwrap_or(Points::ZERO)
    }

    pub fn big_rock_count(&self, department: Department, date: NaiveDate) -> usize {
        self.big_rock
            .get(&(department, date))
            .map(|s| s.job_ids.len())
            .unwrap_or(0)
    }

    /// 部门在某日起的在队工作量合计 (排队缓冲报表用)
    pub fn department_load_from(&self, department: Department, from: NaiveDate) -> Points {
        self.daily
            .range((department, from)..(department, NaiveDate::MAX))
            .map(|(_, p)| *p)
            .sum()
    }
}
