// ==========================================
// 定制钣金排产系统 - 窗口放置引擎
// ==========================================
// 职责: 为单作业放置各部门时间窗口
// 模式: 倒排 (BackwardFromDue, 常规作业) 与
//       顺排 (ForwardFromToday, 已超期作业)
// 红线: 产能耗尽不是错误; 预算内找不到位置时
//       按尽力而为落位并打冲突软标记
// ==========================================

use crate::calendar::WorkCalendar;
use crate::config::PipelineConfig;
use crate::domain::job::{DepartmentWindow, Job};
use crate::domain::types::{Department, ProgressStatus, SizeTier, PIPELINE};
use crate::domain::units::Points;
use crate::engine::duration::{DurationCalculator, DurationRequest};
use crate::engine::error::EngineError;
use crate::engine::ledger::CapacityLedger;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

// ==========================================
// PlacementEngine - 窗口放置引擎
// ==========================================
pub struct PlacementEngine {
    config: Arc<PipelineConfig>,
    calendar: WorkCalendar,
    duration: DurationCalculator,
}

impl PlacementEngine {
    pub fn new(config: Arc<PipelineConfig>, calendar: WorkCalendar) -> Self {
        let duration = DurationCalculator::new(config.clone());
        Self {
            config,
            calendar,
            duration,
        }
    }

    pub fn duration_calculator(&self) -> &DurationCalculator {
        &self.duration
    }

    // ==========================================
    // 半日槽位算术
    // ==========================================
    // 槽位 = 工作日序数 × 2 + {0: 上半日, 1: 下半日}
    // 间隔与窗口平移全部落在槽位整数上, 无浮点参与

    fn slot_start_of(&self, date: NaiveDate) -> i64 {
        self.calendar.workday_ordinal(date) * 2
    }

    fn slot_end_of(&self, date: NaiveDate) -> i64 {
        self.calendar.workday_ordinal(date) * 2 + 1
    }

    fn slot_date(&self, slot: i64) -> NaiveDate {
        self.calendar.date_from_ordinal(slot.div_euclid(2))
    }

    // ==========================================
    // 倒排: BackwardFromDue
    // ==========================================

    /// 自交期倒排各部门窗口
    ///
    /// 逆流水线顺序逐部门: 以游标为提议终点, 试配失败则整块
    /// 前移一个工作日重试 (预算内); 成功即预占并把游标推进到
    /// (起点 − 规模间隔)。工程部落位后作业整体开工日即其起点。
    ///
    /// 任一部门终点预算内未能试配成功, 或任一窗口起点早于今日,
    /// 置 scheduling_conflict + STALLED, 不抛错
    #[instrument(skip(self, job, ledger), fields(job_id = %job.job_id))]
    pub fn schedule_backward(
        &self,
        job: &mut Job,
        ledger: &mut CapacityLedger,
        today: NaiveDate,
        batch_size: usize,
    ) -> Result<(), EngineError> {
        let due = job
            .due_date
            .ok_or_else(|| EngineError::MissingDueDate(job.job_id.clone()))?;

        let due_workday = self.calendar.normalize_backward(due);
        let target_end = self
            .calendar
            .add_workdays(due_workday, -self.config.due_buffer_days);

        let tier = self.config.size_tier(job.welding_points);
        let gap = self.config.gap_half_days(tier, job.no_gaps);
        let is_big_rock = tier == SizeTier::BigRock;
        let effective_points = self
            .duration
            .effective_points(job.welding_points, batch_size);

        let mut cursor = self.slot_end_of(target_end);
        let mut windows: BTreeMap<Department, DepartmentWindow> = BTreeMap::new();
        let mut capacity_conflict = false;

        for department in PIPELINE.iter().rev() {
            let request = DurationRequest::from_job(job, *department, batch_size);
            let halves = self.duration.duration(&request).halves();

            let placed = self.search_backward_slot(
                *department,
                cursor,
                halves,
                effective_points,
                job,
                is_big_rock,
                &windows,
                ledger,
            );

            let (start_slot, end_slot) = match placed {
                Some(slots) => slots,
                None => {
                    // 尽力而为: 锚回最贴近交期的提议位置
                    capacity_conflict = true;
                    (cursor - (halves - 1), cursor)
                }
            };

            let window =
                DepartmentWindow::new(self.slot_date(start_slot), self.slot_date(end_slot));
            let duration_days = self.calendar.workdays_between(window.start, window.end) + 1;
            ledger.reserve(
                *department,
                window.start,
                effective_points,
                duration_days,
                job.product_type,
                &job.job_id,
                is_big_rock,
            );
            debug!(
                department = %department,
                start = %window.start,
                end = %window.end,
                "窗口落位"
            );
            windows.insert(*department, window);
            cursor = start_slot - 1 - gap;
        }

        let today_workday = self.calendar.normalize_forward(today);
        let starts_in_past = windows.values().any(|w| w.start < today_workday);

        job.department_schedule = windows;
        job.is_overdue = false;
        if capacity_conflict || starts_in_past {
            job.scheduling_conflict = true;
            job.progress_status = ProgressStatus::Stalled;
        } else {
            job.scheduling_conflict = false;
            job.progress_status = ProgressStatus::OnTrack;
        }
        job.rebuild_derived_schedules(&self.calendar);
        Ok(())
    }

    /// 倒排槽位搜索: 试配 + 同日活跃部门上限, 失败整块前移一日
    #[allow(clippy::too_many_arguments)]
    fn search_backward_slot(
        &self,
        department: Department,
        cursor: i64,
        halves: i64,
        effective_points: Points,
        job: &Job,
        is_big_rock: bool,
        placed_windows: &BTreeMap<Department, DepartmentWindow>,
        ledger: &CapacityLedger,
    ) -> Option<(i64, i64)> {
        let mut end_slot = cursor;
        for _attempt in 0..self.config.shift_attempt_budget {
            let start_slot = end_slot - (halves - 1);
            let start_date = self.slot_date(start_slot);
            let end_date = self.slot_date(end_slot);
            let duration_days = self.calendar.workdays_between(start_date, end_date) + 1;

            let fits = ledger.can_fit(
                department,
                start_date,
                effective_points,
                duration_days,
                job.product_type,
                &job.job_id,
                is_big_rock,
            );
            // 同日活跃部门上限独立于产能台账检查
            let concurrency_ok =
                self.active_departments_ok(placed_windows, start_date, end_date);

            if fits && concurrency_ok {
                return Some((start_slot, end_slot));
            }
            end_slot -= 2;
        }
        None
    }

    /// 同一作业同日活跃部门数不超上限
    fn active_departments_ok(
        &self,
        placed_windows: &BTreeMap<Department, DepartmentWindow>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> bool {
        let limit = self.config.max_active_departments_per_day;
        let span = self.calendar.workdays_between(start, end) + 1;
        for date in self.calendar.workdays_in_span(start, span) {
            let active = placed_windows.values().filter(|w| w.contains(date)).count();
            if active + 1 > limit {
                return false;
            }
        }
        true
    }

    // ==========================================
    // 顺排: ForwardFromToday
    // ==========================================

    /// 自今日顺排剩余部门 (仅用于已超期作业)
    ///
    /// 自当前部门起 (已完成工序跳过), 各剩余部门紧贴前一部门
    /// 终点加规模间隔依次落位并预占。超期作业必然打上
    /// is_overdue + scheduling_conflict 软标记
    #[instrument(skip(self, job, ledger), fields(job_id = %job.job_id))]
    pub fn schedule_forward(
        &self,
        job: &mut Job,
        ledger: &mut CapacityLedger,
        today: NaiveDate,
        batch_size: usize,
    ) {
        let tier = self.config.size_tier(job.welding_points);
        let gap = self.config.gap_half_days(tier, job.no_gaps);
        let is_big_rock = tier == SizeTier::BigRock;
        let effective_points = self
            .duration
            .effective_points(job.welding_points, batch_size);

        let start_index = job.current_department.pipeline_index();
        let mut cursor = self.slot_start_of(self.calendar.normalize_forward(today));
        let mut windows: BTreeMap<Department, DepartmentWindow> = BTreeMap::new();

        for department in PIPELINE.iter().skip(start_index) {
            let request = DurationRequest::from_job(job, *department, batch_size);
            let halves = self.duration.duration(&request).halves();
            let start_slot = cursor;
            let end_slot = cursor + halves - 1;
            let window =
                DepartmentWindow::new(self.slot_date(start_slot), self.slot_date(end_slot));
            let duration_days = self.calendar.workdays_between(window.start, window.end) + 1;
            ledger.reserve(
                *department,
                window.start,
                effective_points,
                duration_days,
                job.product_type,
                &job.job_id,
                is_big_rock,
            );
            windows.insert(*department, window);
            cursor = end_slot + 1 + gap;
        }

        job.department_schedule = windows;
        job.is_overdue = true;
        job.scheduling_conflict = true;
        job.progress_status = ProgressStatus::Stalled;
        job.rebuild_derived_schedules(&self.calendar);
    }
}
