// ==========================================
// 定制钣金排产系统 - 进度漂移跟踪
// ==========================================
// 职责: 比对重导入作业与既有持久化排程, 判定漂移状态
// 输入: (incoming 当日导入, previous 既有持久化)
// 输出: 合并后的作业 (排程按生命周期规则保留或标记重排)
// ==========================================

use crate::calendar::WorkCalendar;
use crate::domain::job::Job;
use crate::domain::types::ProgressStatus;
use chrono::NaiveDate;
use tracing::{debug, instrument};

/// 滞后升级为停滞的无变化天数阈值 (日历日)
const STALL_AFTER_DAYS: i64 = 2;

// ==========================================
// ProgressTracker - 进度跟踪引擎
// ==========================================
pub struct ProgressTracker {
    calendar: WorkCalendar,
}

impl ProgressTracker {
    pub fn new(calendar: WorkCalendar) -> Self {
        Self { calendar }
    }

    /// 比对并合并
    ///
    /// 规则:
    /// - 交期变更 (按日历日相等判定) → needs_reschedule, 不沿用旧排程
    /// - 交期未变 → 旧排程原样保留 (跨日导入不得改写排程)
    /// - 部门变化 → 盖 last_department_change 时间戳
    /// - 进度状态: 当前部门位置 对比 旧排程中"今日应处部门",
    ///   超前/按计划/滞后; 滞后且 ≥2 天无部门变化 → 停滞
    #[instrument(skip(self, incoming, previous), fields(job_id = %incoming.job_id))]
    pub fn track_progress(&self, incoming: Job, previous: &Job, today: NaiveDate) -> Job {
        let mut result = incoming;

        // 1. 交期变更检测 (日历日口径, 不看时间戳)
        let due_changed = result.due_date != previous.due_date;
        if due_changed {
            debug!(
                old = ?previous.due_date,
                new = ?result.due_date,
                "交期变更, 标记重排"
            );
            result.needs_reschedule = true;
        } else {
            // 2. 交期未变: 旧排程跨导入原样保留
            result.department_schedule = previous.department_schedule.clone();
            result.scheduled_department_by_date = previous.scheduled_department_by_date.clone();
            result.scheduling_conflict = previous.scheduling_conflict;
            result.rebuild_derived_schedules(&self.calendar);
        }

        // 3. 部门变化时间戳
        if result.current_department != previous.current_department {
            result.last_department_change = Some(today);
        } else {
            result.last_department_change = previous.last_department_change;
        }

        // 4. 超期软标记
        result.is_overdue = result
            .due_date
            .map(|due| due < today)
            .unwrap_or(false);

        // 5. 进度状态判定
        result.progress_status = self.classify_drift(&result, previous, today);
        result
    }

    /// 漂移判定: 当前部门流水线位置 vs 旧排程今日期望部门
    fn classify_drift(&self, job: &Job, previous: &Job, today: NaiveDate) -> ProgressStatus {
        let expected = Self::expected_department_on(previous, today);
        let expected = match expected {
            Some(dept) => dept,
            // 旧排程没有对今日的预期 (未排程/排程已结束) → 维持原状态
            None => return previous.progress_status,
        };

        let current_index = job.current_department.pipeline_index();
        let expected_index = expected.pipeline_index();

        if current_index > expected_index {
            ProgressStatus::Ahead
        } else if current_index == expected_index {
            ProgressStatus::OnTrack
        } else {
            // 滞后; 长时间无部门变化则升级为停滞
            let stalled = match job.last_department_change {
                Some(last_change) => (today - last_change).num_days() >= STALL_AFTER_DAYS,
                None => true,
            };
            if stalled {
                ProgressStatus::Stalled
            } else {
                ProgressStatus::Slipping
            }
        }
    }

    /// 旧排程中"今日应处部门": 精确命中今日, 否则取今日前最近一条
    fn expected_department_on(
        previous: &Job,
        today: NaiveDate,
    ) -> Option<crate::domain::types::Department> {
        if let Some(dept) = previous.scheduled_department_by_date.get(&today) {
            return Some(*dept);
        }
        previous
            .scheduled_department_by_date
            .range(..=today)
            .next_back()
            .map(|(_, dept)| *dept)
    }
}
