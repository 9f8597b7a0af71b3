// ==========================================
// 定制钣金排产系统 - 排产编排器
// ==========================================
// 职责: 全量排产主流程
//       回放既有占用 → 分组排序 → 逐作业放置 → 汇总洞察
// 红线: 同输入必得同输出 (台账每轮重建, 排序键全序)
// ==========================================

use crate::calendar::WorkCalendar;
use crate::config::PipelineConfig;
use crate::domain::job::Job;
use crate::domain::types::{Department, SizeTier, PIPELINE};
use crate::domain::units::{ceil_div_i128, HalfDays};
use crate::engine::batch::BatchClassifier;
use crate::engine::ledger::CapacityLedger;
use crate::engine::scheduler::PlacementEngine;
use crate::engine::urgency::{DefaultUrgencyScorer, UrgencyScorer};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// ScheduleInsights - 排产洞察
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedJob {
    pub job_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInsights {
    pub total_jobs: usize,
    pub scheduled: usize,
    pub conflicts: usize,
    pub overdue: usize,
    pub big_rocks: usize,
    /// 进入 ≥2 规模批次同组的作业数
    pub batched_jobs: usize,
    pub skipped: Vec<SkippedJob>,
}

#[derive(Debug, Clone)]
pub struct ScheduleRunResult {
    pub scheduled_jobs: Vec<Job>,
    pub insights: ScheduleInsights,
}

// ==========================================
// ScheduleOrchestrator - 排产编排器
// ==========================================
pub struct ScheduleOrchestrator {
    config: Arc<PipelineConfig>,
    calendar: WorkCalendar,
    placement: PlacementEngine,
    classifier: BatchClassifier,
    scorer: Box<dyn UrgencyScorer>,
}

impl ScheduleOrchestrator {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let calendar = WorkCalendar::new(config.saturday_overtime);
        let scorer = Box::new(DefaultUrgencyScorer::new(config.clone(), calendar));
        Self::with_scorer(config, scorer)
    }

    /// 注入自定义紧急评分器
    pub fn with_scorer(config: Arc<PipelineConfig>, scorer: Box<dyn UrgencyScorer>) -> Self {
        let calendar = WorkCalendar::new(config.saturday_overtime);
        Self {
            placement: PlacementEngine::new(config.clone(), calendar),
            classifier: BatchClassifier::new(),
            config,
            calendar,
            scorer,
        }
    }

    pub fn calendar(&self) -> WorkCalendar {
        self.calendar
    }

    // ==========================================
    // 全量排产
    // ==========================================

    /// 排产主流程
    ///
    /// 排队策略:
    /// 1) 超期作业整体先于准时作业 (已破的承诺先保)
    /// 2) 组内大石块先行: 超期组按超期天数降序, 准时组按紧急评分降序,
    ///    再按交期升序、点数降序
    /// 3) 准时小件走批次分类器, 同组保持相邻
    ///
    /// 既有作业的已承诺窗口先回放入账, 本轮是
    /// (待排作业, 既有作业, 日历, 配置) 的纯函数
    #[instrument(skip(self, new_jobs, committed), fields(new = new_jobs.len(), committed = committed.len()))]
    pub fn schedule_all(
        &self,
        new_jobs: Vec<Job>,
        committed: &[Job],
        today: NaiveDate,
    ) -> ScheduleRunResult {
        let total_jobs = new_jobs.len();
        let mut ledger = self.replay_committed(committed);
        let mut skipped: Vec<SkippedJob> = Vec::new();
        let mut output: Vec<Job> = Vec::new();

        // 1. 输入校验: 缺交期的作业跳过并告警, 其余照常
        let mut valid: Vec<Job> = Vec::new();
        for job in new_jobs {
            if job.due_date.is_none() {
                warn!(job_id = %job.job_id, "作业缺少交期, 本轮跳过");
                skipped.push(SkippedJob {
                    job_id: job.job_id.clone(),
                    reason: "missing due_date".to_string(),
                });
                output.push(job);
            } else {
                valid.push(job);
            }
        }

        // 2. 补齐紧急评分 (外部已注入的评分不覆盖)
        for job in valid.iter_mut() {
            if job.urgency_score.is_none() {
                job.urgency_score = Some(self.scorer.score(job, today).score);
            }
            job.retire_schedule();
        }

        // 3. 分组: 超期/准时 × 大石块/小件
        let (overdue, on_time): (Vec<Job>, Vec<Job>) =
            valid.into_iter().partition(|j| j.overdue_days(today) > 0);
        let (mut overdue_big, mut overdue_small): (Vec<Job>, Vec<Job>) = overdue
            .into_iter()
            .partition(|j| self.config.size_tier(j.welding_points) == SizeTier::BigRock);
        let (mut on_time_big, on_time_small): (Vec<Job>, Vec<Job>) = on_time
            .into_iter()
            .partition(|j| self.config.size_tier(j.welding_points) == SizeTier::BigRock);

        overdue_big.sort_by(|a, b| compare_overdue(a, b, today));
        overdue_small.sort_by(|a, b| compare_overdue(a, b, today));
        on_time_big.sort_by(compare_on_time);
        let queued_small = self
            .classifier
            .order_for_scheduling(on_time_small, &self.calendar);

        let big_rocks = overdue_big.len() + on_time_big.len();
        let overdue_count = overdue_big.len() + overdue_small.len();
        let batched_jobs = queued_small
            .iter()
            .filter(|q| q.cohort_size >= 2)
            .count();

        // 4. 放置: 超期顺排, 准时倒排
        for mut job in overdue_big.into_iter().chain(overdue_small) {
            self.placement
                .schedule_forward(&mut job, &mut ledger, today, 1);
            output.push(job);
        }
        for mut job in on_time_big {
            if let Err(error) = self
                .placement
                .schedule_backward(&mut job, &mut ledger, today, 1)
            {
                warn!(job_id = %job.job_id, %error, "倒排失败, 本轮跳过");
                skipped.push(SkippedJob {
                    job_id: job.job_id.clone(),
                    reason: error.to_string(),
                });
            }
            output.push(job);
        }
        for queued in queued_small {
            let mut job = queued.job;
            if let Err(error) = self.placement.schedule_backward(
                &mut job,
                &mut ledger,
                today,
                queued.cohort_size,
            ) {
                warn!(job_id = %job.job_id, %error, "倒排失败, 本轮跳过");
                skipped.push(SkippedJob {
                    job_id: job.job_id.clone(),
                    reason: error.to_string(),
                });
            }
            output.push(job);
        }

        let scheduled = output.iter().filter(|j| j.has_schedule()).count();
        let conflicts = output.iter().filter(|j| j.scheduling_conflict).count();
        let insights = ScheduleInsights {
            total_jobs,
            scheduled,
            conflicts,
            overdue: overdue_count,
            big_rocks,
            batched_jobs,
            skipped,
        };
        info!(
            scheduled = insights.scheduled,
            conflicts = insights.conflicts,
            overdue = insights.overdue,
            "排产完成"
        );

        ScheduleRunResult {
            scheduled_jobs: output,
            insights,
        }
    }

    /// 把既有作业的已承诺窗口回放到新台账
    fn replay_committed(&self, committed: &[Job]) -> CapacityLedger {
        let mut ledger = CapacityLedger::new(self.config.clone(), self.calendar);
        for job in committed {
            if job.completed || !job.has_schedule() {
                continue;
            }
            let is_big_rock =
                self.config.size_tier(job.welding_points) == SizeTier::BigRock;
            for (department, window) in &job.department_schedule {
                ledger.reserve_window(
                    *department,
                    window,
                    job.welding_points,
                    job.product_type,
                    &job.job_id,
                    is_big_rock,
                );
            }
        }
        ledger
    }

    // ==========================================
    // 排队缓冲报表
    // ==========================================

    /// 自 from 起各部门在队工作量 (天, 半日粒度向上取整)
    pub fn queue_buffer_days(
        &self,
        committed: &[Job],
        from: NaiveDate,
    ) -> BTreeMap<Department, HalfDays> {
        let ledger = self.replay_committed(committed);
        let from = self.calendar.normalize_forward(from);
        let mut buffer = BTreeMap::new();
        for department in PIPELINE {
            let load = ledger.department_load_from(department, from);
            let capacity = self.config.department(department).daily_capacity();
            let halves = if capacity.is_zero() {
                0
            } else {
                ceil_div_i128(load.centi() as i128 * 2, capacity.centi() as i128)
            };
            buffer.insert(department, HalfDays::from_halves(halves));
        }
        buffer
    }
}

/// 超期组排序: 超期天数降序 → 交期升序 → 点数降序 → 作业号
fn compare_overdue(a: &Job, b: &Job, today: NaiveDate) -> Ordering {
    b.overdue_days(today)
        .cmp(&a.overdue_days(today))
        .then_with(|| a.due_date.cmp(&b.due_date))
        .then_with(|| b.welding_points.cmp(&a.welding_points))
        .then_with(|| a.job_id.cmp(&b.job_id))
}

/// 准时大石块排序: 紧急评分降序 → 交期升序 → 点数降序 → 作业号
fn compare_on_time(a: &Job, b: &Job) -> Ordering {
    b.urgency_score
        .unwrap_or(0)
        .cmp(&a.urgency_score.unwrap_or(0))
        .then_with(|| a.due_date.cmp(&b.due_date))
        .then_with(|| b.welding_points.cmp(&a.welding_points))
        .then_with(|| a.job_id.cmp(&b.job_id))
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ProductType;
    use crate::domain::units::Points;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn orchestrator() -> ScheduleOrchestrator {
        ScheduleOrchestrator::new(Arc::new(PipelineConfig::standard()))
    }

    fn fab_job(id: &str, points: i64, due: NaiveDate) -> Job {
        let mut job = Job::new(id, id, ProductType::Fab, Points::from_whole(points));
        job.description = "louver panel".to_string();
        job.due_date = Some(due);
        job
    }

    #[test]
    fn test_missing_due_date_skipped_with_warning() {
        let orchestrator = orchestrator();
        let no_due = Job::new("BAD", "BAD", ProductType::Fab, Points::from_whole(10));
        let good = fab_job("GOOD", 20, d(2026, 9, 30));

        let result = orchestrator.schedule_all(vec![no_due, good], &[], d(2026, 8, 3));

        assert_eq!(result.insights.skipped.len(), 1);
        assert_eq!(result.insights.skipped[0].job_id, "BAD");
        // 其余作业照常排产
        let good_out = result
            .scheduled_jobs
            .iter()
            .find(|j| j.job_id == "GOOD")
            .unwrap();
        assert!(good_out.has_schedule());
        // 坏作业保留在输出中但无排程
        let bad_out = result
            .scheduled_jobs
            .iter()
            .find(|j| j.job_id == "BAD")
            .unwrap();
        assert!(!bad_out.has_schedule());
    }

    #[test]
    fn test_overdue_scheduled_before_on_time() {
        let orchestrator = orchestrator();
        let overdue = fab_job("LATE", 20, d(2026, 7, 20));
        let on_time = fab_job("OK", 20, d(2026, 9, 30));

        let result =
            orchestrator.schedule_all(vec![on_time, overdue], &[], d(2026, 8, 3));

        let late = result
            .scheduled_jobs
            .iter()
            .find(|j| j.job_id == "LATE")
            .unwrap();
        assert!(late.is_overdue);
        assert!(late.scheduling_conflict);
        // 超期作业自今日顺排
        assert_eq!(late.schedule_start(), Some(d(2026, 8, 3)));
        assert_eq!(result.insights.overdue, 1);
    }

    #[test]
    fn test_deterministic_output() {
        let jobs = || {
            vec![
                fab_job("J1", 80, d(2026, 9, 18)),
                fab_job("J2", 30, d(2026, 9, 11)),
                fab_job("J3", 30, d(2026, 9, 11)),
                fab_job("J4", 65, d(2026, 9, 25)),
            ]
        };
        let first = orchestrator().schedule_all(jobs(), &[], d(2026, 8, 3));
        let second = orchestrator().schedule_all(jobs(), &[], d(2026, 8, 3));

        for (a, b) in first
            .scheduled_jobs
            .iter()
            .zip(second.scheduled_jobs.iter())
        {
            assert_eq!(a.job_id, b.job_id);
            assert_eq!(a.department_schedule, b.department_schedule);
        }
    }

    #[test]
    fn test_committed_replay_consumes_capacity() {
        let orchestrator = orchestrator();
        // 第一轮: 排一个大件并承诺
        let first = orchestrator.schedule_all(
            vec![fab_job("C1", 80, d(2026, 9, 4))],
            &[],
            d(2026, 8, 3),
        );
        let committed = first.scheduled_jobs;

        // 第二轮: 同交期同规模的新作业应被既有占用推开
        let second = orchestrator.schedule_all(
            vec![fab_job("N1", 80, d(2026, 9, 4))],
            &committed,
            d(2026, 8, 3),
        );
        let c1 = committed.iter().find(|j| j.job_id == "C1").unwrap();
        let n1 = second
            .scheduled_jobs
            .iter()
            .find(|j| j.job_id == "N1")
            .unwrap();
        // 大石块并发限制下, 两个 80 点大件不可能同窗同位
        assert_ne!(
            c1.department_schedule[&Department::Welding],
            n1.department_schedule[&Department::Welding]
        );
    }

    #[test]
    fn test_queue_buffer_days() {
        let orchestrator = orchestrator();
        let result = orchestrator.schedule_all(
            vec![fab_job("J1", 80, d(2026, 9, 4))],
            &[],
            d(2026, 8, 3),
        );
        let buffer =
            orchestrator.queue_buffer_days(&result.scheduled_jobs, d(2026, 8, 3));
        // 六部门都有读数; 焊接 80 点 ÷ 日产能 280 → 0.5 天
        assert_eq!(buffer.len(), PIPELINE.len());
        assert_eq!(
            buffer[&Department::Welding],
            HalfDays::from_halves(1)
        );
    }

    #[test]
    fn test_insights_counts() {
        let orchestrator = orchestrator();
        let jobs = vec![
            fab_job("BIG", 80, d(2026, 9, 18)),
            fab_job("SMALL", 10, d(2026, 9, 11)),
            fab_job("LATE", 20, d(2026, 7, 24)),
        ];
        let result = orchestrator.schedule_all(jobs, &[], d(2026, 8, 3));
        assert_eq!(result.insights.total_jobs, 3);
        assert_eq!(result.insights.big_rocks, 1);
        assert_eq!(result.insights.overdue, 1);
        assert!(result.insights.scheduled >= 3);
    }
}
