// ==========================================
// 定制钣金排产系统 - 紧急评分
// ==========================================
// 职责: 为排序提供紧急评分 (外部可注入自定义实现)
// 输出: 评分 + 因子列表 (可解释性)
// ==========================================

use crate::calendar::WorkCalendar;
use crate::config::PipelineConfig;
use crate::domain::job::Job;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==========================================
// UrgencyAssessment - 评分结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyAssessment {
    pub score: i64,
    pub factors: Vec<String>,
}

// ==========================================
// Trait: UrgencyScorer
// ==========================================
// 调用方只消费 score 用于排序; factors 仅作解释
pub trait UrgencyScorer {
    fn score(&self, job: &Job, today: NaiveDate) -> UrgencyAssessment;
}

// ==========================================
// DefaultUrgencyScorer - 内置评分器
// ==========================================
pub struct DefaultUrgencyScorer {
    config: Arc<PipelineConfig>,
    calendar: WorkCalendar,
}

impl DefaultUrgencyScorer {
    pub fn new(config: Arc<PipelineConfig>, calendar: WorkCalendar) -> Self {
        Self { config, calendar }
    }
}

impl UrgencyScorer for DefaultUrgencyScorer {
    /// 评分因子 (从高到低):
    /// 1) 超期天数 × 10
    /// 2) 临近交期: ≤5 工作日 +50, ≤10 工作日 +25
    /// 3) 大石块 +15 (大件挪不动, 先占坑)
    /// 4) 历史排程冲突 +20
    fn score(&self, job: &Job, today: NaiveDate) -> UrgencyAssessment {
        let mut score = 0;
        let mut factors = Vec::new();

        let overdue_days = job.overdue_days(today);
        if overdue_days > 0 {
            score += overdue_days * 10;
            factors.push(format!("OVERDUE: {} days late", overdue_days));
        } else if let Some(due) = job.due_date {
            let days_to_due = self.calendar.workdays_between(today, due);
            if days_to_due <= 5 {
                score += 50;
                factors.push(format!("NEAR_DUE: {} workdays to due", days_to_due));
            } else if days_to_due <= 10 {
                score += 25;
                factors.push(format!("APPROACHING_DUE: {} workdays to due", days_to_due));
            }
        }

        if job.welding_points >= self.config.big_rock_threshold {
            score += 15;
            factors.push(format!("BIG_ROCK: {} points", job.welding_points));
        }

        if job.scheduling_conflict {
            score += 20;
            factors.push("PRIOR_CONFLICT: schedule was already infeasible".to_string());
        }

        if factors.is_empty() {
            factors.push("no urgency factors".to_string());
        }

        UrgencyAssessment { score, factors }
    }
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

    fn scorer() -> DefaultUrgencyScorer {
        DefaultUrgencyScorer::new(
            Arc::new(PipelineConfig::standard()),
            WorkCalendar::standard(),
        )
    }

    #[test]
    fn test_overdue_dominates() {
        let mut job = Job::new("J1", "J1", ProductType::Fab, Points::from_whole(10));
        job.due_date = Some(d(2026, 7, 24));
        let result = scorer().score(&job, d(2026, 8, 3));
        assert_eq!(result.score, 100); // 10 日历日 × 10
        assert!(result.factors[0].contains("OVERDUE"));
    }

    #[test]
    fn test_near_due_bonus() {
        let mut job = Job::new("J1", "J1", ProductType::Fab, Points::from_whole(10));
        job.due_date = Some(d(2026, 8, 7));
        let result = scorer().score(&job, d(2026, 8, 3));
        assert_eq!(result.score, 50);
    }

    #[test]
    fn test_big_rock_bonus() {
        let mut job = Job::new("J1", "J1", ProductType::Fab, Points::from_whole(80));
        job.due_date = Some(d(2026, 10, 1));
        let result = scorer().score(&job, d(2026, 8, 3));
        assert_eq!(result.score, 15);
        assert!(result.factors[0].contains("BIG_ROCK"));
    }

    #[test]
    fn test_quiet_job_scores_zero() {
        let mut job = Job::new("J1", "J1", ProductType::Fab, Points::from_whole(10));
        job.due_date = Some(d(2026, 10, 1));
        let result = scorer().score(&job, d(2026, 8, 3));
        assert_eq!(result.score, 0);
        assert_eq!(result.factors, vec!["no urgency factors".to_string()]);
    }
}
