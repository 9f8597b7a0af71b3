// ==========================================
// 定制钣金排产系统 - 批次分类引擎
// ==========================================
// 职责: 描述文本 → 批次类别 + 板厚/材质特征,
//       小件作业按批次同组排队以吃到批次折扣
// 红线: 纯函数分类, 与排产控制流解耦
// ==========================================

use crate::calendar::{WeekKey, WorkCalendar};
use crate::domain::job::Job;
use crate::domain::types::BatchCategory;
use crate::domain::units::Points;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

static FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bframes?\b").expect("FRAME_RE 应能编译"));
static KNOCKDOWN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:knock ?downs?|kd)\b").expect("KNOCKDOWN_RE 应能编译"));
static CASE_OPENING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcase ?openings?\b").expect("CASE_OPENING_RE 应能编译"));
static DOOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdoors?\b").expect("DOOR_RE 应能编译"));
static LOCKSEAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\block ?seams?\b").expect("LOCKSEAM_RE 应能编译"));
static GAUGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b(\d{1,2}) ?ga\b|#(\d{1,2})\b)").expect("GAUGE_RE 应能编译")
});
static STAINLESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\bss ?(\d{3})\b|\bstainless(?: steel)?(?: (\d{3}))?\b)")
        .expect("STAINLESS_RE 应能编译")
});
static GALV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bgalv\w*\b").expect("GALV_RE 应能编译"));
static ALUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\balum\w*\b").expect("ALUM_RE 应能编译"));
static CRS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bcrs\b").expect("CRS_RE 应能编译"));
static HRS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhrs\b").expect("HRS_RE 应能编译"));
static STEEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsteel\b").expect("STEEL_RE 应能编译"));

// ==========================================
// BatchSignature - 批次特征
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSignature {
    pub category: BatchCategory,
    /// 板厚标记, 如 "16ga"
    pub gauge: Option<String>,
    /// 材质标记, 如 "SS304" / "GALV"
    pub material: Option<String>,
}

impl BatchSignature {
    /// 板厚与材质齐备才能参与严格批次
    pub fn is_strict(&self) -> bool {
        self.gauge.is_some() && self.material.is_some()
    }
}

/// 批次紧密度 (排序时严格组优先于宽松组, 散件殿后)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strictness {
    Strict,
    Relaxed,
    Singleton,
}

// ==========================================
// BatchCohort - 批次同组
// ==========================================
#[derive(Debug, Clone)]
pub struct BatchCohort {
    pub category: Option<BatchCategory>,
    pub strictness: Strictness,
    pub due_week: Option<WeekKey>,
    pub jobs: Vec<Job>,
}

/// 排序后的排队条目: 作业 + 同组规模 (工期折扣依据)
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job: Job,
    pub cohort_size: usize,
}

// ==========================================
// BatchClassifier - 批次分类引擎
// ==========================================
pub struct BatchClassifier {
    // 无状态引擎, 不需要注入依赖
}

impl BatchClassifier {
    pub fn new() -> Self {
        Self {}
    }

    /// 规范化描述: 小写, 分隔符与连续空白折叠为单空格
    pub fn normalize(text: &str) -> String {
        let lowered = text.to_lowercase();
        let replaced: String = lowered
            .chars()
            .map(|c| match c {
                '-' | '_' | '/' | '\\' | '.' | ',' | ';' | ':' | '(' | ')' => ' ',
                _ => c,
            })
            .collect();
        replaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 描述 → 批次特征 (三类模式族, 未命中返回 None)
    pub fn classify(&self, description: &str) -> Option<BatchSignature> {
        let normalized = Self::normalize(description);
        let category = if FRAME_RE.is_match(&normalized) && KNOCKDOWN_RE.is_match(&normalized) {
            BatchCategory::FrameKnockdown
        } else if FRAME_RE.is_match(&normalized) && CASE_OPENING_RE.is_match(&normalized) {
            BatchCategory::FrameCaseOpening
        } else if DOOR_RE.is_match(&normalized) && LOCKSEAM_RE.is_match(&normalized) {
            BatchCategory::DoorLockSeam
        } else {
            return None;
        };

        Some(BatchSignature {
            category,
            gauge: Self::extract_gauge(&normalized),
            material: Self::extract_material(&normalized),
        })
    }

    /// 提取板厚标记: "16ga" / "#16" → "16ga"
    pub fn extract_gauge(normalized: &str) -> Option<String> {
        GAUGE_RE.captures(normalized).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| format!("{}ga", m.as_str()))
        })
    }

    /// 提取材质标记 (不锈钢牌号优先于泛化 steel)
    pub fn extract_material(normalized: &str) -> Option<String> {
        if let Some(caps) = STAINLESS_RE.captures(normalized) {
            let grade = caps.get(1).or_else(|| caps.get(2));
            return Some(match grade {
                Some(g) => format!("SS{}", g.as_str()),
                None => "SS".to_string(),
            });
        }
        if GALV_RE.is_match(normalized) {
            return Some("GALV".to_string());
        }
        if ALUM_RE.is_match(normalized) {
            return Some("ALUM".to_string());
        }
        if CRS_RE.is_match(normalized) {
            return Some("CRS".to_string());
        }
        if HRS_RE.is_match(normalized) {
            return Some("HRS".to_string());
        }
        if STEEL_RE.is_match(normalized) {
            return Some("STEEL".to_string());
        }
        None
    }

    /// 分组: 严格批次 (类别+板厚+材质+交付周) / 宽松批次 (类别+交付周) / 散件
    pub fn group(&self, jobs: Vec<Job>, calendar: &WorkCalendar) -> Vec<BatchCohort> {
        // 严格键与宽松键各自聚簇, BTreeMap 保证遍历顺序确定
        let mut strict: BTreeMap<(BatchCategory, String, String, WeekKey), Vec<Job>> =
            BTreeMap::new();
        let mut relaxed: BTreeMap<(BatchCategory, WeekKey), Vec<Job>> = BTreeMap::new();
        let mut singletons: Vec<Job> = Vec::new();

        for job in jobs {
            let due_week = job.due_date.map(|d| calendar.week_key(d));
            let signature = self.classify(&job.description);
            match (signature, due_week) {
                (Some(sig), Some(week)) if sig.is_strict() => {
                    let key = (
                        sig.category,
                        sig.gauge.clone().unwrap_or_default(),
                        sig.material.clone().unwrap_or_default(),
                        week,
                    );
                    strict.entry(key).or_default().push(job);
                }
                (Some(sig), Some(week)) => {
                    relaxed.entry((sig.category, week)).or_default().push(job);
                }
                _ => singletons.push(job),
            }
        }

        let mut cohorts: Vec<BatchCohort> = Vec::new();
        for ((category, _, _, week), mut members) in strict {
            sort_members(&mut members);
            cohorts.push(BatchCohort {
                category: Some(category),
                strictness: Strictness::Strict,
                due_week: Some(week),
                jobs: members,
            });
        }
        for ((category, week), mut members) in relaxed {
            sort_members(&mut members);
            cohorts.push(BatchCohort {
                category: Some(category),
                strictness: Strictness::Relaxed,
                due_week: Some(week),
                jobs: members,
            });
        }
        for job in singletons {
            let due_week = job.due_date.map(|d| calendar.week_key(d));
            cohorts.push(BatchCohort {
                category: None,
                strictness: Strictness::Singleton,
                due_week,
                jobs: vec![job],
            });
        }
        cohorts
    }

    /// 分组 + 排序 + 摊平为排产优先序列
    ///
    /// 组间排序键: 交付周升序 → 组内最早交期升序 → 严格先于宽松先于散件
    ///           → 最高紧急评分降序 → 最大点数降序 → 首作业号 (稳定性兜底)
    pub fn order_for_scheduling(&self, jobs: Vec<Job>, calendar: &WorkCalendar) -> Vec<QueuedJob> {
        let mut cohorts = self.group(jobs, calendar);
        cohorts.sort_by(compare_cohorts);

        let mut queue = Vec::new();
        for cohort in cohorts {
            let cohort_size = cohort.jobs.len();
            for job in cohort.jobs {
                queue.push(QueuedJob { job, cohort_size });
            }
        }
        queue
    }
}

impl Default for BatchClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// 组内成员排序: 交期升序 → 点数降序 → 作业号
fn sort_members(members: &mut [Job]) {
    members.sort_by(|a, b| {
        let due_a = a.due_date.unwrap_or(NaiveDate::MAX);
        let due_b = b.due_date.unwrap_or(NaiveDate::MAX);
        due_a
            .cmp(&due_b)
            .then_with(|| b.welding_points.cmp(&a.welding_points))
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
}

fn compare_cohorts(a: &BatchCohort, b: &BatchCohort) -> Ordering {
    // 1. 交付周升序 (缺交付周的散件殿后)
    let week_a = a.due_week.unwrap_or(WeekKey {
        iso_year: i32::MAX,
        iso_week: u32::MAX,
    });
    let week_b = b.due_week.unwrap_or(WeekKey {
        iso_year: i32::MAX,
        iso_week: u32::MAX,
    });
    week_a
        .cmp(&week_b)
        // 2. 组内最早交期升序
        .then_with(|| earliest_due(a).cmp(&earliest_due(b)))
        // 3. 严格 < 宽松 < 散件
        .then_with(|| a.strictness.cmp(&b.strictness))
        // 4. 最高紧急评分降序
        .then_with(|| max_urgency(b).cmp(&max_urgency(a)))
        // 5. 最大点数降序
        .then_with(|| max_points(b).cmp(&max_points(a)))
        // 6. 首作业号兜底, 保证全序
        .then_with(|| first_job_id(a).cmp(first_job_id(b)))
}

fn earliest_due(cohort: &BatchCohort) -> NaiveDate {
    cohort
        .jobs
        .iter()
        .filter_map(|j| j.due_date)
        .min()
        .unwrap_or(NaiveDate::MAX)
}

fn max_urgency(cohort: &BatchCohort) -> i64 {
    cohort
        .jobs
        .iter()
        .map(|j| j.urgency_score.unwrap_or(0))
        .max()
        .unwrap_or(0)
}

fn max_points(cohort: &BatchCohort) -> Points {
    cohort
        .jobs
        .iter()
        .map(|j| j.welding_points)
        .max()
        .unwrap_or(Points::ZERO)
}

fn first_job_id(cohort: &BatchCohort) -> &str {
    cohort.jobs.first().map(|j| j.job_id.as_str()).unwrap_or("")
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ProductType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn job(id: &str, description: &str, due: NaiveDate, points: i64) -> Job {
        let mut job = Job::new(id, id, ProductType::Fab, Points::from_whole(points));
        job.description = description.to_string();
        job.due_date = Some(due);
        job
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            BatchClassifier::normalize("  Knock-Down FRAME,16ga/SS304 "),
            "knock down frame 16ga ss304"
        );
    }

    #[test]
    fn test_classify_categories() {
        let classifier = BatchClassifier::new();
        assert_eq!(
            classifier.classify("knock down frames 16ga galv").unwrap().category,
            BatchCategory::FrameKnockdown
        );
        assert_eq!(
            classifier.classify("KD frame #14 CRS").unwrap().category,
            BatchCategory::FrameKnockdown
        );
        assert_eq!(
            classifier
                .classify("case opening frame 12ga")
                .unwrap()
                .category,
            BatchCategory::FrameCaseOpening
        );
        assert_eq!(
            classifier
                .classify("lock seam doors 18ga SS316")
                .unwrap()
                .category,
            BatchCategory::DoorLockSeam
        );
        assert!(classifier.classify("louver panel assembly").is_none());
        // door 无 lock seam 不算锁缝批次
        assert!(classifier.classify("flood door 36x80").is_none());
    }

    #[test]
    fn test_gauge_extraction() {
        assert_eq!(
            BatchClassifier::extract_gauge("kd frame 16ga ss304"),
            Some("16ga".to_string())
        );
        assert_eq!(
            BatchClassifier::extract_gauge("kd frame 16 ga"),
            Some("16ga".to_string())
        );
        assert_eq!(
            BatchClassifier::extract_gauge("kd frame #12 galv"),
            Some("12ga".to_string())
        );
        assert_eq!(BatchClassifier::extract_gauge("kd frame heavy"), None);
    }

    #[test]
    fn test_material_extraction() {
        assert_eq!(
            BatchClassifier::extract_material("ss304 frame"),
            Some("SS304".to_string())
        );
        assert_eq!(
            BatchClassifier::extract_material("stainless steel 316 door"),
            Some("SS316".to_string())
        );
        assert_eq!(
            BatchClassifier::extract_material("stainless door"),
            Some("SS".to_string())
        );
        assert_eq!(
            BatchClassifier::extract_material("galvanized frame"),
            Some("GALV".to_string())
        );
        assert_eq!(
            BatchClassifier::extract_material("aluminum louver"),
            Some("ALUM".to_string())
        );
        assert_eq!(
            BatchClassifier::extract_material("crs frame"),
            Some("CRS".to_string())
        );
        // stainless steel 优先于泛化 steel
        assert_eq!(
            BatchClassifier::extract_material("plain steel frame"),
            Some("STEEL".to_string())
        );
        assert_eq!(BatchClassifier::extract_material("copper trim"), None);
    }

    #[test]
    fn test_strict_cohort_same_week() {
        let classifier = BatchClassifier::new();
        let cal = WorkCalendar::standard();
        // 同周同板厚同材质 → 同一严格组
        let jobs = vec![
            job("J1", "lock seam door 16ga SS304", d(2026, 8, 12), 20),
            job("J3", "louver misc", d(2026, 8, 11), 10),
            job("J2", "lockseam doors 16ga ss304", d(2026, 8, 13), 15),
        ];
        let queue = classifier.order_for_scheduling(jobs, &cal);
        let ids: Vec<&str> = queue.iter().map(|q| q.job.job_id.as_str()).collect();
        // J1/J2 相邻且组规模为 2
        let pos1 = ids.iter().position(|id| *id == "J1").unwrap();
        let pos2 = ids.iter().position(|id| *id == "J2").unwrap();
        assert_eq!(pos1.abs_diff(pos2), 1);
        assert_eq!(queue[pos1].cohort_size, 2);
        assert_eq!(queue[pos2].cohort_size, 2);
        // 散件组规模为 1
        let pos3 = ids.iter().position(|id| *id == "J3").unwrap();
        assert_eq!(queue[pos3].cohort_size, 1);
    }

    #[test]
    fn test_relaxed_when_tokens_missing() {
        let classifier = BatchClassifier::new();
        let cal = WorkCalendar::standard();
        let jobs = vec![
            job("J1", "kd frame 16ga", d(2026, 8, 12), 20), // 缺材质
            job("J2", "knock down frame galv", d(2026, 8, 13), 15), // 缺板厚
        ];
        let cohorts = classifier.group(jobs, &cal);
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].strictness, Strictness::Relaxed);
        assert_eq!(cohorts[0].jobs.len(), 2);
    }

    #[test]
    fn test_different_week_splits_cohort() {
        let classifier = BatchClassifier::new();
        let cal = WorkCalendar::standard();
        let jobs = vec![
            job("J1", "lock seam door 16ga SS304", d(2026, 8, 12), 20),
            job("J2", "lock seam door 16ga SS304", d(2026, 8, 19), 20), // 下一周
        ];
        let cohorts = classifier.group(jobs, &cal);
        assert_eq!(cohorts.len(), 2);
        assert!(cohorts.iter().all(|c| c.jobs.len() == 1));
    }

    #[test]
    fn test_ordering_by_week_then_strictness() {
        let classifier = BatchClassifier::new();
        let cal = WorkCalendar::standard();
        let jobs = vec![
            // 下周的严格组
            job("L1", "lock seam door 16ga SS304", d(2026, 8, 19), 20),
            job("L2", "lock seam door 16ga SS304", d(2026, 8, 20), 20),
            // 本周的宽松组
            job("R1", "kd frame 16ga", d(2026, 8, 12), 10),
            // 本周的严格组
            job("S1", "kd frame 14ga galv", d(2026, 8, 12), 10),
            job("S2", "kd frame 14ga galv", d(2026, 8, 13), 10),
        ];
        let queue = classifier.order_for_scheduling(jobs, &cal);
        let ids: Vec<&str> = queue.iter().map(|q| q.job.job_id.as_str()).collect();
        // 本周在前; 同周同最早交期下严格组优先于宽松组
        assert_eq!(ids, vec!["S1", "S2", "R1", "L1", "L2"]);
    }
}
