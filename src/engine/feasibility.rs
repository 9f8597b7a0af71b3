// ==========================================
// 定制钣金排产系统 - 报价可行性分析
// ==========================================
// 职责: 三档 "能否承接" 模拟
//       第一档 现状 / 第二档 推移低风险作业 / 第三档 加班档位
// 输入: 报价 (金额→点数) + 既有承诺作业
// 输出: 建议 (ACCEPT/…/DECLINE) + 受限部门与日期
// ==========================================

use crate::calendar::{WeekKey, WorkCalendar};
use crate::config::PipelineConfig;
use crate::domain::job::Job;
use crate::domain::quote::{
    Bottleneck, DepartmentSlot, FeasibilityReport, MovedJob, OvertimeOutcome, QuoteEstimate,
    QuoteInput, TierOutcome,
};
use crate::domain::types::{Department, ProductType, Recommendation, SizeTier, PIPELINE};
use crate::domain::units::{ceil_div_i128, Points};
use crate::engine::duration::{DurationCalculator, DurationRequest};
use crate::engine::error::EngineError;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

type OutlookKey = (Department, usize, WeekKey);

// ==========================================
// CapacityOutlook - 周粒度产能展望
// ==========================================
// 既有作业点数均摊到其窗口工作日, 再按 (部门, 池, ISO周) 聚桶
#[derive(Debug, Clone, Default)]
struct CapacityOutlook {
    committed: BTreeMap<OutlookKey, Points>,
}

impl CapacityOutlook {
    fn load(&self, key: &OutlookKey) -> Points {
        self.committed.get(key).copied().unwrap_or(Points::ZERO)
    }
}

// ==========================================
// FeasibilityAnalyzer - 可行性分析引擎
// ==========================================
pub struct FeasibilityAnalyzer {
    config: Arc<PipelineConfig>,
    calendar: WorkCalendar,
    duration: DurationCalculator,
}

impl FeasibilityAnalyzer {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let calendar = WorkCalendar::new(config.saturday_overtime);
        let duration = DurationCalculator::new(config.clone());
        Self {
            config,
            calendar,
            duration,
        }
    }

    // ==========================================
    // 对外接口
    // ==========================================

    /// 报价试排 (第一档口径, 不判目标)
    pub fn simulate_quote_schedule(
        &self,
        quote: &QuoteInput,
        committed: &[Job],
    ) -> Result<QuoteEstimate, EngineError> {
        let points = self.quote_points(quote)?;
        let outlook = self.build_outlook(committed, &[]);
        let outcome = self.place_quote(quote, points, &outlook, Points::ZERO, None);
        Ok(QuoteEstimate {
            quote_id: Uuid::new_v4().to_string(),
            quote_name: quote.quote_name.clone(),
            points,
            department_plan: outcome.department_plan,
            projected_completion: outcome.projected_completion,
            bottlenecks: outcome.bottlenecks,
        })
    }

    /// 三档可行性检查
    ///
    /// 第一档 现状试排; 第二档 推移两道最早工序中富余 ≥7 工作日的
    /// 既有作业再试; 第三档 仅当无部门已结构性超载时, 由低到高试
    /// 四个加班档位。建议取第一个可达档
    #[instrument(skip(self, quote, committed), fields(quote = %quote.quote_name))]
    pub fn check_feasibility(
        &self,
        quote: &QuoteInput,
        committed: &[Job],
    ) -> Result<FeasibilityReport, EngineError> {
        let target = quote
            .target_date
            .ok_or_else(|| EngineError::MissingTargetDate(quote.quote_name.clone()))?;
        let points = self.quote_points(quote)?;

        // 第一档: 现状
        let outlook = self.build_outlook(committed, &[]);
        let as_is = self.place_quote(quote, points, &outlook, Points::ZERO, Some(target));
        if as_is.achievable {
            let rationale = self.accept_rationale(&as_is, target);
            return Ok(self.report(quote, points, target, Recommendation::Accept, rationale, as_is, None, None));
        }

        // 第二档: 推移低风险既有作业
        let (moved_outlook, moved_jobs) = self.outlook_with_moves(committed);
        let with_moves = (!moved_jobs.is_empty()).then(|| {
            self.place_quote(quote, points, &moved_outlook, Points::ZERO, Some(target))
        });
        if let Some(outcome) = &with_moves {
            if outcome.achievable {
                let rationale = format!(
                    "ACCEPT_WITH_MOVES: pushing {} low-risk jobs back {} workdays frees capacity; {}",
                    moved_jobs.len(),
                    self.config.reschedule_push_days,
                    self.completion_phrase(outcome)
                );
                let with_moves = with_moves.map(|o| (o, moved_jobs));
                return Ok(self.report(
                    quote,
                    points,
                    target,
                    Recommendation::AcceptWithMoves,
                    rationale,
                    as_is,
                    with_moves,
                    None,
                ));
            }
        }

        // 第三档: 加班档位 (结构性超载时加班救不回来, 直接跳过)
        let mut with_overtime: Option<OvertimeOutcome> = None;
        if !self.structurally_overloaded(&outlook, quote, target) {
            for tier in &self.config.overtime_tiers {
                let outcome =
                    self.place_quote(quote, points, &outlook, tier.weekly_bonus, Some(target));
                let achieved = outcome.achievable;
                with_overtime = Some(OvertimeOutcome {
                    tier_name: tier.name.clone(),
                    weekly_bonus: tier.weekly_bonus,
                    labor_note: tier.labor_note.clone(),
                    outcome,
                });
                if achieved {
                    break;
                }
            }
        }
        if let Some(overtime) = &with_overtime {
            if overtime.outcome.achievable {
                let rationale = format!(
                    "ACCEPT_WITH_OT: tier {} (+{} pts/week, {}) {}",
                    overtime.tier_name,
                    overtime.weekly_bonus,
                    overtime.labor_note,
                    self.completion_phrase(&overtime.outcome)
                );
                let with_moves = with_moves.map(|o| (o, moved_jobs));
                return Ok(self.report(
                    quote,
                    points,
                    target,
                    Recommendation::AcceptWithOvertime,
                    rationale,
                    as_is,
                    with_moves,
                    with_overtime,
                ));
            }
        }

        let rationale = self.decline_rationale(&as_is, target);
        let with_moves = with_moves.map(|o| (o, moved_jobs));
        Ok(self.report(
            quote,
            points,
            target,
            Recommendation::Decline,
            rationale,
            as_is,
            with_moves,
            with_overtime,
        ))
    }

    // ==========================================
    // 点数换算
    // ==========================================

    /// 金额 → 点数 (按产品族换算率)
    pub fn quote_points(&self, quote: &QuoteInput) -> Result<Points, EngineError> {
        if quote.dollar_value_cents <= 0 {
            return Err(EngineError::InvalidQuoteValue {
                quote: quote.quote_name.clone(),
                message: format!("dollar_value_cents={}", quote.dollar_value_cents),
            });
        }
        let rate = self
            .config
            .point_conversion
            .cents_per_point(quote.product_type)
            .max(1);
        Ok(Points::from_centi(ceil_div_i128(
            quote.dollar_value_cents as i128 * 100,
            rate as i128,
        )))
    }

    /// 规模档位: 有大石块拆分时看最大子作业, 否则看总点数
    fn quote_tier(&self, quote: &QuoteInput, points: Points) -> SizeTier {
        let sizing = quote
            .big_rock_breakdown
            .as_ref()
            .and_then(|parts| parts.iter().copied().max())
            .unwrap_or(points);
        self.config.size_tier(sizing)
    }

    // ==========================================
    // 产能展望构建
    // ==========================================

    /// 回放既有作业到周粒度展望; moved 中的作业整体后移
    fn build_outlook(&self, committed: &[Job], moved: &[String]) -> CapacityOutlook {
        let push = self.config.reschedule_push_days;
        let mut outlook = CapacityOutlook::default();
        for job in committed {
            if job.completed || !job.has_schedule() {
                continue;
            }
            let shifted = moved.contains(&job.job_id);
            for (department, window) in &job.department_schedule {
                let dept_config = self.config.department(*department);
                let (pool_index, _) = dept_config.pool_for(job.product_type);
                let mut start = self.calendar.normalize_forward(window.start);
                let days = self.calendar.workdays_between(start, window.end).max(0) + 1;
                if shifted {
                    start = self.calendar.add_workdays(start, push);
                }
                let dates = self.calendar.workdays_in_span(start, days);
                let loads = job.welding_points.spread_over_days(dates.len());
                for (date, load) in dates.iter().zip(loads.iter()) {
                    let key = (*department, pool_index, self.calendar.week_key(*date));
                    *outlook.committed.entry(key).or_insert(Points::ZERO) += *load;
                }
            }
        }
        outlook
    }

    /// 第二档候选: 两道最早工序中, 完工相对交期富余 ≥ 阈值的作业
    fn outlook_with_moves(&self, committed: &[Job]) -> (CapacityOutlook, Vec<MovedJob>) {
        let early_departments = [PIPELINE[0], PIPELINE[1]];
        let mut moved = Vec::new();
        for job in committed {
            if job.completed || !job.has_schedule() {
                continue;
            }
            if !early_departments.contains(&job.current_department) {
                continue;
            }
            let (end, due) = match (job.schedule_end(), job.due_date) {
                (Some(end), Some(due)) => (end, due),
                _ => continue,
            };
            let slack = self.calendar.workdays_between(end, due);
            if slack >= self.config.reschedule_slack_days {
                moved.push(MovedJob {
                    job_id: job.job_id.clone(),
                    slack_days: slack,
                    pushed_back_days: self.config.reschedule_push_days,
                });
            }
        }
        let moved_ids: Vec<String> = moved.iter().map(|m| m.job_id.clone()).collect();
        (self.build_outlook(committed, &moved_ids), moved)
    }

    /// 结构性超载判定: 相关周区间内任一池的既有负载已超基础周产能
    fn structurally_overloaded(
        &self,
        outlook: &CapacityOutlook,
        quote: &QuoteInput,
        target: NaiveDate,
    ) -> bool {
        let from_week = self.calendar.week_key(quote.engineering_ready);
        // 目标后留 4 周观察窗
        let horizon = self
            .calendar
            .add_workdays(self.calendar.normalize_forward(target), 20);
        let to_week = self.calendar.week_key(horizon);

        outlook.committed.iter().any(|((dept, pool_index, week), load)| {
            if *week < from_week || *week > to_week {
                return false;
            }
            let capacity = self.config.department(*dept).pools[*pool_index].weekly_capacity();
            *load > capacity
        })
    }

    // ==========================================
    // 试排核心
    // ==========================================

    /// 顺流水线为报价寻找各部门最早可排窗口
    ///
    /// 流水线重叠: 下游最早开工 = 上游开工 + ceil(上游工期×30%) + 规模间隔;
    /// 产能判定走周粒度: 窗口各周的 (既有负载 + 报价摊入) ≤ 池周产能 + 加班加成
    fn place_quote(
        &self,
        quote: &QuoteInput,
        points: Points,
        outlook: &CapacityOutlook,
        overtime_bonus: Points,
        target: Option<NaiveDate>,
    ) -> TierOutcome {
        let tier = self.quote_tier(quote, points);
        let gap_days = (tier.gap_half_days() + 1) / 2;
        let overlap_pct = self.config.pipeline_overlap_pct;

        let ready = self
            .calendar
            .normalize_forward(quote.engineering_ready);
        let ready_ordinal = self.calendar.workday_ordinal(ready);

        let mut plan: Vec<DepartmentSlot> = Vec::new();
        let mut bottlenecks: Vec<Bottleneck> = Vec::new();
        let mut previous: Option<(i64, i64)> = None; // (开工序数, 占用天数)

        for department in PIPELINE {
            let request = DurationRequest {
                department,
                points,
                product_type: quote.product_type,
                description: &quote.description,
                job_name: &quote.quote_name,
                customer: quote.customer.as_deref(),
                requires_painting: quote.requires_painting,
                batch_size: 1,
                quantity: quote.quantity,
            };
            let duration = self.duration.duration(&request);
            let days = duration.days_spanned();

            let earliest = match previous {
                None => ready_ordinal,
                Some((prev_start, prev_days)) => {
                    prev_start
                        + ceil_div_i128(prev_days as i128 * overlap_pct as i128, 100)
                        + gap_days
                }
            };

            let granted = self.earliest_fitting_start(
                department,
                quote.product_type,
                earliest,
                days,
                points,
                outlook,
                overtime_bonus,
            );

            let granted = match granted {
                Some(ordinal) => ordinal,
                None => {
                    // 视野内无可排位置: 该部门即为瓶颈, 试排中止
                    bottlenecks.push(Bottleneck {
                        department,
                        requested_start: self.calendar.date_from_ordinal(earliest),
                        granted_start: self
                            .calendar
                            .date_from_ordinal(earliest + self.config.feasibility_horizon_days),
                    });
                    return TierOutcome {
                        achievable: false,
                        projected_completion: None,
                        department_plan: plan,
                        bottlenecks,
                    };
                }
            };

            if granted > earliest {
                bottlenecks.push(Bottleneck {
                    department,
                    requested_start: self.calendar.date_from_ordinal(earliest),
                    granted_start: self.calendar.date_from_ordinal(granted),
                });
            }

            let start = self.calendar.date_from_ordinal(granted);
            let end = self.calendar.date_from_ordinal(granted + days - 1);
            debug!(department = %department, %start, %end, "报价试排落位");
            plan.push(DepartmentSlot {
                department,
                start,
                end,
                duration,
            });
            previous = Some((granted, days));
        }

        let completion = plan.last().map(|slot| slot.end);
        let achievable = match (completion, target) {
            (Some(done), Some(target)) => done <= target,
            (Some(_), None) => true,
            (None, _) => false,
        };
        TierOutcome {
            achievable,
            projected_completion: completion,
            department_plan: plan,
            bottlenecks,
        }
    }

    /// 自 earliest 起逐工作日推进, 找到首个各周都有余量的开工序数
    #[allow(clippy::too_many_arguments)]
    fn earliest_fitting_start(
        &self,
        department: Department,
        product: ProductType,
        earliest: i64,
        days: i64,
        points: Points,
        outlook: &CapacityOutlook,
        overtime_bonus: Points,
    ) -> Option<i64> {
        let dept_config = self.config.department(department);
        let (pool_index, pool) = dept_config.pool_for(product);
        let capacity = pool.weekly_capacity() + overtime_bonus;

        for offset in 0..self.config.feasibility_horizon_days {
            let start_ordinal = earliest + offset;
            let dates: Vec<NaiveDate> = (0..days)
                .map(|i| self.calendar.date_from_ordinal(start_ordinal + i))
                .collect();
            let loads = points.spread_over_days(dates.len());

            let mut week_loads: BTreeMap<WeekKey, Points> = BTreeMap::new();
            for (date, load) in dates.iter().zip(loads.iter()) {
                *week_loads
                    .entry(self.calendar.week_key(*date))
                    .or_insert(Points::ZERO) += *load;
            }

            let fits = week_loads.iter().all(|(week, load)| {
                outlook.load(&(department, pool_index, *week)) + *load <= capacity
            });
            if fits {
                return Some(start_ordinal);
            }
        }
        None
    }

    // ==========================================
    // 结论措辞
    // ==========================================

    fn completion_phrase(&self, outcome: &TierOutcome) -> String {
        match outcome.projected_completion {
            Some(done) => format!("projected completion {}", done),
            None => "no completion within horizon".to_string(),
        }
    }

    fn accept_rationale(&self, outcome: &TierOutcome, target: NaiveDate) -> String {
        let mut rationale = format!(
            "ACCEPT: {} meets target {}",
            self.completion_phrase(outcome),
            target
        );
        if let Some(bottleneck) = outcome.bottlenecks.first() {
            rationale.push_str(&format!(
                "; {} pushed start from {} to {}",
                bottleneck.department, bottleneck.requested_start, bottleneck.granted_start
            ));
        }
        rationale
    }

    fn decline_rationale(&self, as_is: &TierOutcome, target: NaiveDate) -> String {
        let limiting = as_is
            .bottlenecks
            .first()
            .map(|b| {
                format!(
                    "limited by {} (earliest start {})",
                    b.department, b.granted_start
                )
            })
            .unwrap_or_else(|| "limited by end-to-end lead time".to_string());
        format!(
            "DECLINE: {}; {} vs target {}",
            limiting,
            self.completion_phrase(as_is),
            target
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        quote: &QuoteInput,
        points: Points,
        target: NaiveDate,
        recommendation: Recommendation,
        rationale: String,
        as_is: TierOutcome,
        with_moves: Option<(TierOutcome, Vec<MovedJob>)>,
        with_overtime: Option<OvertimeOutcome>,
    ) -> FeasibilityReport {
        FeasibilityReport {
            quote_id: Uuid::new_v4().to_string(),
            quote_name: quote.quote_name.clone(),
            points,
            target_date: target,
            recommendation,
            rationale,
            as_is,
            with_moves,
            with_overtime,
        }
    }
}
