// ==========================================
// 定制钣金排产系统 - 门类焊接子流水线
// ==========================================
// 职责: 按樘数推算门类作业在焊接部门的分段工期
// 输入: 门子类型 + 樘数 + 吞吐表
// 输出: 分段工期 (压机/机器人/管框/满焊) + 总工期
// ==========================================

use crate::config::DoorFlowConfig;
use crate::domain::types::DoorSubtype;
use crate::domain::units::{ceil_div_i128, HalfDays};
use once_cell::sync::Lazy;
use regex::Regex;

static NYCHA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bnycha\b").expect("NYCHA_RE 应能编译"));
static FLOOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bflood\b").expect("FLOOD_RE 应能编译"));
static LOCKSEAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\block ?seam\b").expect("LOCKSEAM_RE 应能编译"));
static DOOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdoors?\b").expect("DOOR_RE 应能编译"));
static FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bframes?\b").expect("FRAME_RE 应能编译"));

/// 门扇作业判定: 描述含 door 且不含 frame
pub fn is_door_leaf(description: &str) -> bool {
    let description = description.to_lowercase();
    DOOR_RE.is_match(&description) && !FRAME_RE.is_match(&description)
}

/// 按描述/作业名分类门子类型
///
/// 优先级: NYCHA > 防汛门 > 锁缝门 > 无缝门 (默认)
pub fn classify_door(description: &str, job_name: &str) -> DoorSubtype {
    let description = description.to_lowercase();
    let job_name = job_name.to_lowercase();
    if NYCHA_RE.is_match(&description) || NYCHA_RE.is_match(&job_name) {
        DoorSubtype::Nycha
    } else if FLOOD_RE.is_match(&description) {
        DoorSubtype::Flood
    } else if LOCKSEAM_RE.is_match(&description) {
        DoorSubtype::StandardLockseam
    } else {
        DoorSubtype::StandardSeamless
    }
}

// ==========================================
// DoorWeldingPlan - 子流水线分段工期
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorWeldingPlan {
    pub subtype: DoorSubtype,
    /// 压机段 (锁缝门为溢出班组段); 舍入余量计入此段
    pub press: HalfDays,
    /// 机器人段 (仅无缝门)
    pub robot: HalfDays,
    /// 管框段 (仅防汛门)
    pub tube_frame: HalfDays,
    /// 满焊段 (仅防汛门)
    pub full_weld: HalfDays,
    pub total: HalfDays,
}

/// 推算门类作业的焊接子流水线工期
///
/// 规则:
/// - 锁缝门: 溢出班组承接, 不走机器人, total = qty ÷ 班组日产出
/// - 无缝门: 压机段 + 机器人段顺序执行
/// - 防汛门: 管框 → 压机 → 满焊, 压机在管框出件 0.5 天后即可启动,
///   total = max(管框, 压机 + 0.5) + 满焊, 最终一次性向上取整到半日
/// - NYCHA: 不走子流水线, 由工期计算器按 3 天下限处理 (返回 None)
/// - 门扇作业 total 不低于 leaf_min, 余量补入压机段
pub fn welding_plan(
    config: &DoorFlowConfig,
    subtype: DoorSubtype,
    quantity: u32,
    is_leaf: bool,
) -> Option<DoorWeldingPlan> {
    let qty = quantity.max(1) as i128;

    let mut plan = match subtype {
        DoorSubtype::Nycha => return None,
        DoorSubtype::StandardLockseam => {
            let press = HalfDays::from_halves(ceil_div_i128(
                qty * 2,
                config.lockseam_doors_per_day as i128,
            ));
            DoorWeldingPlan {
                subtype,
                press,
                robot: HalfDays::ZERO,
                tube_frame: HalfDays::ZERO,
                full_weld: HalfDays::ZERO,
                total: press,
            }
        }
        DoorSubtype::StandardSeamless => {
            let press = HalfDays::from_halves(ceil_div_i128(
                qty * 2,
                config.press_doors_per_day as i128,
            ));
            let robot = HalfDays::from_halves(ceil_div_i128(
                qty * 2,
                config.robot_doors_per_day as i128,
            ));
            DoorWeldingPlan {
                subtype,
                press,
                robot,
                tube_frame: HalfDays::ZERO,
                full_weld: HalfDays::ZERO,
                total: press + robot,
            }
        }
        DoorSubtype::Flood => flood_plan(config, qty),
    };

    // 门扇作业下限, 余量补入压机段
    if is_leaf && plan.total < config.leaf_min {
        let shortfall = config.leaf_min - plan.total;
        plan.press = plan.press + shortfall;
        plan.total = config.leaf_min;
    }

    Some(plan)
}

/// 防汛门三段子流水线
///
/// 分数日算术走公分母整数比较, 仅在末尾取整一次,
/// 避免逐段取整放大工期
fn flood_plan(config: &DoorFlowConfig, qty: i128) -> DoorWeldingPlan {
    let flood = &config.flood;
    let tf_rate = flood.tube_frame_per_day as i128;
    let pr_rate = flood.press_per_day as i128;
    let fw_rate = flood.full_weld_per_day as i128;
    let startup = flood.press_startup.halves() as i128;

    // 公分母: 2 × tf × pr × fw (系数 2 承载半日粒度)
    let denom = 2 * tf_rate * pr_rate * fw_rate;
    let tube_frame_num = qty * 2 * pr_rate * fw_rate;
    // 压机段含启动延迟: qty/pr + startup/2 (半日换算)
    let press_num = qty * 2 * tf_rate * fw_rate + startup * tf_rate * pr_rate * fw_rate;
    let full_weld_num = qty * 2 * tf_rate * pr_rate;

    let total_num = tube_frame_num.max(press_num) + full_weld_num;
    let total = HalfDays::from_halves(ceil_div_i128(total_num * 2, denom));

    // 分段报表值: 各段按比例独立取整, 舍入余量计入压机段
    let tube_frame = HalfDays::from_halves(ceil_div_i128(qty * 2, tf_rate));
    let full_weld = HalfDays::from_halves(ceil_div_i128(qty * 2, fw_rate));
    let press_alone = HalfDays::from_halves(ceil_div_i128(qty * 2, pr_rate));
    let accounted = tube_frame.max(press_alone + flood.press_startup) + full_weld;
    let press = if total > accounted {
        press_alone + (total - accounted)
    } else {
        press_alone
    };

    DoorWeldingPlan {
        subtype: DoorSubtype::Flood,
        press,
        robot: HalfDays::ZERO,
        tube_frame,
        full_weld,
        total,
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn flow() -> DoorFlowConfig {
        PipelineConfig::standard().door_flow
    }

    #[test]
    fn test_classify_door_priority() {
        assert_eq!(
            classify_door("flood door 36x80", "Pier 40"),
            DoorSubtype::Flood
        );
        assert_eq!(
            classify_door("lock seam door", "Midtown lobby"),
            DoorSubtype::StandardLockseam
        );
        assert_eq!(
            classify_door("lockseam door", "x"),
            DoorSubtype::StandardLockseam
        );
        assert_eq!(
            classify_door("standard door", "x"),
            DoorSubtype::StandardSeamless
        );
        // NYCHA 命中作业名即可, 优先于其他类别
        assert_eq!(
            classify_door("flood door", "NYCHA Bronx houses"),
            DoorSubtype::Nycha
        );
    }

    #[test]
    fn test_nycha_bypasses_pipeline() {
        assert!(welding_plan(&flow(), DoorSubtype::Nycha, 20, true).is_none());
    }

    #[test]
    fn test_lockseam_uses_overflow_crew() {
        // 16 樘 ÷ 8 樘/日 = 2 天
        let plan = welding_plan(&flow(), DoorSubtype::StandardLockseam, 16, true).unwrap();
        assert_eq!(plan.total, HalfDays::from_whole_days(2));
        assert_eq!(plan.robot, HalfDays::ZERO);
    }

    #[test]
    fn test_seamless_press_plus_robot() {
        // 24 樘: 压机 24/12=2天, 机器人 24/20=1.2→1.5天, 合计 3.5天
        let plan = welding_plan(&flow(), DoorSubtype::StandardSeamless, 24, true).unwrap();
        assert_eq!(plan.press, HalfDays::from_whole_days(2));
        assert_eq!(plan.robot, HalfDays::from_halves(3));
        assert_eq!(plan.total, HalfDays::from_halves(7));
    }

    #[test]
    fn test_leaf_minimum_two_days() {
        // 4 樘锁缝门: 0.5 天 → 补到 2 天下限, 余量进压机段
        let plan = welding_plan(&flow(), DoorSubtype::StandardLockseam, 4, true).unwrap();
        assert_eq!(plan.total, HalfDays::from_whole_days(2));
        assert_eq!(plan.press, HalfDays::from_whole_days(2));
        // 门框作业不受门扇下限约束
        let frame = welding_plan(&flow(), DoorSubtype::StandardLockseam, 4, false).unwrap();
        assert_eq!(frame.total, HalfDays::from_halves(1));
    }

    #[test]
    fn test_flood_three_stage_overlap() {
        // 30 樘: 管框 30/10=3天, 压机 30/12=2.5天+0.5启动=3天, 满焊 30/15=2天
        // total = max(3, 3) + 2 = 5 天
        let plan = welding_plan(&flow(), DoorSubtype::Flood, 30, true).unwrap();
        assert_eq!(plan.total, HalfDays::from_whole_days(5));
        assert_eq!(plan.tube_frame, HalfDays::from_whole_days(3));
        assert_eq!(plan.full_weld, HalfDays::from_whole_days(2));
    }

    #[test]
    fn test_flood_press_dominates() {
        // 压机慢于管框时由压机主导: 管框 12/10=1.2, 压机 12/12=1+0.5=1.5, 满焊 12/15=0.8
        // total = max(1.2, 1.5) + 0.8 = 2.3 → 2.5 天
        let plan = welding_plan(&flow(), DoorSubtype::Flood, 12, true).unwrap();
        assert_eq!(plan.total, HalfDays::from_halves(5));
    }
}
