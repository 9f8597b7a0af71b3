// ==========================================
// 定制钣金排产系统 - 工期计算引擎
// ==========================================
// 职责: 作业规模 + 产品族 + 上下文 → 部门驻留工期
// 输出: 半日粒度工期 (向上取整)
// 红线: 全整数算术, 同输入必得同输出
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::job::Job;
use crate::domain::types::{Department, ProductType, SizeTier};
use crate::domain::units::{ceil_div_i128, HalfDays, Points};
use crate::engine::door_flow::{self, DoorWeldingPlan};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static NYCHA_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bnycha\b").expect("NYCHA_NAME_RE 应能编译"));

// ==========================================
// DurationRequest - 工期计算输入
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct DurationRequest<'a> {
    pub department: Department,
    pub points: Points,
    pub product_type: ProductType,
    pub description: &'a str,
    pub job_name: &'a str,
    pub customer: Option<&'a str>,
    pub requires_painting: bool,
    /// 批次同组作业数 (1 = 无折扣)
    pub batch_size: usize,
    pub quantity: Option<u32>,
}

impl<'a> DurationRequest<'a> {
    pub fn from_job(job: &'a Job, department: Department, batch_size: usize) -> Self {
        Self {
            department,
            points: job.welding_points,
            product_type: job.product_type,
            description: &job.description,
            job_name: &job.job_name,
            customer: job.customer.as_deref(),
            requires_painting: job.requires_painting,
            batch_size,
            quantity: job.quantity,
        }
    }
}

// ==========================================
// DurationCalculator - 工期计算引擎
// ==========================================
pub struct DurationCalculator {
    config: Arc<PipelineConfig>,
}

impl DurationCalculator {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// 批次折扣后的有效点数 (工期与产能台账共用同一口径)
    pub fn effective_points(&self, points: Points, batch_size: usize) -> Points {
        let discount = self.config.batch_discount_pct(batch_size);
        points.scale_pct_ceil(100 - discount)
    }

    /// 计算部门驻留工期
    ///
    /// 主路径: 有效点数 ÷ 有效日产出 × 部门乘数, 向上取整到半日
    /// 分支: DOORS 焊接 + 樘数 → 子流水线; HARMONIC 喷涂 → 喷涂窗口
    /// 下限: 门扇焊接 ≥2 天, NYCHA 焊接 ≥3 天
    pub fn duration(&self, request: &DurationRequest<'_>) -> HalfDays {
        // HARMONIC 外协喷涂: 装配段 = 固定喷涂窗口 + 回厂装配
        if request.department == Department::Assembly
            && request.product_type == ProductType::Harmonic
            && request.requires_painting
        {
            let post_paint = match self.config.size_tier(request.points) {
                SizeTier::BigRock => self.config.post_paint_assembly_big,
                _ => self.config.post_paint_assembly_small,
            };
            return self.config.paint_window + post_paint;
        }

        // DOORS 焊接 + 樘数: 走子流水线 (NYCHA 除外)
        if request.department == Department::Welding
            && request.product_type == ProductType::Doors
        {
            if let Some(plan) = self.door_welding_plan(request) {
                return self.apply_welding_floors(plan.total, request);
            }
        }

        let raw = self.formula_half_days(request);
        let floored = if request.department == Department::Welding {
            self.apply_welding_floors(raw, request)
        } else {
            raw
        };
        floored.max(HalfDays::from_halves(1))
    }

    /// 门类焊接子流水线分段 (NYCHA 或无樘数返回 None)
    pub fn door_welding_plan(&self, request: &DurationRequest<'_>) -> Option<DoorWeldingPlan> {
        let quantity = request.quantity?;
        let subtype = door_flow::classify_door(request.description, request.job_name);
        let is_leaf = door_flow::is_door_leaf(request.description);
        door_flow::welding_plan(&self.config.door_flow, subtype, quantity, is_leaf)
    }

    /// 主公式: ceil( 2 × 有效点数 ÷ 有效产出 × 部门乘数 )
    ///
    /// 单次取整: 分子分母全程整数, 仅在末尾进一次 ceil
    fn formula_half_days(&self, request: &DurationRequest<'_>) -> HalfDays {
        let dept_config = self.config.department(request.department);
        let (_, pool) = dept_config.pool_for(request.product_type);
        let discount = self.config.batch_discount_pct(request.batch_size);
        let profile = self.config.customer(request.customer);

        // 工程部不吃客户乘数 (改走绝对天数上限)
        let customer_centi = if request.department == Department::Engineering {
            100
        } else {
            profile.throughput_multiplier_centi.clamp(1, 1000)
        };

        let output_centi = pool.project_output_per_day().centi().max(1);
        let numerator = request.points.centi() as i128
            * (100 - discount) as i128
            * dept_config.duration_multiplier_centi as i128
            * 2;
        let denominator = output_centi as i128 * customer_centi as i128 * 100;
        let mut half_days = HalfDays::from_halves(ceil_div_i128(numerator, denominator));

        if request.department == Department::Engineering {
            if let Some(cap) = profile.engineering_day_cap {
                half_days = half_days.min(cap);
            }
        }
        half_days
    }

    /// 焊接部门业务下限: 门扇 ≥2 天, NYCHA ≥3 天
    fn apply_welding_floors(&self, raw: HalfDays, request: &DurationRequest<'_>) -> HalfDays {
        let mut result = raw;
        if request.product_type == ProductType::Doors
            && door_flow::is_door_leaf(request.description)
        {
            result = result.max(self.config.door_leaf_welding_floor);
        }
        if NYCHA_NAME_RE.is_match(&request.job_name.to_lowercase()) {
            result = result.max(self.config.nycha_welding_floor);
        }
        result
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomerProfile;

    fn calculator() -> DurationCalculator {
        DurationCalculator::new(Arc::new(PipelineConfig::standard()))
    }

    fn base_request(department: Department, points: i64) -> DurationRequest<'static> {
        DurationRequest {
            department,
            points: Points::from_whole(points),
            product_type: ProductType::Fab,
            description: "louver panel run",
            job_name: "Midtown lobby",
            customer: None,
            requires_painting: false,
            batch_size: 1,
            quantity: None,
        }
    }

    #[test]
    fn test_basic_formula_engineering() {
        // 80 点 ÷ (1 人 × 40 点/日) = 2 天
        let calc = calculator();
        let hd = calc.duration(&base_request(Department::Engineering, 80));
        assert_eq!(hd, HalfDays::from_whole_days(2));
    }

    #[test]
    fn test_half_day_rounding() {
        // 80 点 ÷ (2 × 60) = 0.67 天 → 1 天; 50 ÷ 120 = 0.42 → 0.5 天
        let calc = calculator();
        assert_eq!(
            calc.duration(&base_request(Department::Laser, 80)),
            HalfDays::from_whole_days(1)
        );
        assert_eq!(
            calc.duration(&base_request(Department::Laser, 50)),
            HalfDays::from_halves(1)
        );
    }

    #[test]
    fn test_assembly_multiplier() {
        // 80 ÷ (2 × 40) = 1 天 × 1.25 = 1.25 → 1.5 天
        let calc = calculator();
        assert_eq!(
            calc.duration(&base_request(Department::Assembly, 80)),
            HalfDays::from_halves(3)
        );
    }

    #[test]
    fn test_batch_discount_reduces_duration() {
        let calc = calculator();
        // 100 点焊接 (fab 池 4×30=120/日): 无折扣 0.83→1 天
        let mut request = base_request(Department::Welding, 100);
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(1));
        // 两件批次 10% 折扣: 90 ÷ 120 = 0.75 → 1 天; 三件 15%: 85 ÷ 120 = 0.71 → 1 天
        request.batch_size = 2;
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(1));
        // 折扣在更大规模上体现: 200 点, 无折扣 1.67→2 天, 三件批 170/120=1.42→1.5 天
        let mut big = base_request(Department::Welding, 200);
        assert_eq!(calc.duration(&big), HalfDays::from_whole_days(2));
        big.batch_size = 3;
        assert_eq!(calc.duration(&big), HalfDays::from_halves(3));
    }

    #[test]
    fn test_effective_points() {
        let calc = calculator();
        assert_eq!(
            calc.effective_points(Points::from_whole(100), 2),
            Points::from_whole(90)
        );
        assert_eq!(
            calc.effective_points(Points::from_whole(100), 5),
            Points::from_whole(85)
        );
        assert_eq!(
            calc.effective_points(Points::from_whole(100), 1),
            Points::from_whole(100)
        );
    }

    #[test]
    fn test_customer_multiplier_slows_output() {
        let mut config = PipelineConfig::standard();
        config.customer_profiles.insert(
            "Hudson Yards GC".to_string(),
            CustomerProfile {
                throughput_multiplier_centi: 50,
                engineering_day_cap: Some(HalfDays::from_whole_days(3)),
            },
        );
        let calc = DurationCalculator::new(Arc::new(config));

        // 焊接: 80 ÷ (120 × 0.5) = 1.33 → 1.5 天
        let mut request = base_request(Department::Welding, 80);
        request.customer = Some("Hudson Yards GC");
        assert_eq!(calc.duration(&request), HalfDays::from_halves(3));

        // 工程: 乘数不生效, 硬上限生效: 200 点 → 5 天, 封顶 3 天
        let mut eng = base_request(Department::Engineering, 200);
        eng.customer = Some("Hudson Yards GC");
        assert_eq!(calc.duration(&eng), HalfDays::from_whole_days(3));
    }

    #[test]
    fn test_door_leaf_welding_floor() {
        let calc = calculator();
        let mut request = base_request(Department::Welding, 10);
        request.product_type = ProductType::Doors;
        request.description = "single door 36x80";
        // 10 点 ÷ (3 × 25 = 75/日) = 0.13 天, 门扇下限抬到 2 天
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(2));
        // 带 frame 的描述不触发门扇下限
        request.description = "door frame 36x80";
        assert_eq!(calc.duration(&request), HalfDays::from_halves(1));
    }

    #[test]
    fn test_nycha_welding_floor() {
        let calc = calculator();
        let mut request = base_request(Department::Welding, 10);
        request.job_name = "NYCHA Throggs Neck phase 2";
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(3));
    }

    #[test]
    fn test_doors_quantity_subpipeline() {
        let calc = calculator();
        let mut request = base_request(Department::Welding, 40);
        request.product_type = ProductType::Doors;
        request.description = "lock seam door order";
        request.quantity = Some(16);
        // 16 樘 ÷ 8 樘/日 (溢出班组) = 2 天
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(2));
    }

    #[test]
    fn test_nycha_doors_fall_back_to_floor() {
        let calc = calculator();
        let mut request = base_request(Department::Welding, 20);
        request.product_type = ProductType::Doors;
        request.description = "door package";
        request.job_name = "NYCHA Marcy Houses";
        request.quantity = Some(40);
        // NYCHA 不走子流水线: 20 ÷ 75 = 0.27 天 → 下限 3 天
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(3));
    }

    #[test]
    fn test_harmonic_paint_window() {
        let calc = calculator();
        let mut request = base_request(Department::Assembly, 30);
        request.product_type = ProductType::Harmonic;
        request.requires_painting = true;
        // 小件: 5 天喷涂 + 3 天回厂装配
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(8));
        // 大石块: 5 + 4
        request.points = Points::from_whole(80);
        assert_eq!(calc.duration(&request), HalfDays::from_whole_days(9));
    }

    #[test]
    fn test_minimum_half_day() {
        let calc = calculator();
        let request = base_request(Department::Laser, 0);
        assert_eq!(calc.duration(&request), HalfDays::from_halves(1));
    }
}
