// ==========================================
// 定制钣金排产系统 - 流水线产能配置
// ==========================================
// 职责: 部门顺序、工人池吞吐、客户画像、
//       批次折扣、门类子流水线吞吐表、加班档位
// 红线: 产能约束优先于作业优先级
// ==========================================

use crate::domain::types::{Department, ProductType, SizeTier, PIPELINE};
use crate::domain::units::{HalfDays, Points};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    FileReadError(String),

    #[error("配置解析失败: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("流水线顺序无效: 位置 {index} 期望 {expected}, 实际 {actual}")]
    PipelineOrderMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("部门缺少工人池: {department}")]
    MissingPools { department: String },

    #[error("配置值无效 (field={field}): {message}")]
    InvalidValue { field: String, message: String },
}

fn default_multiplier_centi() -> i64 {
    100
}

// ==========================================
// WorkerPool - 工人池
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPool {
    pub name: String,
    pub worker_count: i64,
    /// 单工人每日产出 (点)
    pub output_per_day: Points,
    /// 单项目最大并行工人数
    pub max_per_project: i64,
    /// 产品族亲和 (空 = 承接全部)
    #[serde(default)]
    pub product_affinity: Vec<ProductType>,
    /// 显式周产能 (覆盖 人数×日产出×5)
    #[serde(default)]
    pub weekly_capacity_override: Option<Points>,
}

impl WorkerPool {
    /// 全员日产能
    pub fn daily_capacity(&self) -> Points {
        self.output_per_day.times(self.worker_count)
    }

    /// 单项目有效日产出 (受单项目工人上限约束)
    pub fn project_output_per_day(&self) -> Points {
        self.output_per_day
            .times(self.max_per_project.min(self.worker_count))
    }

    /// 周产能
    pub fn weekly_capacity(&self) -> Points {
        self.weekly_capacity_override
            .unwrap_or_else(|| self.daily_capacity().times(5))
    }

    pub fn serves(&self, product: ProductType) -> bool {
        self.product_affinity.is_empty() || self.product_affinity.contains(&product)
    }
}

// ==========================================
// DepartmentConfig - 部门配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentConfig {
    pub department: Department,
    pub display_order: u32,
    /// 约束工序标记 (焊接为系统心跳, DBR 中的鼓点)
    #[serde(default)]
    pub is_constraint: bool,
    pub pools: Vec<WorkerPool>,
    /// 工期乘数 (厘): 100 = 1.0, 装配 125
    #[serde(default = "default_multiplier_centi")]
    pub duration_multiplier_centi: i64,
    /// 周产出目标带 (低, 高)
    pub weekly_target_band: (Points, Points),
}

impl DepartmentConfig {
    /// 部门合计日产能
    pub fn daily_capacity(&self) -> Points {
        self.pools.iter().map(|p| p.daily_capacity()).sum()
    }

    /// 按产品族选择工人池 (命中亲和的首个池, 否则第一个池)
    pub fn pool_for(&self, product: ProductType) -> (usize, &WorkerPool) {
        self.pools
            .iter()
            .enumerate()
            .find(|(_, p)| !p.product_affinity.is_empty() && p.product_affinity.contains(&product))
            .unwrap_or((0, &self.pools[0]))
    }
}

// ==========================================
// CustomerProfile - 客户画像
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// 产出乘数 (厘), <100 表示该客户工艺更费工
    #[serde(default = "default_multiplier_centi")]
    pub throughput_multiplier_centi: i64,
    /// 工程部绝对天数上限 (工程部不吃乘数, 改走硬上限)
    #[serde(default)]
    pub engineering_day_cap: Option<HalfDays>,
}

impl Default for CustomerProfile {
    fn default() -> Self {
        Self {
            throughput_multiplier_centi: 100,
            engineering_day_cap: None,
        }
    }
}

// ==========================================
// 门类焊接子流水线吞吐表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodFlowConfig {
    /// 管框段日产出 (樘)
    pub tube_frame_per_day: i64,
    /// 压机段日产出 (樘)
    pub press_per_day: i64,
    /// 满焊段日产出 (樘)
    pub full_weld_per_day: i64,
    /// 管框出件后压机启动延迟
    pub press_startup: HalfDays,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorFlowConfig {
    /// 锁缝溢出班组日产出 (樘, 低吞吐, 不走机器人)
    pub lockseam_doors_per_day: i64,
    /// 压机工位日产出 (樘)
    pub press_doors_per_day: i64,
    /// 焊接机器人日产出 (樘)
    pub robot_doors_per_day: i64,
    pub flood: FloodFlowConfig,
    /// 门扇作业子流水线总工期下限
    pub leaf_min: HalfDays,
}

// ==========================================
// OvertimeTier - 加班档位
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvertimeTier {
    pub name: String,
    /// 每部门每周产能加成 (点)
    pub weekly_bonus: Points,
    /// 对应人力工时说明
    pub labor_note: String,
}

// ==========================================
// PointConversion - 金额→点数换算率
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConversion {
    pub fab_cents_per_point: i64,
    pub doors_cents_per_point: i64,
    pub harmonic_cents_per_point: i64,
}

impl PointConversion {
    pub fn cents_per_point(&self, product: ProductType) -> i64 {
        match product {
            ProductType::Fab => self.fab_cents_per_point,
            ProductType::Doors => self.doors_cents_per_point,
            ProductType::Harmonic => self.harmonic_cents_per_point,
        }
    }
}

// ==========================================
// PipelineConfig - 全量排产配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 六部门配置, 数组下标即流水线位置
    pub departments: Vec<DepartmentConfig>,

    // ===== 规模档位 =====
    pub big_rock_threshold: Points,
    pub medium_threshold: Points,

    // ===== 排产规则 =====
    /// 交期保护缓冲 (工作日)
    pub due_buffer_days: i64,
    pub max_concurrent_big_rocks: usize,
    /// 大石块合计占部门日产能上限 (百分比)
    pub big_rock_daily_fraction_pct: i64,
    /// 同一作业同日最多活跃部门数
    pub max_active_departments_per_day: usize,
    /// 倒排整块平移尝试预算
    pub shift_attempt_budget: u32,

    // ===== 批次折扣 =====
    pub batch_discount_pair_pct: i64,
    pub batch_discount_group_pct: i64,

    // ===== 客户画像 =====
    #[serde(default)]
    pub customer_profiles: BTreeMap<String, CustomerProfile>,

    // ===== 报价换算 =====
    pub point_conversion: PointConversion,

    // ===== 门类子流水线 =====
    pub door_flow: DoorFlowConfig,

    // ===== 加班档位 (由低到高) =====
    pub overtime_tiers: Vec<OvertimeTier>,
    #[serde(default)]
    pub saturday_overtime: bool,

    // ===== 业务规则下限/附加 =====
    /// HARMONIC 外协喷涂固定窗口
    pub paint_window: HalfDays,
    pub post_paint_assembly_small: HalfDays,
    pub post_paint_assembly_big: HalfDays,
    /// NYCHA 项目焊接下限
    pub nycha_welding_floor: HalfDays,
    /// 门扇作业焊接下限
    pub door_leaf_welding_floor: HalfDays,

    // ===== 可行性分析 =====
    /// 第二档: 既有作业可推移的最小富余 (工作日)
    pub reschedule_slack_days: i64,
    /// 第二档: 推移幅度 (工作日)
    pub reschedule_push_days: i64,
    /// 流水线重叠: 上游完成该比例后下游可开工 (百分比)
    pub pipeline_overlap_pct: i64,
    /// 最早可排搜索视野 (工作日)
    pub feasibility_horizon_days: i64,
}

impl PipelineConfig {
    /// 编译期内置的标准车间配置
    pub fn standard() -> Self {
        let departments = vec![
            DepartmentConfig {
                department: Department::Engineering,
                display_order: 1,
                is_constraint: false,
                pools: vec![WorkerPool {
                    name: "engineering".to_string(),
                    worker_count: 2,
                    output_per_day: Points::from_whole(40),
                    max_per_project: 1,
                    product_affinity: vec![],
                    weekly_capacity_override: None,
                }],
                duration_multiplier_centi: 100,
                weekly_target_band: (Points::from_whole(250), Points::from_whole(400)),
            },
            DepartmentConfig {
                department: Department::Laser,
                display_order: 2,
                is_constraint: false,
                pools: vec![WorkerPool {
                    name: "laser".to_string(),
                    worker_count: 2,
                    output_per_day: Points::from_whole(60),
                    max_per_project: 2,
                    product_affinity: vec![],
                    weekly_capacity_override: None,
                }],
                duration_multiplier_centi: 100,
                weekly_target_band: (Points::from_whole(400), Points::from_whole(600)),
            },
            DepartmentConfig {
                department: Department::PressBrake,
                display_order: 3,
                is_constraint: false,
                pools: vec![WorkerPool {
                    name: "press-brake".to_string(),
                    worker_count: 3,
                    output_per_day: Points::from_whole(40),
                    max_per_project: 2,
                    product_affinity: vec![],
                    weekly_capacity_override: None,
                }],
                duration_multiplier_centi: 100,
                weekly_target_band: (Points::from_whole(400), Points::from_whole(600)),
            },
            DepartmentConfig {
                department: Department::Welding,
                display_order: 4,
                is_constraint: true,
                pools: vec![
                    WorkerPool {
                        name: "welding-fab".to_string(),
                        worker_count: 6,
                        output_per_day: Points::from_whole(30),
                        max_per_project: 4,
                        product_affinity: vec![ProductType::Fab, ProductType::Harmonic],
                        weekly_capacity_override: None,
                    },
                    WorkerPool {
                        name: "welding-doors".to_string(),
                        worker_count: 4,
                        output_per_day: Points::from_whole(25),
                        max_per_project: 3,
                        product_affinity: vec![ProductType::Doors],
                        weekly_capacity_override: Some(Points::from_whole(450)),
                    },
                ],
                duration_multiplier_centi: 100,
                weekly_target_band: (Points::from_whole(900), Points::from_whole(1400)),
            },
            DepartmentConfig {
                department: Department::Polishing,
                display_order: 5,
                is_constraint: false,
                pools: vec![WorkerPool {
                    name: "polishing".to_string(),
                    worker_count: 2,
                    output_per_day: Points::from_whole(45),
                    max_per_project: 2,
                    product_affinity: vec![],
                    weekly_capacity_override: None,
                }],
                duration_multiplier_centi: 100,
                weekly_target_band: (Points::from_whole(300), Points::from_whole(450)),
            },
            DepartmentConfig {
                department: Department::Assembly,
                display_order: 6,
                is_constraint: false,
                pools: vec![WorkerPool {
                    name: "assembly".to_string(),
                    worker_count: 3,
                    output_per_day: Points::from_whole(40),
                    max_per_project: 2,
                    product_affinity: vec![],
                    weekly_capacity_override: None,
                }],
                // 装配含五金/校验, 工期上浮 25%
                duration_multiplier_centi: 125,
                weekly_target_band: (Points::from_whole(400), Points::from_whole(600)),
            },
        ];

        Self {
            departments,
            big_rock_threshold: Points::from_whole(60),
            medium_threshold: Points::from_whole(25),
            due_buffer_days: 2,
            max_concurrent_big_rocks: 2,
            big_rock_daily_fraction_pct: 70,
            max_active_departments_per_day: 2,
            shift_attempt_budget: 60,
            batch_discount_pair_pct: 10,
            batch_discount_group_pct: 15,
            customer_profiles: BTreeMap::new(),
            point_conversion: PointConversion {
                fab_cents_per_point: 45_000,
                doors_cents_per_point: 38_000,
                harmonic_cents_per_point: 52_000,
            },
            door_flow: DoorFlowConfig {
                lockseam_doors_per_day: 8,
                press_doors_per_day: 12,
                robot_doors_per_day: 20,
                flood: FloodFlowConfig {
                    tube_frame_per_day: 10,
                    press_per_day: 12,
                    full_weld_per_day: 15,
                    press_startup: HalfDays::from_halves(1),
                },
                leaf_min: HalfDays::from_whole_days(2),
            },
            overtime_tiers: vec![
                OvertimeTier {
                    name: "OT1".to_string(),
                    weekly_bonus: Points::from_whole(40),
                    labor_note: "每部门每周加班 8 工时".to_string(),
                },
                OvertimeTier {
                    name: "OT2".to_string(),
                    weekly_bonus: Points::from_whole(80),
                    labor_note: "每部门每周加班 16 工时".to_string(),
                },
                OvertimeTier {
                    name: "OT3".to_string(),
                    weekly_bonus: Points::from_whole(120),
                    labor_note: "每部门每周加班 24 工时 + 周六半班".to_string(),
                },
                OvertimeTier {
                    name: "OT4".to_string(),
                    weekly_bonus: Points::from_whole(160),
                    labor_note: "每部门每周加班 32 工时 + 周六全班".to_string(),
                },
            ],
            saturday_overtime: false,
            paint_window: HalfDays::from_whole_days(5),
            post_paint_assembly_small: HalfDays::from_whole_days(3),
            post_paint_assembly_big: HalfDays::from_whole_days(4),
            nycha_welding_floor: HalfDays::from_whole_days(3),
            door_leaf_welding_floor: HalfDays::from_whole_days(2),
            reschedule_slack_days: 7,
            reschedule_push_days: 7,
            pipeline_overlap_pct: 30,
            feasibility_horizon_days: 260,
        }
    }

    /// 从 JSON 字符串加载并校验
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 从配置文件加载
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    /// 配置自检: 部门顺序与流水线一致, 每部门至少一个池
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.departments.len() != PIPELINE.len() {
            return Err(ConfigError::InvalidValue {
                field: "departments".to_string(),
                message: format!("期望 {} 个部门, 实际 {}", PIPELINE.len(), self.departments.len()),
            });
        }
        for (index, expected) in PIPELINE.iter().enumerate() {
            let actual = self.departments[index].department;
            if actual != *expected {
                return Err(ConfigError::PipelineOrderMismatch {
                    index,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
            if self.departments[index].pools.is_empty() {
                return Err(ConfigError::MissingPools {
                    department: actual.to_string(),
                });
            }
        }
        if self.big_rock_threshold <= self.medium_threshold {
            return Err(ConfigError::InvalidValue {
                field: "big_rock_threshold".to_string(),
                message: "大石块阈值必须高于中件阈值".to_string(),
            });
        }
        Ok(())
    }

    /// 部门配置查询 (配置经 validate 后数组下标即流水线位置)
    pub fn department(&self, department: Department) -> &DepartmentConfig {
        &self.departments[department.pipeline_index()]
    }

    /// 规模档位判定
    pub fn size_tier(&self, points: Points) -> SizeTier {
        if points >= self.big_rock_threshold {
            SizeTier::BigRock
        } else if points >= self.medium_threshold {
            SizeTier::Medium
        } else {
            SizeTier::Small
        }
    }

    /// 工序间最小间隔 (半日), no_gaps 覆写后为 0
    pub fn gap_half_days(&self, tier: SizeTier, no_gaps: bool) -> i64 {
        if no_gaps {
            0
        } else {
            tier.gap_half_days()
        }
    }

    /// 客户画像查询 (未配置的客户走默认画像)
    pub fn customer(&self, name: Option<&str>) -> CustomerProfile {
        name.and_then(|n| self.customer_profiles.get(n).cloned())
            .unwrap_or_default()
    }

    /// 批次折扣 (百分比)
    pub fn batch_discount_pct(&self, batch_size: usize) -> i64 {
        match batch_size {
            0 | 1 => 0,
            2 => self.batch_discount_pair_pct,
            _ => self.batch_discount_group_pct,
        }
    }
}
