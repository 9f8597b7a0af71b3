// ==========================================
// 定制钣金排产系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 部门 (Department)
// ==========================================
// 声明顺序即流水线顺序, Ord 按流水线位置比较
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Engineering, // 工程
    Laser,       // 激光切割
    PressBrake,  // 折弯
    Welding,     // 焊接 (约束工序)
    Polishing,   // 打磨
    Assembly,    // 装配
}

/// 流水线顺序全集
pub const PIPELINE: [Department; 6] = [
    Department::Engineering,
    Department::Laser,
    Department::PressBrake,
    Department::Welding,
    Department::Polishing,
    Department::Assembly,
];

impl Department {
    /// 流水线位置 (0 起)
    pub fn pipeline_index(self) -> usize {
        PIPELINE
            .iter()
            .position(|d| *d == self)
            .expect("PIPELINE 覆盖全部部门")
    }

    pub fn from_index(index: usize) -> Option<Department> {
        PIPELINE.get(index).copied()
    }

    /// 下游部门
    pub fn next(self) -> Option<Department> {
        Department::from_index(self.pipeline_index() + 1)
    }

    pub fn from_str_loose(s: &str) -> Option<Department> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "ENGINEERING" | "ENG" => Some(Department::Engineering),
            "LASER" => Some(Department::Laser),
            "PRESS_BRAKE" | "PRESSBRAKE" | "BRAKE" => Some(Department::PressBrake),
            "WELDING" | "WELD" => Some(Department::Welding),
            "POLISHING" | "POLISH" => Some(Department::Polishing),
            "ASSEMBLY" | "ASM" => Some(Department::Assembly),
            _ => None,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Department::Engineering => write!(f, "ENGINEERING"),
            Department::Laser => write!(f, "LASER"),
            Department::PressBrake => write!(f, "PRESS_BRAKE"),
            Department::Welding => write!(f, "WELDING"),
            Department::Polishing => write!(f, "POLISHING"),
            Department::Assembly => write!(f, "ASSEMBLY"),
        }
    }
}

// ==========================================
// 产品族 (Product Type)
// ==========================================
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Fab,      // 定制钣金件
    Doors,    // 门类
    Harmonic, // Harmonic 系列
}

impl ProductType {
    pub fn from_str_loose(s: &str) -> Option<ProductType> {
        match s.trim().to_uppercase().as_str() {
            "FAB" => Some(ProductType::Fab),
            "DOORS" | "DOOR" => Some(ProductType::Doors),
            "HARMONIC" => Some(ProductType::Harmonic),
            _ => None,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductType::Fab => write!(f, "FAB"),
            ProductType::Doors => write!(f, "DOORS"),
            ProductType::Harmonic => write!(f, "HARMONIC"),
        }
    }
}

// ==========================================
// 进度状态 (Progress Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    OnTrack,  // 按计划
    Ahead,    // 超前
    Slipping, // 滞后
    Stalled,  // 停滞
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::OnTrack => write!(f, "ON_TRACK"),
            ProgressStatus::Ahead => write!(f, "AHEAD"),
            ProgressStatus::Slipping => write!(f, "SLIPPING"),
            ProgressStatus::Stalled => write!(f, "STALLED"),
        }
    }
}

impl Default for ProgressStatus {
    fn default() -> Self {
        ProgressStatus::OnTrack
    }
}

// ==========================================
// 规模档位 (Size Tier)
// ==========================================
// 红线: 档位决定工序间最小间隔与大石块并发限制
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeTier {
    Small,
    Medium,
    BigRock,
}

impl SizeTier {
    /// 工序间最小间隔 (半日)
    ///
    /// 大石块 1 天, 中件 0.5 天, 小件 0
    pub fn gap_half_days(self) -> i64 {
        match self {
            SizeTier::BigRock => 2,
            SizeTier::Medium => 1,
            SizeTier::Small => 0,
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeTier::Small => write!(f, "SMALL"),
            SizeTier::Medium => write!(f, "MEDIUM"),
            SizeTier::BigRock => write!(f, "BIG_ROCK"),
        }
    }
}

// ==========================================
// 批次类别 (Batch Category)
// ==========================================
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchCategory {
    FrameKnockdown,   // 门框散件 (knock down frame)
    FrameCaseOpening, // 门框开洞 (case opening frame)
    DoorLockSeam,     // 锁缝门扇 (lock seam door)
}

impl fmt::Display for BatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchCategory::FrameKnockdown => write!(f, "FRAME_KNOCKDOWN"),
            BatchCategory::FrameCaseOpening => write!(f, "FRAME_CASE_OPENING"),
            BatchCategory::DoorLockSeam => write!(f, "DOOR_LOCK_SEAM"),
        }
    }
}

// ==========================================
// 门类焊接子类型 (Door Subtype)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoorSubtype {
    Flood,            // 防汛门 (三段子流水线)
    StandardLockseam, // 标准锁缝门 (溢出班组, 不走机器人)
    StandardSeamless, // 标准无缝门 (压机 + 机器人)
    Nycha,            // NYCHA 项目门 (不走子流水线, 3 天下限)
}

impl fmt::Display for DoorSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorSubtype::Flood => write!(f, "FLOOD"),
            DoorSubtype::StandardLockseam => write!(f, "STANDARD_LOCKSEAM"),
            DoorSubtype::StandardSeamless => write!(f, "STANDARD_SEAMLESS"),
            DoorSubtype::Nycha => write!(f, "NYCHA"),
        }
    }
}

// ==========================================
// 报价建议 (Recommendation)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Accept,             // 现有排程可承接
    AcceptWithMoves,    // 需要推移既有低风险作业
    AcceptWithOvertime, // 需要加班档位
    Decline,            // 无法按期承接
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Accept => write!(f, "ACCEPT"),
            Recommendation::AcceptWithMoves => write!(f, "ACCEPT_WITH_MOVES"),
            Recommendation::AcceptWithOvertime => write!(f, "ACCEPT_WITH_OT"),
            Recommendation::Decline => write!(f, "DECLINE"),
        }
    }
}
