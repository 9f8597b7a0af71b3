// ==========================================
// 定制钣金排产系统 - 定点数值单位
// ==========================================
// 职责: 点数 (Points) 与半日 (HalfDays) 的定点表示
// 红线: 排产结果必须确定性可复现, 核心算术全部走整数
// ==========================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// ==========================================
// Points - 点数 (产能通用货币)
// ==========================================
// 内部表示: 厘点 (1 点 = 100 厘点)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Points(i64);

impl Points {
    pub const ZERO: Points = Points(0);

    /// 从厘点构造
    pub const fn from_centi(centi: i64) -> Self {
        Points(centi)
    }

    /// 从整点构造
    pub const fn from_whole(points: i64) -> Self {
        Points(points * 100)
    }

    /// 从浮点点数构造 (导入边界用, 四舍五入到厘点)
    pub fn from_f64(points: f64) -> Self {
        if points.is_finite() {
            Points((points * 100.0).round() as i64)
        } else {
            Points(0)
        }
    }

    /// 厘点原始值
    pub const fn centi(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// 整数倍乘 (人数 × 单人产出等场景)
    pub const fn times(self, n: i64) -> Points {
        Points(self.0 * n)
    }

    /// 按百分比缩放, 向上取整到厘点
    ///
    /// 用于批次折扣 (90% / 85%) 与大石块产能占比 (70%) 等比例运算
    pub fn scale_pct_ceil(self, pct: i64) -> Points {
        Points(ceil_div_i128(self.0 as i128 * pct as i128, 100))
    }

    /// 将总量均摊到 n 天, 余数记入首日
    ///
    /// 保证: 各日之和恒等于总量 (无舍入漂移)
    pub fn spread_over_days(self, days: usize) -> Vec<Points> {
        if days == 0 {
            return Vec::new();
        }
        let n = days as i64;
        let base = self.0.div_euclid(n);
        let remainder = self.0 - base * n;
        let mut out = vec![Points(base); days];
        out[0] = Points(base + remainder);
        out
    }
}

impl Add for Points {
    type Output = Points;
    fn add(self, rhs: Points) -> Points {
        Points(self.0 + rhs.0)
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Points) {
        self.0 += rhs.0;
    }
}

impl Sub for Points {
    type Output = Points;
    fn sub(self, rhs: Points) -> Points {
        Points(self.0 - rhs.0)
    }
}

impl SubAssign for Points {
    fn sub_assign(&mut self, rhs: Points) {
        self.0 -= rhs.0;
    }
}

impl Neg for Points {
    type Output = Points;
    fn neg(self) -> Points {
        Points(-self.0)
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Points {
        Points(iter.map(|p| p.0).sum())
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}", self.0 / 100)
        } else {
            write!(f, "{:.2}", self.as_f64())
        }
    }
}

// 对外序列化为浮点点数 (导入/导出格式与业务口径一致)
impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Points::from_f64(value))
    }
}

// ==========================================
// HalfDays - 半日粒度工期
// ==========================================
// 内部表示: 半日数 (1 天 = 2 半日)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct HalfDays(i64);

impl HalfDays {
    pub const ZERO: HalfDays = HalfDays(0);

    pub const fn from_halves(halves: i64) -> Self {
        HalfDays(halves)
    }

    pub const fn from_whole_days(days: i64) -> Self {
        HalfDays(days * 2)
    }

    pub const fn halves(self) -> i64 {
        self.0
    }

    /// 跨越的整日数 (占用日历天数, 向上取整)
    pub const fn days_spanned(self) -> i64 {
        (self.0 + 1) / 2
    }

    pub fn as_days_f64(self) -> f64 {
        self.0 as f64 / 2.0
    }

    pub fn max(self, other: HalfDays) -> HalfDays {
        HalfDays(self.0.max(other.0))
    }

    pub fn min(self, other: HalfDays) -> HalfDays {
        HalfDays(self.0.min(other.0))
    }
}

impl Add for HalfDays {
    type Output = HalfDays;
    fn add(self, rhs: HalfDays) -> HalfDays {
        HalfDays(self.0 + rhs.0)
    }
}

impl Sub for HalfDays {
    type Output = HalfDays;
    fn sub(self, rhs: HalfDays) -> HalfDays {
        HalfDays(self.0 - rhs.0)
    }
}

impl Sum for HalfDays {
    fn sum<I: Iterator<Item = HalfDays>>(iter: I) -> HalfDays {
        HalfDays(iter.map(|h| h.0).sum())
    }
}

impl fmt::Display for HalfDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}d", self.0 / 2)
        } else {
            write!(f, "{:.1}d", self.as_days_f64())
        }
    }
}

// ==========================================
// 整数除法辅助
// ==========================================

/// 向上取整除法 (仅定义在正分母上)
pub fn ceil_div_i128(numerator: i128, denominator: i128) -> i64 {
    debug_assert!(denominator > 0);
    ((numerator + denominator - 1).div_euclid(denominator)) as i64
}
