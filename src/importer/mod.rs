// ==========================================
// 定制钣金排产系统 - 作业导入层
// ==========================================
// 职责: CSV → 原始 Job 记录 (外部数据边界)
// 红线: 单行畸形数据跳过并告警, 不中断整批导入
// ==========================================

pub mod error;

pub use error::ImportError;

use crate::domain::job::Job;
use crate::domain::types::{Department, ProductType};
use crate::domain::units::Points;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// 行级告警 (批次继续)
#[derive(Debug, Clone)]
pub struct ImportWarning {
    pub row: usize,
    pub message: String,
}

/// 导入结果: 有效作业 + 行级告警
#[derive(Debug)]
pub struct ImportOutcome {
    pub jobs: Vec<Job>,
    pub warnings: Vec<ImportWarning>,
}

/// CSV 原始行 (全部可缺失, 行级校验时再收紧)
#[derive(Debug, Deserialize)]
struct RawJobRow {
    job_id: Option<String>,
    job_name: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    description: Option<String>,
    product_type: Option<String>,
    welding_points: Option<f64>,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    current_department: Option<String>,
    #[serde(default)]
    requires_painting: Option<bool>,
}

/// 读取作业 CSV
///
/// 文件级错误 (不存在/非 CSV/表头损坏) 直接失败;
/// 行级错误转为告警并跳过该行
pub fn read_jobs_csv(path: &Path) -> Result<ImportOutcome, ImportError> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => {}
        _ => return Err(ImportError::UnsupportedFormat(path.display().to_string())),
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ImportError::CsvParseError(e.to_string()))?;

    let mut jobs = Vec::new();
    let mut warnings = Vec::new();

    for (index, record) in reader.deserialize::<RawJobRow>().enumerate() {
        let row = index + 2; // 表头占第 1 行
        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                warn!(row, error = %e, "CSV 行反序列化失败, 跳过");
                warnings.push(ImportWarning {
                    row,
                    message: e.to_string(),
                });
                continue;
            }
        };
        match convert_row(raw, row) {
            Ok(job) => jobs.push(job),
            Err(e) => {
                warn!(row, error = %e, "作业行校验失败, 跳过");
                warnings.push(ImportWarning {
                    row,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        jobs = jobs.len(),
        warnings = warnings.len(),
        path = %path.display(),
        "作业导入完成"
    );
    Ok(ImportOutcome { jobs, warnings })
}

/// 行级转换: 原始行 → Job
fn convert_row(raw: RawJobRow, row: usize) -> Result<Job, ImportError> {
    let job_id = raw
        .job_id
        .filter(|s| !s.is_empty())
        .ok_or(ImportError::PrimaryKeyMissing(row))?;
    let job_name = raw.job_name.unwrap_or_else(|| job_id.clone());

    let product_raw = raw.product_type.ok_or_else(|| ImportError::FieldMissing {
        row,
        field: "product_type".to_string(),
    })?;
    let product_type =
        ProductType::from_str_loose(&product_raw).ok_or_else(|| ImportError::TypeConversionError {
            row,
            field: "product_type".to_string(),
            message: format!("未知产品族 {}", product_raw),
        })?;

    let points_raw = raw
        .welding_points
        .ok_or_else(|| ImportError::FieldMissing {
            row,
            field: "welding_points".to_string(),
        })?;
    if !points_raw.is_finite() || points_raw < 0.0 {
        return Err(ImportError::TypeConversionError {
            row,
            field: "welding_points".to_string(),
            message: format!("点数无效 {}", points_raw),
        });
    }

    let due_date = match raw.due_date.filter(|s| !s.is_empty()) {
        Some(value) => Some(parse_date(&value, row, "due_date")?),
        None => None,
    };

    let current_department = match raw.current_department.filter(|s| !s.is_empty()) {
        Some(value) => {
            Department::from_str_loose(&value).ok_or_else(|| ImportError::TypeConversionError {
                row,
                field: "current_department".to_string(),
                message: format!("未知部门 {}", value),
            })?
        }
        None => Department::Engineering,
    };

    let mut job = Job::new(job_id, job_name, product_type, Points::from_f64(points_raw));
    job.customer = raw.customer.filter(|s| !s.is_empty());
    job.description = raw.description.unwrap_or_default();
    job.quantity = raw.quantity;
    job.due_date = due_date;
    job.current_department = current_department;
    job.requires_painting = raw.requires_painting.unwrap_or(false);
    Ok(job)
}

/// 宽松日期解析: ISO 优先, 兼容美式写法
fn parse_date(value: &str, row: usize, field: &str) -> Result<NaiveDate, ImportError> {
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    Err(ImportError::DateFormatError {
        row,
        field: field.to_string(),
        value: value.to_string(),
    })
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_import_valid_rows() {
        let file = write_csv(
            "job_id,job_name,customer,description,product_type,welding_points,quantity,due_date,current_department,requires_painting\n\
             J1,Lobby doors,Acme GC,lock seam door 16ga ss304,DOORS,42.5,12,2026-09-18,engineering,false\n\
             J2,Louvers,,louver panel,FAB,18,,09/25/2026,laser,\n",
        );
        let outcome = read_jobs_csv(file.path()).unwrap();
        assert_eq!(outcome.jobs.len(), 2);
        assert!(outcome.warnings.is_empty());

        let j1 = &outcome.jobs[0];
        assert_eq!(j1.welding_points, Points::from_f64(42.5));
        assert_eq!(j1.product_type, ProductType::Doors);
        assert_eq!(j1.quantity, Some(12));
        assert_eq!(j1.due_date, Some(NaiveDate::from_ymd_opt(2026, 9, 18).unwrap()));

        let j2 = &outcome.jobs[1];
        assert_eq!(j2.current_department, Department::Laser);
        assert_eq!(j2.due_date, Some(NaiveDate::from_ymd_opt(2026, 9, 25).unwrap()));
    }

    #[test]
    fn test_bad_row_warns_and_batch_continues() {
        let file = write_csv(
            "job_id,job_name,customer,description,product_type,welding_points,quantity,due_date,current_department,requires_painting\n\
             ,NoId,,x,FAB,10,,,,\n\
             J2,BadProduct,,x,WIDGET,10,,,,\n\
             J3,BadDate,,x,FAB,10,,13/45/2026,,\n\
             J4,Good,,x,FAB,10,,2026-09-18,,\n",
        );
        let outcome = read_jobs_csv(file.path()).unwrap();
        assert_eq!(outcome.jobs.len(), 1);
        assert_eq!(outcome.jobs[0].job_id, "J4");
        assert_eq!(outcome.warnings.len(), 3);
        assert!(outcome.warnings[0].message.contains("主键缺失"));
    }

    #[test]
    fn test_missing_file() {
        let result = read_jobs_csv(Path::new("/nonexistent/jobs.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_wrong_extension() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let result = read_jobs_csv(file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
