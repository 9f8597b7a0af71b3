// ==========================================
// 定制钣金排产系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 仅承载调用方编程错误; 排程冲突/产能耗尽是软信号, 不走这里
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入校验错误 =====
    #[error("作业缺少交期, 无法倒排: job_id={0}")]
    MissingDueDate(String),

    #[error("可行性检查缺少目标完工日: quote={0}")]
    MissingTargetDate(String),

    #[error("报价金额无效 (quote={quote}): {message}")]
    InvalidQuoteValue { quote: String, message: String },

    #[error("作业字段无效 (job_id={job_id}, field={field}): {message}")]
    InvalidJobField {
        job_id: String,
        field: String,
        message: String,
    },
}
