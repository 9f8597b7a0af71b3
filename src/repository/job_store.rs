// ==========================================
// 定制钣金排产系统 - 作业存储
// ==========================================
// 职责: 已承诺作业的装载与整批持久化 (引擎的外部协作方)
// 写入纪律: 读取→计算→整批写回, 单事务落库,
//           后写覆盖先写 (last-committed-wins)
// 排程退役: 被取代的排程进历史表, 不原地改写
// ==========================================

use crate::domain::job::Job;
use crate::repository::error::RepositoryError;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

// ==========================================
// JobStore - 作业存储
// ==========================================
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    /// 打开数据库并初始化表结构
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), RepositoryError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS job (
                job_id       TEXT PRIMARY KEY,
                due_date     TEXT,
                product_type TEXT NOT NULL,
                completed    INTEGER NOT NULL DEFAULT 0,
                payload      TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS job_schedule_history (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id        TEXT NOT NULL,
                superseded_at TEXT NOT NULL DEFAULT (datetime('now')),
                payload       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_history_job
                ON job_schedule_history(job_id);
            "#,
        )?;
        Ok(())
    }

    /// 装载全部已承诺作业 (按作业号排序, 保证调用方输入确定性)
    pub fn load_committed_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        let mut statement = self
            .conn
            .prepare("SELECT job_id, payload FROM job ORDER BY job_id")?;
        let rows = statement.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (job_id, payload) = row?;
            let job: Job =
                serde_json::from_str(&payload).map_err(|e| RepositoryError::PayloadError {
                    job_id,
                    message: e.to_string(),
                })?;
            jobs.push(job);
        }
        debug!(count = jobs.len(), "已承诺作业装载完成");
        Ok(jobs)
    }

    /// 整批写回排产结果 (单事务)
    ///
    /// 既有排程与新排程不同时, 旧载荷先进历史表再覆盖
    pub fn persist_scheduled_jobs(&mut self, jobs: &[Job]) -> Result<(), RepositoryError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for job in jobs {
            let payload =
                serde_json::to_string(job).map_err(|e| RepositoryError::PayloadError {
                    job_id: job.job_id.clone(),
                    message: e.to_string(),
                })?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT payload FROM job WHERE job_id = ?1",
                    params![job.job_id],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            if let Some(old_payload) = existing {
                let old: Result<Job, _> = serde_json::from_str(&old_payload);
                let schedule_changed = old
                    .map(|old| old.department_schedule != job.department_schedule)
                    .unwrap_or(true);
                if schedule_changed {
                    tx.execute(
                        "INSERT INTO job_schedule_history (job_id, payload) VALUES (?1, ?2)",
                        params![job.job_id, old_payload],
                    )?;
                }
            }

            tx.execute(
                "INSERT OR REPLACE INTO job (job_id, due_date, product_type, completed, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    job.job_id,
                    job.due_date.map(|d| d.to_string()),
                    job.product_type.to_string(),
                    job.completed as i64,
                    payload
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        info!(count = jobs.len(), "排产结果整批落库");
        Ok(())
    }

    /// 标记完工: 排程退役进历史表, 作业保留
    pub fn mark_completed(&mut self, job_id: &str) -> Result<(), RepositoryError> {
        let payload: String = self
            .conn
            .query_row(
                "SELECT payload FROM job WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Err(RepositoryError::NotFound {
                    entity: "job".to_string(),
                    id: job_id.to_string(),
                }),
                other => Err(other.into()),
            })?;

        let mut job: Job =
            serde_json::from_str(&payload).map_err(|e| RepositoryError::PayloadError {
                job_id: job_id.to_string(),
                message: e.to_string(),
            })?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        tx.execute(
            "INSERT INTO job_schedule_history (job_id, payload) VALUES (?1, ?2)",
            params![job_id, payload],
        )?;

        job.retire_schedule();
        job.completed = true;
        let new_payload =
            serde_json::to_string(&job).map_err(|e| RepositoryError::PayloadError {
                job_id: job_id.to_string(),
                message: e.to_string(),
            })?;
        tx.execute(
            "UPDATE job SET completed = 1, payload = ?2 WHERE job_id = ?1",
            params![job_id, new_payload],
        )?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 某作业的历史排程条数
    pub fn schedule_history_count(&self, job_id: &str) -> Result<i64, RepositoryError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM job_schedule_history WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
