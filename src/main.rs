// ==========================================
// 定制钣金排产系统 - CLI 主入口
// ==========================================
// 用法: fabshop-aps <jobs.csv> [db_path]
// 流程: 导入 → 进度跟踪合并 → 全量排产 → 整批落库 → 输出洞察
// ==========================================

use anyhow::{bail, Context};
use chrono::Local;
use fabshop_aps::calendar::WorkCalendar;
use fabshop_aps::config::PipelineConfig;
use fabshop_aps::domain::Job;
use fabshop_aps::engine::{ProgressTracker, ScheduleOrchestrator};
use fabshop_aps::repository::JobStore;
use fabshop_aps::{importer, logging};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", fabshop_aps::APP_NAME, fabshop_aps::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = env::args().collect();
    let csv_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => bail!("用法: fabshop-aps <jobs.csv> [db_path]"),
    };
    let db_path = match args.get(2) {
        Some(path) => PathBuf::from(path),
        None => default_db_path()?,
    };

    // 配置: FABSHOP_APS_CONFIG 指向 JSON 时加载, 否则内置标准配置
    let config = Arc::new(match env::var("FABSHOP_APS_CONFIG") {
        Ok(path) => PipelineConfig::load(Path::new(&path))
            .with_context(|| format!("加载配置失败: {}", path))?,
        Err(_) => PipelineConfig::standard(),
    });

    let today = Local::now().date_naive();
    let calendar = WorkCalendar::new(config.saturday_overtime);

    // 1. 导入当日作业
    let outcome = importer::read_jobs_csv(&csv_path)
        .with_context(|| format!("导入失败: {}", csv_path.display()))?;

    // 2. 装载既有承诺
    let mut store = JobStore::open(&db_path)
        .with_context(|| format!("打开作业库失败: {}", db_path.display()))?;
    let committed = store.load_committed_jobs()?;
    let previous_by_id: BTreeMap<String, Job> = committed
        .iter()
        .map(|job| (job.job_id.clone(), job.clone()))
        .collect();

    // 3. 进度跟踪合并: 交期未变保留旧排程, 变更则进重排队列
    let tracker = ProgressTracker::new(calendar);
    let mut to_schedule: Vec<Job> = Vec::new();
    let mut carried: Vec<Job> = Vec::new();
    let mut imported_ids: Vec<String> = Vec::new();
    for job in outcome.jobs {
        imported_ids.push(job.job_id.clone());
        match previous_by_id.get(&job.job_id) {
            Some(previous) => {
                let merged = tracker.track_progress(job, previous, today);
                if merged.needs_reschedule || !merged.has_schedule() {
                    to_schedule.push(merged);
                } else {
                    carried.push(merged);
                }
            }
            None => to_schedule.push(job),
        }
    }

    // 4. 既有占用 = 保留排程的作业 + 库中未重导入的作业
    let mut committed_now: Vec<Job> = committed
        .into_iter()
        .filter(|job| !imported_ids.contains(&job.job_id))
        .collect();
    committed_now.extend(carried.iter().cloned());

    // 5. 全量排产
    let orchestrator = ScheduleOrchestrator::new(config);
    let result = orchestrator.schedule_all(to_schedule, &committed_now, today);

    // 6. 整批落库 (读取→计算→整批写回)
    let mut persisted = carried;
    persisted.extend(result.scheduled_jobs.iter().cloned());
    store.persist_scheduled_jobs(&persisted)?;

    // 7. 输出洞察与排队缓冲
    println!("{}", serde_json::to_string_pretty(&result.insights)?);
    let buffer = orchestrator.queue_buffer_days(&persisted, today);
    for (department, days) in &buffer {
        println!("{:12} queue buffer: {}", department.to_string(), days);
    }

    Ok(())
}

/// 默认作业库路径: <数据目录>/fabshop-aps/jobs.db
fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir().context("无法定位系统数据目录")?;
    let dir = base.join("fabshop-aps");
    std::fs::create_dir_all(&dir).with_context(|| format!("创建目录失败: {}", dir.display()))?;
    Ok(dir.join("jobs.db"))
}
