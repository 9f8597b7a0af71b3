// ==========================================
// 报价可行性三档集成测试
// ==========================================
// 职责: 验证 现状/推移/加班 三档模拟与建议生成
// ==========================================

use chrono::NaiveDate;
use fabshop_aps::config::PipelineConfig;
use fabshop_aps::domain::{
    Department, DepartmentWindow, Job, Points, ProductType, QuoteInput, Recommendation,
};
use fabshop_aps::engine::FeasibilityAnalyzer;
use std::sync::Arc;

// ==========================================
// 测试辅助函数
// ==========================================

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn analyzer() -> FeasibilityAnalyzer {
    FeasibilityAnalyzer::new(Arc::new(PipelineConfig::standard()))
}

/// 带焊接窗口的既有承诺作业
fn committed_welding_job(
    id: &str,
    product: ProductType,
    points: i64,
    window: DepartmentWindow,
    current: Department,
    due: NaiveDate,
) -> Job {
    let mut job = Job::new(id, id, product, Points::from_whole(points));
    job.due_date = Some(due);
    job.current_department = current;
    job.department_schedule.insert(Department::Welding, window);
    job
}

fn quote(
    name: &str,
    product: ProductType,
    cents: i64,
    target: NaiveDate,
) -> QuoteInput {
    QuoteInput {
        quote_name: name.to_string(),
        customer: None,
        product_type: product,
        dollar_value_cents: cents,
        big_rock_breakdown: None,
        engineering_ready: d(2026, 9, 1),
        target_date: Some(target),
        description: "quoted package".to_string(),
        quantity: None,
        requires_painting: false,
    }
}

// ==========================================
// 场景: 焊接 DOORS 池周产能已满 → 第一档瓶颈在焊接
// ==========================================
#[test]
fn test_doors_pool_ceiling_bottlenecks_welding() {
    let analyzer = analyzer();
    // 9/7 当周 doors 池 450 点 = 周产能顶格
    let blocker = committed_welding_job(
        "C1",
        ProductType::Doors,
        450,
        DepartmentWindow::new(d(2026, 9, 7), d(2026, 9, 11)),
        Department::Welding,
        d(2026, 9, 25),
    );
    // $38,000 DOORS 报价 = 100 点, 焊接本应落在 9/7 当周
    let q = quote("DOORS-Q", ProductType::Doors, 3_800_000, d(2026, 10, 2));
    let report = analyzer.check_feasibility(&q, &[blocker]).unwrap();

    // 第一档即达标 (目标宽松), 但瓶颈记录在焊接且被推到下一周
    assert_eq!(report.recommendation, Recommendation::Accept);
    let bottleneck = report
        .as_is
        .bottlenecks
        .iter()
        .find(|b| b.department == Department::Welding)
        .expect("焊接应被记录为瓶颈");
    assert!(bottleneck.granted_start >= d(2026, 9, 14));
    assert!(bottleneck.granted_start > bottleneck.requested_start);
    // FAB 池不受 doors 占用影响: 同额 FAB 报价无焊接瓶颈
    let fab_quote = quote("FAB-Q", ProductType::Fab, 4_500_000, d(2026, 10, 2));
    let fab_blocker = committed_welding_job(
        "C1",
        ProductType::Doors,
        450,
        DepartmentWindow::new(d(2026, 9, 7), d(2026, 9, 11)),
        Department::Welding,
        d(2026, 9, 25),
    );
    let fab_report = analyzer.check_feasibility(&fab_quote, &[fab_blocker]).unwrap();
    assert!(fab_report
        .as_is
        .bottlenecks
        .iter()
        .all(|b| b.department != Department::Welding));
}

// ==========================================
// 第二档: 推移早工序低风险作业释放产能
// ==========================================
#[test]
fn test_tier2_moves_unlock_acceptance() {
    let analyzer = analyzer();
    // 三个仍在工程部的作业, 焊接预占 9/7 当周 FAB 池顶格 (3×300=900)
    let committed: Vec<Job> = (0..3)
        .map(|i| {
            committed_welding_job(
                &format!("C{}", i),
                ProductType::Fab,
                300,
                DepartmentWindow::new(d(2026, 9, 7), d(2026, 9, 11)),
                Department::Engineering,
                d(2026, 9, 30), // 富余 13 工作日 ≥ 7, 可推移
            )
        })
        .collect();

    let q = quote("FAB-Q", ProductType::Fab, 4_500_000, d(2026, 9, 18));
    let report = analyzer.check_feasibility(&q, &committed).unwrap();

    assert_eq!(report.recommendation, Recommendation::AcceptWithMoves);
    assert!(!report.as_is.achievable);
    let (outcome, moved) = report.with_moves.as_ref().unwrap();
    assert!(outcome.achievable);
    assert_eq!(moved.len(), 3);
    assert!(moved.iter().all(|m| m.pushed_back_days == 7));
    assert!(report.rationale.starts_with("ACCEPT_WITH_MOVES"));
}

// ==========================================
// 第三档: 加班档位由低到高, 取首个达标档
// ==========================================
#[test]
fn test_tier3_overtime_unlocks_acceptance() {
    let analyzer = analyzer();
    // 焊接在场作业 (不可推移), 9/7 当周 FAB 池占 850 / 900
    let blocker = committed_welding_job(
        "C1",
        ProductType::Fab,
        850,
        DepartmentWindow::new(d(2026, 9, 7), d(2026, 9, 11)),
        Department::Welding,
        d(2026, 9, 25),
    );
    let q = quote("FAB-Q", ProductType::Fab, 4_500_000, d(2026, 9, 18));
    let report = analyzer.check_feasibility(&q, &[blocker]).unwrap();

    assert_eq!(report.recommendation, Recommendation::AcceptWithOvertime);
    let overtime = report.with_overtime.as_ref().unwrap();
    // OT1 (+40) 仍差 10 点, OT2 (+80) 才放得下
    assert_eq!(overtime.tier_name, "OT2");
    assert!(overtime.outcome.achievable);
    assert!(report.rationale.starts_with("ACCEPT_WITH_OT"));
}

// ==========================================
// 结构性超载: 加班救不回, 直接 DECLINE
// ==========================================
#[test]
fn test_structural_overload_skips_overtime() {
    let analyzer = analyzer();
    // 9/7 当周 FAB 池已超基础周产能 (1000 > 900), 加班不补结构性窟窿
    let blocker = committed_welding_job(
        "C1",
        ProductType::Fab,
        1000,
        DepartmentWindow::new(d(2026, 9, 7), d(2026, 9, 11)),
        Department::Welding,
        d(2026, 9, 25),
    );
    let q = quote("FAB-Q", ProductType::Fab, 4_500_000, d(2026, 9, 18));
    let report = analyzer.check_feasibility(&q, &[blocker]).unwrap();

    assert_eq!(report.recommendation, Recommendation::Decline);
    assert!(report.with_overtime.is_none());
    assert!(report.rationale.starts_with("DECLINE"));
    // 结论指明受限部门
    assert!(report.rationale.contains("WELDING"));
}
