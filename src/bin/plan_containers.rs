// ==========================================
// 集装箱配载引擎 - 配载计划开发工具
// ==========================================
// 用法: plan_containers <units.csv> [best_fit|weight_balanced] [db_path]
// CSV 列: unit_id,length_mm,width_mm,height_mm,gross_weight_kg,net_weight_kg,source_line_id,quantity
// 输出: 配载计划 JSON (stdout)
// ==========================================

use anyhow::{bail, Context, Result};
use std::sync::{Arc, Mutex};

use container_loading::db::{default_db_path, init_schema, open_sqlite_connection};
use container_loading::repository::{
    AllocationRepository, ContainerRepository, ContainerTypeRepository, PackingBoxTypeRepository,
};
use container_loading::{logging, AllocationAlgorithm, ConfigManager, LoadingApi, PackableUnit};

fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let csv_path = match args.next() {
        Some(p) => p,
        None => bail!("用法: plan_containers <units.csv> [best_fit|weight_balanced] [db_path]"),
    };
    let algorithm = match args.next().as_deref() {
        None | Some("best_fit") => AllocationAlgorithm::BestFit,
        Some("weight_balanced") => AllocationAlgorithm::WeightBalanced,
        Some(other) => bail!("未知算法: {}", other),
    };
    let db_path = args.next().unwrap_or_else(default_db_path);

    let units = read_units(&csv_path)?;
    tracing::info!(units = units.len(), db_path = %db_path, "读取箱件完成");

    let conn = open_sqlite_connection(&db_path).with_context(|| format!("打开数据库失败: {}", db_path))?;
    init_schema(&conn).context("建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let thresholds = ConfigManager::from_connection(conn.clone())
        .and_then(|cm| cm.load_thresholds())
        .map_err(|e| anyhow::anyhow!("加载配载阈值失败: {}", e))?;

    let api = LoadingApi::new(
        Arc::new(ContainerRepository::new(conn.clone())),
        Arc::new(ContainerTypeRepository::new(conn.clone())),
        Arc::new(AllocationRepository::new(conn.clone())),
        Arc::new(PackingBoxTypeRepository::new(conn)),
        thresholds,
    );

    let plan = api.plan(algorithm, &units, None)?;
    if !plan.is_complete() {
        tracing::warn!(unallocated = plan.unallocated.len(), "存在无法装入任何启用箱型的箱件");
    }

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn read_units(path: &str) -> Result<Vec<PackableUnit>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("打开 CSV 失败: {}", path))?;

    let mut units = Vec::new();
    for (row_idx, result) in reader.deserialize::<PackableUnit>().enumerate() {
        // +2: 行号从1开始且跳过表头
        let unit = result.with_context(|| format!("第 {} 行解析失败", row_idx + 2))?;
        units.push(unit);
    }
    Ok(units)
}
