// ==========================================
// 集装箱配载引擎 - 实箱数据仓储
// ==========================================
// 红线: current_weight / current_volume 只能由 refresh_totals_with 从配载记录汇总写入
// 红线: seal_number 全库唯一（表约束兜底）
// ==========================================

mod core;
mod queries;


pub use core::ContainerRepository;
