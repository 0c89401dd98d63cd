// ==========================================
// 集装箱配载引擎 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录,且与业务写入处于同一事务
// 红线: 日志只追加,不更新不删除
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
