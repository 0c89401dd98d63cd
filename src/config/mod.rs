// ==========================================
// 集装箱配载引擎 - 配置层
// ==========================================
// 职责: 配载阈值管理,支持整体 JSON 与单项覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod loading_profile;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ConfigScope};
pub use loading_profile::LoadingThresholds;
