// ==========================================
// 行映射辅助: 时间戳与枚举的文本编解码
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::types::Type;

pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDateTime>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

/// 解析枚举列; 未知值视为数据损坏
pub(crate) fn parse_enum<T>(idx: usize, raw: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("未知枚举值: {}", raw).into(),
        )
    })
}
