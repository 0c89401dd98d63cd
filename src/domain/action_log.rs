// ==========================================
// 集装箱配载引擎 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录,且与业务写入处于同一事务
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,             // 日志ID (uuid v4)
    pub shipment_id: Option<String>,   // 关联出运单
    pub container_id: Option<String>,  // 关联实箱
    pub action_type: ActionType,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>, // 操作参数
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以新的 action_id 构造日志
    pub fn new(action_type: ActionType, actor: &str, action_ts: NaiveDateTime) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            shipment_id: None,
            container_id: None,
            action_type,
            action_ts,
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_shipment(mut self, shipment_id: &str) -> Self {
        self.shipment_id = Some(shipment_id.to_string());
        self
    }

    pub fn with_container(mut self, container_id: &str) -> Self {
        self.container_id = Some(container_id.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateShipment,
    LinkCommitment,
    PlanLine,
    CreateContainer,
    RemoveContainer,
    AddAllocation,
    RemoveAllocation,
    ApplyPlan,
    MarkPacked,
    Seal,
    Unseal,
    StartPreparing,
    Confirm,
    Cancel,
    Dispatch,
    Deliver,
}

impl ActionType {
    pub const ALL: [ActionType; 16] = [
        ActionType::CreateShipment,
        ActionType::LinkCommitment,
        ActionType::PlanLine,
        ActionType::CreateContainer,
        ActionType::RemoveContainer,
        ActionType::AddAllocation,
        ActionType::RemoveAllocation,
        ActionType::ApplyPlan,
        ActionType::MarkPacked,
        ActionType::Seal,
        ActionType::Unseal,
        ActionType::StartPreparing,
        ActionType::Confirm,
        ActionType::Cancel,
        ActionType::Dispatch,
        ActionType::Deliver,
    ];

    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|t| t.to_db_str() == s)
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionType::CreateShipment => "CREATE_SHIPMENT",
            ActionType::LinkCommitment => "LINK_COMMITMENT",
            ActionType::PlanLine => "PLAN_LINE",
            ActionType::CreateContainer => "CREATE_CONTAINER",
            ActionType::RemoveContainer => "REMOVE_CONTAINER",
            ActionType::AddAllocation => "ADD_ALLOCATION",
            ActionType::RemoveAllocation => "REMOVE_ALLOCATION",
            ActionType::ApplyPlan => "APPLY_PLAN",
            ActionType::MarkPacked => "MARK_PACKED",
            ActionType::Seal => "SEAL",
            ActionType::Unseal => "UNSEAL",
            ActionType::StartPreparing => "START_PREPARING",
            ActionType::Confirm => "CONFIRM",
            ActionType::Cancel => "CANCEL",
            ActionType::Dispatch => "DISPATCH",
            ActionType::Deliver => "DELIVER",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
