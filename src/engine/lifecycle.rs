// ==========================================
// 隧道超前地质预报 - 记录生命周期
// ==========================================
// 状态: New -> Saved -> Submitted <-> Withdrawn
//   New -> Saved:               新增成功（后端分配标识）
//   Saved/Submitted <-> Withdrawn: 仅翻转 submitFlag，其余沿用上次完整载荷
// 保存失败时状态不变
// ==========================================

use crate::domain::record::ForecastRecord;
use crate::domain::types::SubmitFlag;
use crate::engine::submission::WirePayload;
use crate::i18n::t;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    New,
    Saved,
    Submitted,
    Withdrawn,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::New => "NEW",
            LifecycleState::Saved => "SAVED",
            LifecycleState::Submitted => "SUBMITTED",
            LifecycleState::Withdrawn => "WITHDRAWN",
        }
    }

    /// 本地化显示名
    pub fn display_name(&self) -> String {
        t(&format!("lifecycle.{}", self.as_str().to_lowercase()))
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("非法状态转换: {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("记录尚无标识，无法执行 {0}")]
    MissingIdentifier(&'static str),

    #[error("没有可重新提交的完整载荷")]
    MissingPayload,
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordLifecycle {
    state: LifecycleState,
    record_id: Option<i64>,
    /// 上次成功保存的完整载荷
    last_payload: Option<WirePayload>,
}

impl Default for RecordLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordLifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::New,
            record_id: None,
            last_payload: None,
        }
    }

    /// 由已打开的记录推断状态（submitFlag=1 为已上报，否则为已保存）
    pub fn from_record(record: &ForecastRecord, payload: WirePayload) -> Self {
        if !record.identity.is_persisted() {
            return Self::new();
        }
        let state = match record.submit_state() {
            SubmitFlag::Submitted => LifecycleState::Submitted,
            SubmitFlag::Draft => LifecycleState::Saved,
        };
        Self {
            state,
            record_id: record.identity.pk,
            last_payload: Some(payload),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn record_id(&self) -> Option<i64> {
        self.record_id
    }

    pub fn last_payload(&self) -> Option<&WirePayload> {
        self.last_payload.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.state == LifecycleState::New
    }

    /// 新增成功
    pub fn on_created(&mut self, record_id: i64, payload: WirePayload) -> LifecycleResult<()> {
        if self.state != LifecycleState::New {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: LifecycleState::Saved,
            });
        }
        self.record_id = Some(record_id);
        self.state = LifecycleState::Saved;
        self.last_payload = Some(payload);
        info!(record_id, state = %self.state, "记录已创建");
        Ok(())
    }

    /// 更新成功（submitFlag 跟随载荷）
    pub fn on_updated(&mut self, payload: WirePayload) -> LifecycleResult<()> {
        if self.state == LifecycleState::New {
            return Err(LifecycleError::MissingIdentifier("update"));
        }
        self.state = match (payload.submit_flag(), self.state) {
            (SubmitFlag::Submitted, _) => LifecycleState::Submitted,
            (SubmitFlag::Draft, LifecycleState::Submitted) => LifecycleState::Withdrawn,
            (SubmitFlag::Draft, LifecycleState::Withdrawn) => LifecycleState::Withdrawn,
            (SubmitFlag::Draft, _) => LifecycleState::Saved,
        };
        self.last_payload = Some(payload);
        Ok(())
    }

    /// 上报载荷：上次完整载荷 + submitFlag=1
    pub fn submit_payload(&self) -> LifecycleResult<WirePayload> {
        match self.state {
            LifecycleState::Saved | LifecycleState::Withdrawn => {}
            from => {
                return Err(LifecycleError::InvalidTransition {
                    from,
                    to: LifecycleState::Submitted,
                })
            }
        }
        self.flipped(SubmitFlag::Submitted)
    }

    /// 撤回载荷：上次完整载荷 + submitFlag=0
    pub fn withdraw_payload(&self) -> LifecycleResult<WirePayload> {
        match self.state {
            LifecycleState::Saved | LifecycleState::Submitted => {}
            from => {
                return Err(LifecycleError::InvalidTransition {
                    from,
                    to: LifecycleState::Withdrawn,
                })
            }
        }
        self.flipped(SubmitFlag::Draft)
    }

    /// 重新读取记录后替换上次载荷（状态不变）
    pub fn refresh_payload(&mut self, payload: WirePayload) {
        if self.record_id.is_some() {
            self.last_payload = Some(payload);
        }
    }

    /// 上报成功
    pub fn on_submitted(&mut self, payload: WirePayload) {
        self.state = LifecycleState::Submitted;
        self.last_payload = Some(payload);
        info!(record_id = ?self.record_id, "记录已上报");
    }

    /// 撤回成功
    pub fn on_withdrawn(&mut self, payload: WirePayload) {
        self.state = LifecycleState::Withdrawn;
        self.last_payload = Some(payload);
        info!(record_id = ?self.record_id, "记录已撤回");
    }

    fn flipped(&self, flag: SubmitFlag) -> LifecycleResult<WirePayload> {
        if self.record_id.is_none() {
            return Err(LifecycleError::MissingIdentifier("submitFlag"));
        }
        self.last_payload
            .as_ref()
            .map(|p| p.with_submit_flag(flag))
            .ok_or(LifecycleError::MissingPayload)
    }
}
