// ==========================================
// 隧道超前地质预报 - 引擎层错误
// ==========================================

use crate::domain::point::PointError;
use crate::domain::types::MethodTag;
use crate::engine::arena::EntryKey;
use crate::engine::validator::ValidationError;
use thiserror::Error;

/// 子记录列表操作错误
#[derive(Error, Debug)]
pub enum ListError {
    #[error("位置越界: index={index}, len={len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("条目不存在: key={0}")]
    UnknownKey(EntryKey),

    #[error("方法 {0} 没有辅助点列表")]
    NoPointList(MethodTag),

    #[error(transparent)]
    Point(#[from] PointError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type ListResult<T> = Result<T, ListError>;

/// 提交构建错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("方法不一致: 期望 {expected}, 实际 {found}")]
    MethodMismatch { expected: MethodTag, found: MethodTag },
}
