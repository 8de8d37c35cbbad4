// ==========================================
// 隧道超前地质预报 - 附件引用
// ==========================================
// 记录中附件只保存文件名，路径约定:
//   {siteId}/{方法简码}/{记录标识}/{文件名}
// 空串表示未上传；"1" 为后端占位值，同样表示无文件
// ==========================================

use crate::domain::types::MethodTag;
use serde::{Deserialize, Serialize};

/// 后端“无文件”占位值
pub const NO_FILE_SENTINEL: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    /// 有效文件名
    File(String),
    /// 空串/缺失
    Empty,
    /// 后端占位值 "1"
    Placeholder,
}

impl Attachment {
    pub fn from_field(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Attachment::Empty,
            Some(NO_FILE_SENTINEL) => Attachment::Placeholder,
            Some(name) => Attachment::File(name.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Attachment::File(_))
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            Attachment::File(name) => Some(name),
            _ => None,
        }
    }

    /// 写回线上字段的值（永不省略）
    pub fn wire_value(&self) -> String {
        match self {
            Attachment::File(name) => name.clone(),
            Attachment::Empty => String::new(),
            Attachment::Placeholder => NO_FILE_SENTINEL.to_string(),
        }
    }
}

/// 解析附件访问路径；不可用时返回 None（界面显示“暂无”）
pub fn attachment_path(
    site_id: &str,
    method: MethodTag,
    record_id: i64,
    file: &Attachment,
) -> Option<String> {
    let name = file.file_name()?;
    Some(format!(
        "{}/{}/{}/{}",
        site_id.trim(),
        method.short_code(),
        record_id,
        name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_and_empty_not_available() {
        assert_eq!(Attachment::from_field(Some("1")), Attachment::Placeholder);
        assert_eq!(Attachment::from_field(Some("")), Attachment::Empty);
        assert_eq!(Attachment::from_field(None), Attachment::Empty);
        assert!(!Attachment::Placeholder.is_available());
        assert_eq!(Attachment::Placeholder.wire_value(), "1");
    }

    #[test]
    fn test_attachment_path() {
        let file = Attachment::from_field(Some("face_001.jpg"));
        assert_eq!(
            attachment_path("S12", MethodTag::FaceSketch, 345, &file).as_deref(),
            Some("S12/zzmsm/345/face_001.jpg")
        );
        assert_eq!(
            attachment_path("S12", MethodTag::Hsp, 345, &Attachment::Placeholder),
            None
        );
    }
}
