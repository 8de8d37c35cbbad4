// ==========================================
// 隧道超前地质预报 - 预报分段管理
// ==========================================
// 职责: 在内存中维护分段列表（新增/编辑/删除）
// 红线: 不合法的分段（开始里程 > 结束里程等）不得进入列表
// ==========================================

use crate::domain::segment::{ForecastSegment, SegmentPatch};
use crate::engine::arena::{Arena, EntryKey};
use crate::engine::error::{ListError, ListResult};
use crate::engine::validator::{RecordValidator, ValidationError};
use tracing::debug;

/// 默认里程冠号
pub const DEFAULT_MILEAGE_NAME: &str = "DK";

#[derive(Debug, Clone)]
pub struct SegmentManager {
    entries: Arena<ForecastSegment>,
    validator: RecordValidator,
    /// 新分段的里程冠号（跟随记录基本信息）
    default_mileage_name: String,
}

impl Default for SegmentManager {
    fn default() -> Self {
        Self::new(RecordValidator::default())
    }
}

impl SegmentManager {
    pub fn new(validator: RecordValidator) -> Self {
        Self {
            entries: Arena::new(),
            validator,
            default_mileage_name: DEFAULT_MILEAGE_NAME.to_string(),
        }
    }

    /// 由已有记录的分段初始化（不重新校验）
    pub fn from_segments(segments: Vec<ForecastSegment>, validator: RecordValidator) -> Self {
        Self {
            entries: segments.into_iter().collect(),
            ..Self::new(validator)
        }
    }

    pub fn set_default_mileage_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.trim().is_empty() {
            self.default_mileage_name = name;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 新增分段（未持久化：pk=0，默认绿色/Ⅰ级）
    pub fn add(&mut self, patch: SegmentPatch) -> ListResult<EntryKey> {
        let mut segment = ForecastSegment {
            mileage_name: self.default_mileage_name.clone(),
            ..ForecastSegment::default()
        };
        segment.apply(&patch);
        self.check(self.entries.len(), &segment)?;

        let key = self.entries.push(segment);
        debug!(key = %key, len = self.entries.len(), "新增分段");
        Ok(key)
    }

    /// 按位置编辑；校验失败时原分段保持不变
    pub fn update(&mut self, index: usize, patch: SegmentPatch) -> ListResult<()> {
        let key = self.key_at(index)?;
        self.update_by_key(key, patch)
    }

    pub fn update_by_key(&mut self, key: EntryKey, patch: SegmentPatch) -> ListResult<()> {
        let position = self.entries.position(key).ok_or(ListError::UnknownKey(key))?;
        let current = self.entries.get(key).ok_or(ListError::UnknownKey(key))?;

        let mut edited = current.clone();
        edited.apply(&patch);
        self.check(position, &edited)?;

        if let Some(slot) = self.entries.get_mut(key) {
            *slot = edited;
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> ListResult<ForecastSegment> {
        let key = self.key_at(index)?;
        self.remove_by_key(key)
    }

    pub fn remove_by_key(&mut self, key: EntryKey) -> ListResult<ForecastSegment> {
        let removed = self.entries.remove(key).ok_or(ListError::UnknownKey(key))?;
        debug!(key = %key, pk = removed.pk, "删除分段");
        Ok(removed)
    }

    pub fn get(&self, index: usize) -> Option<&ForecastSegment> {
        self.entries.key_at(index).and_then(|k| self.entries.get(k))
    }

    pub fn key_at(&self, index: usize) -> ListResult<EntryKey> {
        self.entries.key_at(index).ok_or(ListError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// 当前顺序
    pub fn list(&self) -> Vec<&ForecastSegment> {
        self.entries.values().collect()
    }

    /// 当前顺序的副本（交给提交构建）
    pub fn snapshot(&self) -> Vec<ForecastSegment> {
        self.entries.values().cloned().collect()
    }

    /// 全量复核（从详情载入的分段可能不满足约束）
    pub fn validate_all(&self) -> Result<(), ValidationError> {
        let violations = self
            .entries
            .values()
            .enumerate()
            .flat_map(|(i, s)| self.validator.validate_segment(i, s))
            .collect();
        ValidationError::from_violations(violations)
    }

    fn check(&self, position: usize, segment: &ForecastSegment) -> Result<(), ValidationError> {
        ValidationError::from_violations(self.validator.validate_segment(position, segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{RiskCategory, RockGrade, SeverityColor};

    fn patch(start: f64, end: f64) -> SegmentPatch {
        SegmentPatch::default()
            .mileage(start, end)
            .at("2024-01-02 03:04:05")
            .risk(RiskCategory::Karst)
            .conclusion("岩溶发育")
    }

    #[test]
    fn test_add_fills_defaults() {
        let mut manager = SegmentManager::default();
        manager.set_default_mileage_name("X2DK");
        manager.add(patch(100.0, 130.0)).unwrap();

        let seg = manager.get(0).unwrap();
        assert_eq!(seg.pk, 0);
        assert!(!seg.is_persisted());
        assert_eq!(seg.mileage_name, "X2DK");
        assert_eq!(seg.severity, SeverityColor::Green);
        assert_eq!(seg.grade, RockGrade::I);
        assert_eq!(seg.risk_category, "岩溶");
    }

    #[test]
    fn test_reversed_mileage_rejected() {
        let mut manager = SegmentManager::default();
        let result = manager.add(patch(150.0, 120.0));
        assert!(matches!(result, Err(ListError::Validation(_))));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_failed_update_keeps_original() {
        let mut manager = SegmentManager::default();
        manager.add(patch(100.0, 130.0)).unwrap();

        let bad = SegmentPatch {
            end_mileage: Some(90.0),
            ..SegmentPatch::default()
        };
        assert!(manager.update(0, bad).is_err());
        assert_eq!(manager.get(0).unwrap().end_mileage, 130.0);

        manager
            .update(0, SegmentPatch::default().grade(RockGrade::V))
            .unwrap();
        assert_eq!(manager.get(0).unwrap().grade, RockGrade::V);
    }

    #[test]
    fn test_remove_and_out_of_range() {
        let mut manager = SegmentManager::default();
        manager.add(patch(0.0, 10.0)).unwrap();
        let k2 = manager.add(patch(10.0, 20.0)).unwrap();

        let removed = manager.remove(0).unwrap();
        assert_eq!(removed.end_mileage, 10.0);
        assert_eq!(manager.key_at(0).unwrap(), k2);
        assert!(matches!(
            manager.remove(5),
            Err(ListError::IndexOutOfRange { index: 5, len: 1 })
        ));
    }

    #[test]
    fn test_loaded_segments_revalidated() {
        let loaded = vec![ForecastSegment {
            mileage_name: "DK".to_string(),
            start_mileage: 50.0,
            end_mileage: 20.0,
            occurred_at: "2024-01-02T03:04:05".to_string(),
            risk_category: "涌水".to_string(),
            conclusion: "渗水".to_string(),
            ..ForecastSegment::default()
        }];
        let manager = SegmentManager::from_segments(loaded, RecordValidator::default());
        assert_eq!(manager.list().len(), 1);
        assert!(manager.validate_all().is_err());
    }
}
