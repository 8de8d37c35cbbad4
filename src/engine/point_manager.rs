// ==========================================
// 隧道超前地质预报 - 辅助点管理
// ==========================================
// 职责: 维护测点/测线/电极/钻孔列表
// 形状由方法决定；序号默认按位置，删除后自动前移
// ==========================================

use crate::domain::point::{AuxiliaryPoint, PointData, PointError, PointPatch};
use crate::domain::types::{MethodTag, PointKind};
use crate::engine::arena::{Arena, EntryKey};
use crate::engine::error::{ListError, ListResult};
use crate::engine::schema_registry::{schema_for, PointShape};
use crate::engine::validator::{RecordValidator, ValidationError, VIOLATION_DUPLICATE_LABEL};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PointManager {
    method: MethodTag,
    shape: &'static PointShape,
    entries: Arena<AuxiliaryPoint>,
    validator: RecordValidator,
}

impl PointManager {
    /// 方法无点列表时返回 NoPointList
    pub fn new(method: MethodTag) -> ListResult<Self> {
        let shape = schema_for(method)
            .point_shape
            .ok_or(ListError::NoPointList(method))?;
        Ok(Self {
            method,
            shape,
            entries: Arena::new(),
            validator: RecordValidator::default(),
        })
    }

    pub fn from_points(method: MethodTag, points: Vec<AuxiliaryPoint>) -> ListResult<Self> {
        let mut manager = Self::new(method)?;
        for p in &points {
            manager.check_shape(&p.data)?;
        }
        manager.entries = points.into_iter().collect();
        Ok(manager)
    }

    pub fn method(&self) -> MethodTag {
        self.method
    }

    pub fn kind(&self) -> PointKind {
        self.shape.kind
    }

    pub fn shape(&self) -> &'static PointShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 新增点（pk=0；父标识在构建提交时确定）
    pub fn add(&mut self, point: AuxiliaryPoint) -> ListResult<EntryKey> {
        self.check_shape(&point.data)?;
        let mut point = point;
        point.pk = 0;
        point.parent_pk = 0;

        let mut candidate = self.snapshot();
        candidate.push(point.clone());
        self.check_list(&candidate)?;

        let key = self.entries.push(point);
        debug!(kind = ?self.shape.kind, len = self.entries.len(), "新增辅助点");
        Ok(key)
    }

    pub fn update(&mut self, index: usize, patch: PointPatch) -> ListResult<()> {
        let key = self.key_at(index)?;
        self.update_by_key(key, patch)
    }

    /// 编辑；校验失败时原点保持不变
    pub fn update_by_key(&mut self, key: EntryKey, patch: PointPatch) -> ListResult<()> {
        let position = self.entries.position(key).ok_or(ListError::UnknownKey(key))?;
        let mut edited = self
            .entries
            .get(key)
            .cloned()
            .ok_or(ListError::UnknownKey(key))?;
        edited.apply(&patch)?;

        let mut candidate = self.snapshot();
        candidate[position] = edited.clone();
        self.check_list(&candidate)?;

        if let Some(slot) = self.entries.get_mut(key) {
            *slot = edited;
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> ListResult<AuxiliaryPoint> {
        let key = self.key_at(index)?;
        self.remove_by_key(key)
    }

    /// 删除；自动序号前移后与指定序号重复时拒绝，列表保持不变
    pub fn remove_by_key(&mut self, key: EntryKey) -> ListResult<AuxiliaryPoint> {
        if self.entries.get(key).is_none() {
            return Err(ListError::UnknownKey(key));
        }
        let candidate: Vec<AuxiliaryPoint> = self
            .entries
            .iter()
            .filter(|(k, _)| *k != key)
            .map(|(_, p)| p.clone())
            .collect();
        let duplicates: Vec<_> = self
            .validator
            .validate_points(self.method, &candidate)
            .into_iter()
            .filter(|v| v.violation_type == VIOLATION_DUPLICATE_LABEL)
            .collect();
        ValidationError::from_violations(duplicates)?;

        let removed = self.entries.remove(key).ok_or(ListError::UnknownKey(key))?;
        debug!(pk = removed.pk, "删除辅助点");
        Ok(removed)
    }

    pub fn get(&self, index: usize) -> Option<&AuxiliaryPoint> {
        self.entries.key_at(index).and_then(|k| self.entries.get(k))
    }

    pub fn key_at(&self, index: usize) -> ListResult<EntryKey> {
        self.entries.key_at(index).ok_or(ListError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    pub fn list(&self) -> Vec<&AuxiliaryPoint> {
        self.entries.values().collect()
    }

    pub fn snapshot(&self) -> Vec<AuxiliaryPoint> {
        self.entries.values().cloned().collect()
    }

    pub fn validate_all(&self) -> Result<(), ValidationError> {
        self.check_list(&self.snapshot())
    }

    fn check_shape(&self, data: &PointData) -> Result<(), PointError> {
        if data.kind() != self.shape.kind {
            return Err(PointError::ShapeMismatch {
                expected: self.shape.kind,
                found: data.kind(),
            });
        }
        Ok(())
    }

    fn check_list(&self, points: &[AuxiliaryPoint]) -> Result<(), ValidationError> {
        ValidationError::from_violations(self.validator.validate_points(self.method, points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::point::{SequenceLabel, SonarPoint};
    use crate::domain::types::ElectrodeKind;
    use serde_json::json;

    #[test]
    fn test_method_without_points() {
        assert!(matches!(
            PointManager::new(MethodTag::Tsp),
            Err(ListError::NoPointList(MethodTag::Tsp))
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut manager = PointManager::new(MethodTag::EmReflection).unwrap();
        let result = manager.add(AuxiliaryPoint::sonar(1.0, 2.0));
        assert!(matches!(
            result,
            Err(ListError::Point(PointError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_remove_shifts_positions_keeps_values() {
        let mut manager = PointManager::new(MethodTag::LandSonar).unwrap();
        manager.add(AuxiliaryPoint::sonar(1.0, 1.5)).unwrap();
        manager.add(AuxiliaryPoint::sonar(2.0, 2.5)).unwrap();
        manager.add(AuxiliaryPoint::sonar(3.0, 3.5)).unwrap();

        manager.remove(0).unwrap();
        let points = manager.snapshot();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].label_value(0), Some(json!(1)));
        assert_eq!(
            points[0].data,
            PointData::Sonar(SonarPoint {
                crown_distance: Some(2.0),
                left_line_distance: Some(2.5),
            })
        );
        assert_eq!(points[1].label_value(1), Some(json!(2)));
    }

    #[test]
    fn test_explicit_labels_unique() {
        let mut manager = PointManager::new(MethodTag::HighResResistivity).unwrap();
        manager
            .add(AuxiliaryPoint::electrode(ElectrodeKind::PowerSupply, 0.0).with_label("DJ101"))
            .unwrap();
        let dup = AuxiliaryPoint::electrode(ElectrodeKind::Measurement, 5.0).with_label("DJ101");
        assert!(matches!(manager.add(dup), Err(ListError::Validation(_))));

        manager
            .add(AuxiliaryPoint::electrode(ElectrodeKind::Measurement, 5.0))
            .unwrap();
        manager
            .update(
                1,
                PointPatch::label(SequenceLabel::Explicit("DJ102".to_string())),
            )
            .unwrap();
        assert_eq!(manager.get(1).unwrap().label_value(1), Some(json!("DJ102")));
    }

    #[test]
    fn test_remove_rejected_when_auto_label_collides() {
        // DJ005, 自动(DJ002), DJ001：删除首项后自动序号变为 DJ001
        let mut manager = PointManager::new(MethodTag::HighResResistivity).unwrap();
        manager
            .add(AuxiliaryPoint::electrode(ElectrodeKind::PowerSupply, 0.0).with_label("DJ005"))
            .unwrap();
        manager
            .add(AuxiliaryPoint::electrode(ElectrodeKind::Measurement, 5.0))
            .unwrap();
        manager
            .add(AuxiliaryPoint::electrode(ElectrodeKind::Measurement, 10.0).with_label("DJ001"))
            .unwrap();
        assert!(manager.validate_all().is_ok());

        let err = manager.remove(0).unwrap_err();
        match err {
            ListError::Validation(e) => {
                assert_eq!(e.fields(), vec!["gfbzldResultinfoDTOList[1].djxh"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(manager.len(), 3);
        assert!(manager.validate_all().is_ok());

        // 无冲突的删除照常执行
        manager.remove(1).unwrap();
        assert_eq!(manager.len(), 2);
        assert!(manager.validate_all().is_ok());
    }

    #[test]
    fn test_required_point_field() {
        let mut manager = PointManager::new(MethodTag::DrillingAdvanced).unwrap();
        let blank = AuxiliaryPoint::advanced_borehole(" ", 3.0, 20.0, "");
        assert!(matches!(manager.add(blank), Err(ListError::Validation(_))));
        manager
            .add(AuxiliaryPoint::advanced_borehole("拱顶", 3.0, 20.0, "完整"))
            .unwrap();
        assert_eq!(manager.len(), 1);
    }
}
