// ==========================================
// 隧道超前地质预报 - 有序集合（稳定键）
// ==========================================
// 条目以 EntryKey 标识，位置只是派生视图；
// 删除/重排不会使其他条目的键失效
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// 条目稳定键（内存内，不上传）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey(Uuid);

impl EntryKey {
    fn new() -> Self {
        EntryKey(Uuid::new_v4())
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: HashMap<EntryKey, T>,
    order: Vec<EntryKey>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 追加到末尾，返回新键
    pub fn push(&mut self, value: T) -> EntryKey {
        let key = EntryKey::new();
        self.slots.insert(key, value);
        self.order.push(key);
        key
    }

    pub fn get(&self, key: EntryKey) -> Option<&T> {
        self.slots.get(&key)
    }

    pub fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        self.slots.get_mut(&key)
    }

    pub fn key_at(&self, position: usize) -> Option<EntryKey> {
        self.order.get(position).copied()
    }

    pub fn position(&self, key: EntryKey) -> Option<usize> {
        self.order.iter().position(|k| *k == key)
    }

    pub fn remove(&mut self, key: EntryKey) -> Option<T> {
        let pos = self.position(key)?;
        self.order.remove(pos);
        self.slots.remove(&key)
    }

    /// 移动到新位置（越界时移到末尾）
    pub fn move_to(&mut self, key: EntryKey, position: usize) -> bool {
        let Some(from) = self.position(key) else {
            return false;
        };
        self.order.remove(from);
        let to = position.min(self.order.len());
        self.order.insert(to, key);
        true
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }

    /// 按当前顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (EntryKey, &T)> + '_ {
        self.order
            .iter()
            .filter_map(move |k| self.slots.get(k).map(|v| (*k, v)))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn keys(&self) -> Vec<EntryKey> {
        self.order.clone()
    }
}

impl<T> FromIterator<T> for Arena<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut arena = Arena::new();
        for value in iter {
            arena.push(value);
        }
        arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_survive_removal_and_reorder() {
        let mut arena: Arena<&str> = ["a", "b", "c"].into_iter().collect();
        let kb = arena.key_at(1).unwrap();
        let kc = arena.key_at(2).unwrap();

        let removed = arena.remove(arena.key_at(0).unwrap());
        assert_eq!(removed, Some("a"));
        assert_eq!(arena.position(kb), Some(0));
        assert_eq!(arena.get(kc), Some(&"c"));

        assert!(arena.move_to(kc, 0));
        let values: Vec<&str> = arena.values().copied().collect();
        assert_eq!(values, vec!["c", "b"]);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_missing_key() {
        let mut arena: Arena<i32> = Arena::new();
        let k = arena.push(1);
        arena.clear();
        assert!(arena.get(k).is_none());
        assert!(!arena.move_to(k, 0));
        assert!(arena.is_empty());
    }
}
