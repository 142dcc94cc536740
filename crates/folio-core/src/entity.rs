use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EditError;

/// Identifier of an entity, unique within one content state lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(u64);

impl EntityKey {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Link,
    Image,
    Video,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Link => "LINK",
            EntityType::Image => "IMAGE",
            EntityType::Video => "VIDEO",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    // Some producers write entity types in lower case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LINK" => Ok(EntityType::Link),
            "IMAGE" => Ok(EntityType::Image),
            "VIDEO" => Ok(EntityType::Video),
            other => Err(format!("Unknown entity type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mutability {
    Mutable,
    Immutable,
}

pub type EntityData = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub mutability: Mutability,
    #[serde(default)]
    pub data: EntityData,
}

impl Entity {
    pub fn new(entity_type: EntityType, mutability: Mutability, data: EntityData) -> Self {
        Self {
            entity_type,
            mutability,
            data,
        }
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Entities owned by a content state. Storage is shared between revisions
/// and copied on first write, so old revisions keep their entity data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMap {
    #[serde(default)]
    entries: Arc<BTreeMap<EntityKey, Entity>>,
    #[serde(default)]
    last_key: u64,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        entity_type: EntityType,
        mutability: Mutability,
        data: EntityData,
    ) -> EntityKey {
        let next = self
            .entries
            .keys()
            .next_back()
            .map(|key| key.get())
            .unwrap_or(0)
            .max(self.last_key)
            + 1;
        self.last_key = next;
        let key = EntityKey::new(next);
        Arc::make_mut(&mut self.entries).insert(key, Entity::new(entity_type, mutability, data));
        key
    }

    /// Inserts an entity under an existing key (used when loading stored content).
    pub fn insert(&mut self, key: EntityKey, entity: Entity) {
        self.last_key = self.last_key.max(key.get());
        Arc::make_mut(&mut self.entries).insert(key, entity);
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn last_created(&self) -> Option<EntityKey> {
        (self.last_key > 0).then(|| EntityKey::new(self.last_key))
    }

    pub fn merge_data(&mut self, key: EntityKey, data: EntityData) -> Result<(), EditError> {
        if !self.contains(key) {
            return Err(EditError::UnknownEntity(key));
        }
        if let Some(entity) = Arc::make_mut(&mut self.entries).get_mut(&key) {
            entity.data.extend(data);
        }
        Ok(())
    }

    pub fn replace_data(&mut self, key: EntityKey, data: EntityData) -> Result<(), EditError> {
        let entity = Arc::make_mut(&mut self.entries)
            .get_mut(&key)
            .ok_or(EditError::UnknownEntity(key))?;
        entity.data = data;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entries.iter().map(|(key, entity)| (*key, entity))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when both maps still point at the same storage.
    pub fn shares_storage(&self, other: &EntityMap) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_copies_on_write() {
        let mut map = EntityMap::new();
        let key = map.create(
            EntityType::Image,
            Mutability::Immutable,
            EntityData::from([("src".to_string(), Value::from("a.png"))]),
        );
        let before = map.clone();
        assert!(map.shares_storage(&before));

        map.merge_data(key, EntityData::from([("width".to_string(), Value::from("50%"))]))
            .unwrap();
        assert!(!map.shares_storage(&before));
        assert_eq!(before.get(key).unwrap().data.get("width"), None);
        assert_eq!(map.get(key).unwrap().data_str("width"), Some("50%"));
        assert_eq!(map.get(key).unwrap().data_str("src"), Some("a.png"));
    }

    #[test]
    fn keys_keep_increasing() {
        let mut map = EntityMap::new();
        let a = map.create(EntityType::Link, Mutability::Mutable, EntityData::new());
        let b = map.create(EntityType::Link, Mutability::Mutable, EntityData::new());
        assert!(b > a);
        assert_eq!(map.last_created(), Some(b));
    }

    #[test]
    fn entity_type_parses_lower_case() {
        assert_eq!("image".parse::<EntityType>(), Ok(EntityType::Image));
        assert!("embed".parse::<EntityType>().is_err());
    }
}
