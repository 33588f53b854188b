//! Decoding of delta payloads into registry [`Delta`]s.
//!
//! A payload is a JSON object. Its `gameObjects` member maps entity ids to
//! attribute patches (or to the removal marker); every other member patches
//! the root `Game` entity.
use std::collections::BTreeMap;

use game_state::{AttributePatch, AttributePatches, Delta, DeltaEntry, EntityId, TypeTag, Value};
use serde::Deserialize;
use serde_json::Map;

use super::ProtocolError;
use super::json::{as_reference, snake_case, value_from_json};

const GAME_OBJECTS: &str = "gameObjects";
const GAME_OBJECT_NAME: &str = "gameObjectName";
const GAME_TYPE: &str = "Game";

/// Marker strings the server uses inside deltas. Announced in `lobbied`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeltaConstants {
    /// Value standing for "this entity / key was removed".
    #[serde(rename = "DELTA_REMOVED")]
    pub removed: String,
    /// Key carrying the length of a list sent as an index object.
    #[serde(rename = "DELTA_LIST_LENGTH")]
    pub list_length: String,
}

impl Default for DeltaConstants {
    fn default() -> Self {
        Self {
            removed: "&RM".to_owned(),
            list_length: "&LEN".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeltaDecoder {
    constants: DeltaConstants,
}

impl DeltaDecoder {
    pub fn new(constants: DeltaConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &DeltaConstants {
        &self.constants
    }

    pub fn set_constants(&mut self, constants: DeltaConstants) {
        self.constants = constants;
    }

    pub fn decode(&self, payload: &serde_json::Value) -> Result<Delta, ProtocolError> {
        let root = payload
            .as_object()
            .ok_or_else(|| malformed("payload is not an object"))?;

        let mut delta = Delta::new();
        let mut game_patch = AttributePatches::new();

        for (key, value) in root {
            if key == GAME_OBJECTS {
                self.decode_objects(value, &mut delta)?;
            } else {
                game_patch.insert(snake_case(key), self.decode_attribute(value)?);
            }
        }

        if !game_patch.is_empty() {
            delta.push(DeltaEntry::Upsert {
                id: EntityId::game(),
                type_tag: Some(TypeTag::new(GAME_TYPE)),
                patch: game_patch,
            });
        }
        Ok(delta)
    }

    fn decode_objects(
        &self,
        objects: &serde_json::Value,
        delta: &mut Delta,
    ) -> Result<(), ProtocolError> {
        let objects = objects
            .as_object()
            .ok_or_else(|| malformed("`gameObjects` is not an object"))?;

        for (id, body) in objects {
            match body {
                serde_json::Value::String(marker) if *marker == self.constants.removed => {
                    delta.push(DeltaEntry::Delete {
                        id: EntityId::new(id.as_str()),
                    });
                }
                serde_json::Value::Object(fields) => {
                    let type_tag = match fields.get(GAME_OBJECT_NAME) {
                        None => None,
                        Some(serde_json::Value::String(tag)) => Some(TypeTag::new(tag.as_str())),
                        Some(_) => {
                            return Err(malformed(format!(
                                "object {id} has a non-string type name"
                            )));
                        }
                    };
                    let mut patch = AttributePatches::new();
                    for (key, value) in fields {
                        patch.insert(snake_case(key), self.decode_attribute(value)?);
                    }
                    delta.push(DeltaEntry::Upsert {
                        id: EntityId::new(id.as_str()),
                        type_tag,
                        patch,
                    });
                }
                _ => return Err(malformed(format!("object {id} is neither a patch nor a removal"))),
            }
        }
        Ok(())
    }

    fn decode_attribute(&self, value: &serde_json::Value) -> Result<AttributePatch, ProtocolError> {
        Ok(match value {
            serde_json::Value::String(marker) if *marker == self.constants.removed => {
                AttributePatch::Remove
            }
            serde_json::Value::Object(object) => {
                if let Some(id) = as_reference(object) {
                    AttributePatch::Set(Value::Ref(id))
                } else if object.contains_key(&self.constants.list_length) {
                    AttributePatch::Set(self.decode_list(object)?)
                } else {
                    AttributePatch::MergeEntries(self.decode_entries(object))
                }
            }
            other => AttributePatch::Set(value_from_json(other)),
        })
    }

    /// A list sent as `{"&LEN": n, "0": .., ..}` must carry every index.
    fn decode_list(
        &self,
        object: &Map<String, serde_json::Value>,
    ) -> Result<Value, ProtocolError> {
        let len = object
            .get(&self.constants.list_length)
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| malformed("list length is not a non-negative integer"))?;

        // Every index plus the length key itself; checked before allocating.
        if len.checked_add(1) != Some(object.len() as u64) {
            return Err(malformed(format!(
                "list of length {len} carries {} entries",
                object.len().saturating_sub(1)
            )));
        }

        let mut items = Vec::with_capacity(object.len() - 1);
        for index in 0..len {
            let item = object.get(&index.to_string()).ok_or_else(|| {
                malformed(format!("list of length {len} is missing index {index}"))
            })?;
            if item.as_str() == Some(self.constants.removed.as_str()) {
                return Err(malformed(format!("list index {index} is marked removed")));
            }
            items.push(value_from_json(item));
        }
        Ok(Value::List(items))
    }

    fn decode_entries(
        &self,
        object: &Map<String, serde_json::Value>,
    ) -> BTreeMap<String, Option<Value>> {
        object
            .iter()
            .map(|(key, value)| {
                let entry = match value {
                    serde_json::Value::String(marker) if *marker == self.constants.removed => None,
                    other => Some(value_from_json(other)),
                };
                (key.clone(), entry)
            })
            .collect()
    }
}

fn malformed(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::MalformedDelta(reason.into())
}
