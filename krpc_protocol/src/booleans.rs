//! Bencode has no native boolean type; implementations send `0`/`1`
//! integers instead. This lenient (de)serializer maps between the two so
//! the message structs can use plain `bool` fields.

use serde::{Deserialize, Deserializer, Serializer};

pub fn is_false(b: &bool) -> bool {
    !b
}

pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(if *value { 1 } else { 0 })
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let n = i64::deserialize(deserializer)?;
    Ok(n != 0)
}

pub mod opt {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = Option::<i64>::deserialize(deserializer)?;
        Ok(n.map(|n| n != 0))
    }
}
