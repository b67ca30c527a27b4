use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{ProviderError, Result};

/// Record identifier, rendered verbatim into resource URLs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Integer(i64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Uniform `{ "data": ... }` wrapper returned by every CRUD operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope<T = JsonValue> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl DataEnvelope<JsonValue> {
    /// Deserializes the payload into a caller type.
    pub fn decode<U: DeserializeOwned>(self) -> Result<DataEnvelope<U>> {
        serde_json::from_value(self.data)
            .map(DataEnvelope::new)
            .map_err(|err| ProviderError::Decode(format!("unexpected payload shape: {err}")))
    }
}

/// Payload of a delete: the requested id, echoed back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: Id,
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::{DataEnvelope, DeletedRecord, Id};
    use crate::ProviderError;

    #[test]
    fn id_displays_verbatim_and_serializes_untagged() {
        assert_eq!(Id::from(7).to_string(), "7");
        assert_eq!(Id::from("a-b").to_string(), "a-b");
        assert_eq!(serde_json::to_value(Id::from(7)).expect("must serialize"), json!(7));
        assert_eq!(
            serde_json::to_value(DataEnvelope::new(DeletedRecord { id: Id::from("x") }))
                .expect("must serialize"),
            json!({"data": {"id": "x"}})
        );
    }

    #[test]
    fn decode_into_typed_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Widget {
            id: u32,
            name: String,
        }

        let envelope = DataEnvelope::new(json!([{"id": 1, "name": "bolt"}]));
        let typed = envelope.decode::<Vec<Widget>>().expect("must decode");
        assert_eq!(
            typed.data,
            vec![Widget {
                id: 1,
                name: "bolt".to_owned()
            }]
        );

        let err = DataEnvelope::new(json!("nope"))
            .decode::<Vec<Widget>>()
            .expect_err("must fail");
        assert!(matches!(err, ProviderError::Decode(_)));
    }
}
