//! Serde adapters for protobuf `bytes` fields, which the Mesos JSON mapping
//! carries as standard base64 strings.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

pub mod base64_bytes {
    use super::*;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(raw.trim())
            .map_err(serde::de::Error::custom)
    }
}

pub mod base64_bytes_opt {
    use super::*;

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&BASE64_STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| {
            BASE64_STANDARD
                .decode(value.trim())
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Carrier {
        #[serde(with = "super::base64_bytes")]
        data: Vec<u8>,
        #[serde(
            default,
            with = "super::base64_bytes_opt",
            skip_serializing_if = "Option::is_none"
        )]
        uuid: Option<Vec<u8>>,
    }

    #[test]
    fn unit_bytes_fields_serialize_as_base64() {
        let carrier = Carrier {
            data: b"hello".to_vec(),
            uuid: None,
        };
        let raw = serde_json::to_string(&carrier).expect("serialize carrier");
        assert_eq!(raw, r#"{"data":"aGVsbG8="}"#);
    }

    #[test]
    fn unit_optional_bytes_accept_missing_and_present_values() {
        let parsed: Carrier =
            serde_json::from_str(r#"{"data":"","uuid":"AQID"}"#).expect("parse carrier");
        assert!(parsed.data.is_empty());
        assert_eq!(parsed.uuid, Some(vec![1, 2, 3]));

        let parsed: Carrier = serde_json::from_str(r#"{"data":"AA=="}"#).expect("parse carrier");
        assert_eq!(parsed.uuid, None);
    }

    #[test]
    fn regression_invalid_base64_is_a_decode_error() {
        let error = serde_json::from_str::<Carrier>(r#"{"data":"%%%"}"#)
            .expect_err("invalid base64 should fail");
        assert!(error.to_string().contains("Invalid"), "{error}");
    }
}
