//! Wire types for the dashboard data endpoint.
//!
//! Field decoding is forgiving: a single malformed value is
//! treated as absent and never fails the whole row.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One token's display record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, deserialize_with = "lenient_text")]
    pub coin_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub coin_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub pct_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub pct_7d: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub current_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub current_market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub total_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub total_market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub found_raises: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub investor_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub financing_valuation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub financing_based_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub annualized_income: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub income_valuation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub income_based_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tokenomics: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vesting: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cexs: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tags: Option<String>,
    /// Market data timestamp as sent by the server; carried, not rendered.
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_updated: Option<String>,
}

/// Full response for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub rows: Vec<Row>,
    /// Seconds since the epoch; the server may send a float.
    #[serde(default, deserialize_with = "lenient_num")]
    pub last_refresh_epoch: Option<f64>,
    #[serde(default, deserialize_with = "lenient_num")]
    pub next_refresh_epoch: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{ rows, last_refresh_epoch, next_refresh_epoch }`
    Current,
    /// Bare array of rows, no refresh metadata. Deprecated.
    Legacy,
}

impl PayloadShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::Current => "current",
            PayloadShape::Legacy => "legacy",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPayload {
    pub payload: Payload,
    pub shape: PayloadShape,
}

/// Decode a response body in either the current or the legacy shape.
pub fn decode_payload(body: &[u8]) -> Result<FetchedPayload> {
    let value: Value = serde_json::from_slice(body).context("response is not valid JSON")?;
    match value {
        Value::Object(_) => {
            let payload: Payload =
                serde_json::from_value(value).context("malformed payload object")?;
            Ok(FetchedPayload {
                payload,
                shape: PayloadShape::Current,
            })
        }
        Value::Array(_) => {
            let rows: Vec<Row> = serde_json::from_value(value).context("malformed row array")?;
            Ok(FetchedPayload {
                payload: Payload {
                    rows,
                    ..Payload::default()
                },
                shape: PayloadShape::Legacy,
            })
        }
        other => Err(anyhow!("unexpected payload type: {}", json_type(&other))),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numbers and numeric strings are kept; everything else (including NaN) is absent.
pub fn num_from_value(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    n.filter(|x| x.is_finite())
}

pub fn text_from_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(text_from_value)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

fn lenient_num<'de, D>(de: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    Ok(num_from_value(&v))
}

fn lenient_text<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    Ok(text_from_value(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_current_shape() {
        let body = br#"{
            "rows": [{"coin_id": "bitcoin", "coin_name": "Bitcoin", "price": 65000.5}],
            "last_refresh_epoch": 1700000000,
            "next_refresh_epoch": 1700000300.25
        }"#;
        let fetched = decode_payload(body).unwrap();
        assert_eq!(fetched.shape, PayloadShape::Current);
        assert_eq!(fetched.payload.rows.len(), 1);
        assert_eq!(fetched.payload.rows[0].coin_id.as_deref(), Some("bitcoin"));
        assert_eq!(fetched.payload.last_refresh_epoch, Some(1_700_000_000.0));
        assert_eq!(fetched.payload.next_refresh_epoch, Some(1_700_000_300.25));
    }

    #[test]
    fn test_decode_legacy_shape() {
        let body = br#"[{"coin_name": "Ethereum", "price": 3000}, {"coin_name": "Solana"}]"#;
        let fetched = decode_payload(body).unwrap();
        assert_eq!(fetched.shape, PayloadShape::Legacy);
        assert_eq!(fetched.payload.rows.len(), 2);
        assert!(fetched.payload.last_refresh_epoch.is_none());
        assert!(fetched.payload.next_refresh_epoch.is_none());
    }

    #[test]
    fn test_decode_empty_legacy_array() {
        let fetched = decode_payload(b"[]").unwrap();
        assert_eq!(fetched.shape, PayloadShape::Legacy);
        assert!(fetched.payload.rows.is_empty());
    }

    #[test]
    fn test_decode_rejects_scalars_and_garbage() {
        assert!(decode_payload(b"42").is_err());
        assert!(decode_payload(b"\"rows\"").is_err());
        assert!(decode_payload(b"<html>").is_err());
        assert!(decode_payload(br#"{"last_refresh_epoch": 1}"#).is_err());
    }

    #[test]
    fn test_null_epochs_are_absent() {
        let body = br#"{"rows": [], "last_refresh_epoch": null, "next_refresh_epoch": null}"#;
        let fetched = decode_payload(body).unwrap();
        assert!(fetched.payload.last_refresh_epoch.is_none());
        assert!(fetched.payload.next_refresh_epoch.is_none());
    }

    #[test]
    fn test_malformed_fields_are_absent() {
        let body = br#"[{
            "price": "abc",
            "current_supply": "1200.5",
            "total_supply": "",
            "found_raises": true,
            "investor_percentage": {"x": 1},
            "tokenomics": 12,
            "vesting": null,
            "tags": ["defi", "l2"]
        }]"#;
        let row = &decode_payload(body).unwrap().payload.rows[0];
        assert!(row.price.is_none());
        assert_eq!(row.current_supply, Some(1200.5));
        assert!(row.total_supply.is_none());
        assert!(row.found_raises.is_none());
        assert!(row.investor_percentage.is_none());
        assert_eq!(row.tokenomics.as_deref(), Some("12"));
        assert!(row.vesting.is_none());
        assert_eq!(row.tags.as_deref(), Some("defi, l2"));
    }

    #[test]
    fn test_non_finite_strings_are_absent() {
        assert!(num_from_value(&Value::String("NaN".into())).is_none());
        assert!(num_from_value(&Value::String("inf".into())).is_none());
        assert_eq!(num_from_value(&Value::String(" 3.5 ".into())), Some(3.5));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let body = br#"{"rows": [{"coin_name": "X", "buy_price": 1, "profit": 2}], "extra": true}"#;
        let fetched = decode_payload(body).unwrap();
        assert_eq!(fetched.payload.rows[0].coin_name.as_deref(), Some("X"));
    }
}
