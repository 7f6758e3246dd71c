/// Decoding of raw broker payloads into structured samples
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::models::{MetricReading, Sample};

// Conventional field order on the wire, used as a fallback when a payload
// carries unrecognized key names (some firmware variants publish renamed
// keys but keep the order: timestamp, temperature, pressure, humidity).
const POS_TIMESTAMP: usize = 0;
const POS_TEMPERATURE: usize = 1;
const POS_PRESSURE: usize = 2;
const POS_HUMIDITY: usize = 3;

/// Decode a raw MQTT payload into a `Sample`.
///
/// The payload is expected to be a UTF-8 JSON object such as:
///
/// ```text
/// {"timestamp":"2024-01-01T00:00:00Z","temperature":21.5,"pression":1013.2,"humidite":55}
/// ```
///
/// Field lookup is by name first (`pression`/`humidite` are the wire
/// convention of the originating firmware; `pressure`/`humidity` are
/// accepted as aliases), falling back to the conventional position when no
/// known name is present. A field that exists but cannot be coerced to a
/// number is kept as display text with no numeric value; callers decide how
/// to surface that (statistics skip the metric for this cycle).
///
/// # Arguments
/// * `raw` - Raw payload bytes from the broker
///
/// # Returns
/// The decoded sample, or `DecodeError::Malformed` if the payload is not a
/// JSON object.
pub fn decode(raw: &[u8]) -> Result<Sample, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let fields = value
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("payload is not a JSON object".to_string()))?;

    let timestamp = match field(fields, &["timestamp"], POS_TIMESTAMP) {
        Some(v) => render(v),
        None => "-".to_string(),
    };

    Ok(Sample {
        timestamp,
        temperature: metric(fields, &["temperature"], POS_TEMPERATURE),
        pressure: metric(fields, &["pression", "pressure"], POS_PRESSURE),
        humidity: metric(fields, &["humidite", "humidity"], POS_HUMIDITY),
    })
}

/// Look a field up by any of its known names, falling back to its
/// conventional position in the payload.
fn field<'a>(fields: &'a Map<String, Value>, names: &[&str], position: usize) -> Option<&'a Value> {
    for name in names {
        if let Some(value) = fields.get(*name) {
            return Some(value);
        }
    }
    fields.values().nth(position)
}

fn metric(fields: &Map<String, Value>, names: &[&str], position: usize) -> MetricReading {
    match field(fields, names, position) {
        Some(value) => MetricReading {
            display: render(value),
            value: coerce(value),
        },
        None => MetricReading::unavailable(),
    }
}

/// Coerce a JSON value to f64. Accepts numbers (float or integer — humidity
/// is an integer on the wire) and numeric strings.
fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Verbatim display text for a field, without JSON string quoting.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
