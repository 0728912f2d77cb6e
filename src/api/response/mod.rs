pub mod consumption;
pub mod contract_details;
pub mod contracts;
pub mod generation;
pub mod login;
pub mod measure;
pub mod power_demand;
pub mod session;

use serde_json::Value;

/* The portal mixes `true` and `"true"` for success flags */
pub fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Read a float sent either as JSON number or as numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read an unsigned integer sent either as JSON number or as numeric string.
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read an identifier; numeric ids such as `123456789.0` are rendered without fraction.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && n.as_u64().is_none() => Some(format!("{:.0}", f)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

/// Bodies of historical endpoints are ISO-8859-1 encoded.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
pub(crate) fn read_resource(filename: &str) -> String {
    let mut d = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push(format!("resources/test/{}", filename));
    std::fs::read_to_string(d.as_path()).unwrap()
}
