//! Temperature-control requirements.
//!
//! Recognised ranges, always reported in Celsius with `min <= max`:
//!
//! ```text
//! "+2 +8", "+2+8", "+2°C / +8°C"    signed pair
//! "2-8C", "2-8 C", "2 - 8"          dash range
//! "2C to 8C", "15 °C to 25 °C"      spelled range
//! ```
//!
//! Anything else means no temperature control.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureRange {
    pub controlled: bool,
    pub min: Option<String>,
    pub max: Option<String>,
    pub uom: Option<String>,
}

impl TemperatureRange {
    fn between(a: &str, b: &str) -> Self {
        let (a, b) = (a.replace(',', "."), b.replace(',', "."));
        let (min, max) = match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) if x > y => (b, a),
            _ => (a, b),
        };
        TemperatureRange {
            controlled: true,
            min: Some(min.trim_start_matches('+').to_string()),
            max: Some(max.trim_start_matches('+').to_string()),
            uom: Some("CEL".to_string()),
        }
    }
}

pub(super) fn parse(raw: &str) -> TemperatureRange {
    let text = raw.replace(['(', ')'], " ");
    let shapes = [
        regex!(r"\+\s*(\d+(?:[.,]\d+)?)\s*°?\s*C?\s*(?:/|-|to)?\s*\+\s*(\d+(?:[.,]\d+)?)"),
        regex!(r"(?i)(-?\d+(?:[.,]\d+)?)\s*°?\s*C?\s+to\s+(-?\d+(?:[.,]\d+)?)\s*°?\s*C\b"),
        regex!(r"(?i)(-?\d+(?:[.,]\d+)?)\s*[-–]\s*(-?\d+(?:[.,]\d+)?)\s*°?\s*C\b"),
        regex!(r"(-?\d+(?:[.,]\d+)?)\s+[-–]\s+(-?\d+(?:[.,]\d+)?)"),
    ];
    shapes
        .iter()
        .find_map(|re| re.captures(&text))
        .map(|c| TemperatureRange::between(&c[1], &c[2]))
        .unwrap_or_default()
}
