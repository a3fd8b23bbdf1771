use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Unexpected};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// The factor historical records were converted with. Low precision, but
/// stored data depends on it; do not "fix" it to 0.4536.
pub const LBS_TO_KG: f64 = 0.454;

/// Direction of a weighing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Loaded truck entering the station.
    In,
    /// Truck leaving the station after unloading.
    Out,
    /// Standalone weighing with no truck involved.
    None,
}

impl Direction {
    /// The canonical lowercase name as stored and sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "none" => Ok(Direction::None),
            other => Err(ParseDirectionError(other.to_owned())),
        }
    }
}

/// A string was not one of `in`, `out`, `none`.
#[derive(Debug, thiserror::Error)]
#[error("Direction must be one of 'in', 'out' or 'none', got '{0}'")]
pub struct ParseDirectionError(pub String);

/// Unit a weight was reported in. Storage is always kilograms; pounds are
/// converted on ingest (weights) or on read (registered container tares).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    /// Kilograms.
    Kg,
    /// Pounds.
    Lbs,
}

impl WeightUnit {
    /// Convert `weight` in this unit to whole kilograms.
    pub fn to_kg(&self, weight: i64) -> i64 {
        match self {
            WeightUnit::Kg => weight,
            WeightUnit::Lbs => (weight as f64 * LBS_TO_KG).round() as i64,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        })
    }
}

impl FromStr for WeightUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kg" => Ok(WeightUnit::Kg),
            "lbs" => Ok(WeightUnit::Lbs),
            other => Err(ParseUnitError(other.to_owned())),
        }
    }
}

/// A string was not one of `kg`, `lbs`.
#[derive(Debug, thiserror::Error)]
#[error("Unit must be 'kg' or 'lbs', got '{0}'")]
pub struct ParseUnitError(pub String);

/// A kilogram amount that may be indeterminate. Indeterminate values are the
/// string `"na"` on the wire and NULL in storage; in memory they are plain
/// `None` so arithmetic never sees the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaybeKg(pub Option<i64>);

impl MaybeKg {
    /// A known amount.
    pub fn known(kg: i64) -> Self {
        MaybeKg(Some(kg))
    }

    /// The indeterminate sentinel.
    pub fn na() -> Self {
        MaybeKg(None)
    }
}

impl From<Option<i64>> for MaybeKg {
    fn from(value: Option<i64>) -> Self {
        MaybeKg(value)
    }
}

impl Serialize for MaybeKg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(kg) => serializer.serialize_i64(kg),
            None => serializer.serialize_str("na"),
        }
    }
}

impl<'de> Deserialize<'de> for MaybeKg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = MaybeKg;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer kilogram amount or the string \"na\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MaybeKg, E> {
                Ok(MaybeKg::known(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MaybeKg, E> {
                i64::try_from(v)
                    .map(MaybeKg::known)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MaybeKg, E> {
                if v == "na" {
                    Ok(MaybeKg::na())
                } else {
                    Err(E::invalid_value(Unexpected::Str(v), &self))
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<MaybeKg, E> {
                Ok(MaybeKg::na())
            }

            fn visit_none<E: de::Error>(self) -> Result<MaybeKg, E> {
                Ok(MaybeKg::na())
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// Bring a single container id to canonical form: surrounding whitespace
/// trimmed, first character uppercased, the rest lowercased. Applied on every
/// write and every lookup so the two can never disagree.
pub fn canonical_container_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    }
}

/// Split a comma-joined container list into canonical ids, dropping empty
/// segments.
pub fn parse_container_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(canonical_container_id)
        .filter(|id| !id.is_empty())
        .collect()
}

/// Join canonical ids back into the legacy comma-joined storage form.
pub fn join_container_list(ids: &[String]) -> String {
    ids.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lbs_conversion_uses_historical_factor() {
        assert_eq!(WeightUnit::Lbs.to_kg(1000), 454);
        assert_eq!(WeightUnit::Lbs.to_kg(1), 0);
        assert_eq!(WeightUnit::Lbs.to_kg(10), 5);
        assert_eq!(WeightUnit::Kg, "kg".parse().unwrap());
    }

    #[test]
    fn kg_passes_through_unchanged() {
        assert_eq!(WeightUnit::Kg.to_kg(15000), 15000);
    }

    #[test]
    fn direction_round_trips_through_serde() {
        for (dir, json) in [
            (Direction::In, "\"in\""),
            (Direction::Out, "\"out\""),
            (Direction::None, "\"none\""),
        ] {
            assert_eq!(serde_json::to_string(&dir).unwrap(), json);
            assert_eq!(serde_json::from_str::<Direction>(json).unwrap(), dir);
        }
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn maybe_kg_renders_the_na_sentinel() {
        assert_eq!(serde_json::to_string(&MaybeKg::known(6000)).unwrap(), "6000");
        assert_eq!(serde_json::to_string(&MaybeKg::na()).unwrap(), "\"na\"");
        assert_eq!(serde_json::from_str::<MaybeKg>("\"na\"").unwrap(), MaybeKg::na());
        assert_eq!(serde_json::from_str::<MaybeKg>("null").unwrap(), MaybeKg::na());
        assert_eq!(serde_json::from_str::<MaybeKg>("42").unwrap(), MaybeKg::known(42));
        assert!(serde_json::from_str::<MaybeKg>("\"nah\"").is_err());
    }

    #[test]
    fn container_ids_are_canonicalized_consistently() {
        assert_eq!(canonical_container_id("  c-1 "), "C-1");
        assert_eq!(canonical_container_id("KT-05"), "Kt-05");
        assert_eq!(parse_container_list("c-1, C-2 ,,"), vec!["C-1", "C-2"]);
        assert_eq!(parse_container_list(""), Vec::<String>::new());
        assert_eq!(
            join_container_list(&parse_container_list("c-1,c-2")),
            "C-1,C-2"
        );
    }
}
