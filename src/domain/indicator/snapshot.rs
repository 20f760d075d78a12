//! The fixed indicator set the policy consumes.
//!
//! Order of [`IndicatorKind::ALL`] is the order indicator blocks appear in
//! the observation vector. Column names match the training dataset headers.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::str::FromStr;

pub const INDICATOR_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Macd,
    Rsi30,
    Cci30,
    BollUb,
    BollLb,
    Dx30,
    Close30Sma,
    Close60Sma,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; INDICATOR_COUNT] = [
        IndicatorKind::Macd,
        IndicatorKind::Rsi30,
        IndicatorKind::Cci30,
        IndicatorKind::BollUb,
        IndicatorKind::BollLb,
        IndicatorKind::Dx30,
        IndicatorKind::Close30Sma,
        IndicatorKind::Close60Sma,
    ];

    pub fn column(self) -> &'static str {
        match self {
            IndicatorKind::Macd => "macd",
            IndicatorKind::Rsi30 => "rsi_30",
            IndicatorKind::Cci30 => "cci_30",
            IndicatorKind::BollUb => "boll_ub",
            IndicatorKind::BollLb => "boll_lb",
            IndicatorKind::Dx30 => "dx_30",
            IndicatorKind::Close30Sma => "close_30_sma",
            IndicatorKind::Close60Sma => "close_60_sma",
        }
    }

    pub fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        IndicatorKind::ALL
            .into_iter()
            .find(|k| k.column() == needle)
            .ok_or_else(|| format!("unknown indicator column '{}'", s))
    }
}

/// Indicator values for one ticker on one date, indexed by [`IndicatorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSnapshot {
    values: [f64; INDICATOR_COUNT],
}

impl IndicatorSnapshot {
    pub fn new(values: [f64; INDICATOR_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, kind: IndicatorKind) -> f64 {
        self.values[kind.position()]
    }

    pub fn set(&mut self, kind: IndicatorKind, value: f64) {
        self.values[kind.position()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndicatorKind, f64)> + '_ {
        IndicatorKind::ALL.into_iter().map(|k| (k, self.get(k)))
    }
}

impl Serialize for IndicatorSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(INDICATOR_COUNT))?;
        for (kind, value) in self.iter() {
            map.serialize_entry(kind.column(), &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_matches_training_columns() {
        let columns: Vec<&str> = IndicatorKind::ALL.iter().map(|k| k.column()).collect();
        assert_eq!(
            columns,
            vec![
                "macd",
                "rsi_30",
                "cci_30",
                "boll_ub",
                "boll_lb",
                "dx_30",
                "close_30_sma",
                "close_60_sma"
            ]
        );
    }

    #[test]
    fn position_is_index_in_all() {
        for (i, kind) in IndicatorKind::ALL.iter().enumerate() {
            assert_eq!(kind.position(), i);
        }
    }

    #[test]
    fn parse_column_names() {
        assert_eq!("RSI_30".parse::<IndicatorKind>(), Ok(IndicatorKind::Rsi30));
        assert!("vwap".parse::<IndicatorKind>().is_err());
    }

    #[test]
    fn snapshot_get_set() {
        let mut snap = IndicatorSnapshot::default();
        snap.set(IndicatorKind::Dx30, 21.5);
        assert_eq!(snap.get(IndicatorKind::Dx30), 21.5);
        assert_eq!(snap.get(IndicatorKind::Macd), 0.0);
    }

    #[test]
    fn snapshot_serializes_as_named_map() {
        let mut snap = IndicatorSnapshot::default();
        snap.set(IndicatorKind::Rsi30, 55.0);
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["rsi_30"], 55.0);
        assert_eq!(json.as_object().unwrap().len(), INDICATOR_COUNT);
    }
}
