//! Live quote and company profile records.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub ticker: String,
    pub current_price: f64,
    pub percent_change: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub open: f64,
    pub previous_close: f64,
}

impl Quote {
    /// Build a quote, deriving `percent_change` from `previous_close`.
    pub fn new(
        ticker: &str,
        current_price: f64,
        previous_close: f64,
        day_high: f64,
        day_low: f64,
        open: f64,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            current_price,
            percent_change: percent_change(current_price, previous_close),
            day_high,
            day_low,
            open,
            previous_close,
        }
    }
}

/// `(price - prev_close) / prev_close × 100`, 0 when there is no previous close.
pub fn percent_change(price: f64, previous_close: f64) -> f64 {
    if previous_close == 0.0 {
        0.0
    } else {
        (price - previous_close) / previous_close * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CompanyProfile {
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub summary: Option<String>,
}

/// A price that may be missing; serialises as a number or `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceField {
    Value(f64),
    NotAvailable,
}

impl PriceField {
    pub fn value(self) -> Option<f64> {
        match self {
            PriceField::Value(v) => Some(v),
            PriceField::NotAvailable => None,
        }
    }
}

impl From<Option<f64>> for PriceField {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) if v.is_finite() => PriceField::Value(v),
            _ => PriceField::NotAvailable,
        }
    }
}

impl Serialize for PriceField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PriceField::Value(v) => serializer.serialize_f64(*v),
            PriceField::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}
