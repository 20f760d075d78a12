//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//!
//! The fixed feature set the policy was trained on lives in [`snapshot`],
//! and [`transform`] turns an OHLCV series into backfilled feature rows.

pub mod bollinger;
pub mod cci;
pub mod dx;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod snapshot;
pub mod transform;

pub use ema::calculate_ema;
pub use snapshot::{IndicatorKind, IndicatorSnapshot, INDICATOR_COUNT};

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Cci(usize),
    Dx(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Project each point through `pick`; invalid (warm-up) points become `None`.
    pub fn project<F>(&self, pick: F) -> Vec<Option<f64>>
    where
        F: Fn(&IndicatorValue) -> f64,
    {
        self.values
            .iter()
            .map(|p| if p.valid { Some(pick(&p.value)) } else { None })
            .collect()
    }

    pub fn simple_values(&self) -> Vec<Option<f64>> {
        self.project(|v| match v {
            IndicatorValue::Simple(x) => *x,
            _ => f64::NAN,
        })
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::Dx(period) => write!(f, "DX({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}
