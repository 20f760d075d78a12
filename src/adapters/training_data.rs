//! Training dataset loader.
//!
//! The dataset is the long-format CSV the policy was trained on: one row
//! per (date, tic) with OHLCV and the eight indicator columns. It yields
//! the asset universe (first-appearance order of `tic`) and the baseline
//! table (every member's row at the latest date).

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::baseline::{BaselineTable, MarketRow};
use crate::domain::error::AdvisorError;
use crate::domain::indicator::{IndicatorKind, IndicatorSnapshot, INDICATOR_COUNT};
use crate::domain::universe::AssetUniverse;

#[derive(Debug, Clone)]
pub struct TrainingData {
    pub universe: AssetUniverse,
    pub baseline: BaselineTable,
}

struct Columns {
    date: usize,
    tic: usize,
    close: usize,
    volume: usize,
    indicators: [usize; INDICATOR_COUNT],
}

impl Columns {
    fn locate(headers: &csv::StringRecord, path: &str) -> Result<Self, AdvisorError> {
        let by_name: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let find = |name: &str| {
            by_name.get(name).copied().ok_or_else(|| AdvisorError::Artifact {
                path: path.to_string(),
                reason: format!("training data has no '{}' column", name),
            })
        };

        let mut indicators = [0usize; INDICATOR_COUNT];
        for kind in IndicatorKind::ALL {
            indicators[kind.position()] = find(kind.column())?;
        }
        Ok(Self {
            date: find("date")?,
            tic: find("tic")?,
            close: find("close")?,
            volume: find("volume")?,
            indicators,
        })
    }
}

pub fn load_training_data(path: &Path) -> Result<TrainingData, AdvisorError> {
    let content = std::fs::read_to_string(path).map_err(|e| AdvisorError::Artifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let data = parse_training_data(&content, &path.display().to_string())?;
    info!(
        path = %path.display(),
        assets = data.universe.len(),
        "training data loaded"
    );
    Ok(data)
}

/// Parse the dataset text. `origin` names the source in error messages.
pub fn parse_training_data(content: &str, origin: &str) -> Result<TrainingData, AdvisorError> {
    let artifact = |reason: String| AdvisorError::Artifact {
        path: origin.to_string(),
        reason,
    };

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| artifact(format!("CSV header error: {}", e)))?
        .clone();
    let cols = Columns::locate(&headers, origin)?;

    let mut order: Vec<String> = Vec::new();
    let mut latest: Option<NaiveDate> = None;
    let mut latest_rows: Vec<MarketRow> = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| artifact(format!("CSV parse error: {}", e)))?;
        let row_no = line + 1;
        let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("");
        let number = |i: usize, name: &str| -> Result<f64, AdvisorError> {
            cell(i)
                .parse::<f64>()
                .map_err(|_| artifact(format!("row {}: invalid {} '{}'", row_no, name, cell(i))))
        };

        let ticker = cell(cols.tic).to_uppercase();
        if ticker.is_empty() {
            return Err(artifact(format!("row {}: empty tic", row_no)));
        }
        let raw_date = cell(cols.date);
        let date = NaiveDate::parse_from_str(raw_date.get(..10).unwrap_or(raw_date), "%Y-%m-%d")
            .map_err(|e| artifact(format!("row {}: invalid date: {}", row_no, e)))?;

        if !order.contains(&ticker) {
            order.push(ticker.clone());
        }

        match latest {
            Some(d) if date < d => continue,
            Some(d) if date == d => {}
            _ => {
                latest = Some(date);
                latest_rows.clear();
            }
        }

        let mut values = [0.0; INDICATOR_COUNT];
        for kind in IndicatorKind::ALL {
            values[kind.position()] = number(cols.indicators[kind.position()], kind.column())?;
        }
        latest_rows.push(MarketRow {
            ticker,
            date,
            close: number(cols.close, "close")?,
            volume: number(cols.volume, "volume")? as i64,
            indicators: IndicatorSnapshot::new(values),
        });
    }

    let universe = AssetUniverse::new(order).map_err(|e| artifact(e.to_string()))?;
    let baseline = BaselineTable::aligned(&universe, latest_rows)?;
    Ok(TrainingData { universe, baseline })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = ",date,tic,open,high,low,close,volume,macd,rsi_30,cci_30,boll_ub,boll_lb,dx_30,close_30_sma,close_60_sma\n";

    fn row(idx: usize, date: &str, tic: &str, close: f64) -> String {
        format!(
            "{idx},{date},{tic},1,2,0.5,{close},1000,0.1,55,20,{ub},{lb},30,{close},{close}\n",
            ub = close + 5.0,
            lb = close - 5.0,
        )
    }

    fn dataset() -> String {
        let mut s = HEADER.to_string();
        s += &row(0, "2024-01-02", "MSFT", 370.0);
        s += &row(0, "2024-01-02", "AAPL", 185.0);
        s += &row(1, "2024-01-03", "AAPL", 184.0);
        s += &row(1, "2024-01-03", "MSFT", 371.0);
        s += &row(1, "2024-01-03", "GOOG", 140.0);
        s += &row(2, "2024-01-04", "GOOG", 141.0);
        s += &row(2, "2024-01-04", "AAPL", 183.0);
        s += &row(2, "2024-01-04", "MSFT", 372.0);
        s
    }

    #[test]
    fn universe_follows_first_appearance() {
        let data = parse_training_data(&dataset(), "train.csv").unwrap();
        assert_eq!(data.universe.tickers(), &["MSFT", "AAPL", "GOOG"]);
    }

    #[test]
    fn baseline_is_latest_date_in_universe_order() {
        let data = parse_training_data(&dataset(), "train.csv").unwrap();
        let rows = data.baseline.rows();
        assert_eq!(rows.len(), 3);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        assert!(rows.iter().all(|r| r.date == expected));
        assert_eq!(rows[0].ticker, "MSFT");
        assert_eq!(rows[0].close, 372.0);
        assert_eq!(rows[1].ticker, "AAPL");
        assert_eq!(rows[2].indicators.get(IndicatorKind::BollUb), 146.0);
    }

    #[test]
    fn member_missing_on_latest_date_fails() {
        let mut s = dataset();
        s += &row(3, "2024-01-05", "AAPL", 182.0);
        let err = parse_training_data(&s, "train.csv").unwrap_err();
        assert!(matches!(err, AdvisorError::DataUnavailable { ticker, .. } if ticker == "MSFT"));
    }

    #[test]
    fn missing_indicator_column_is_artifact_error() {
        let s = "date,tic,close,volume,macd\n2024-01-02,AAPL,1,1,0.1\n";
        let err = parse_training_data(s, "train.csv").unwrap_err();
        assert!(matches!(err, AdvisorError::Artifact { reason, .. } if reason.contains("rsi_30")));
    }

    #[test]
    fn empty_dataset_has_no_universe() {
        assert!(parse_training_data(HEADER, "train.csv").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", dataset()).unwrap();
        let data = load_training_data(file.path()).unwrap();
        assert_eq!(data.universe.len(), 3);
        assert!(load_training_data(Path::new("/nonexistent/train.csv")).is_err());
    }
}
