//! The asset universe: the ordered ticker list the policy was trained on.
//!
//! Index `i` in the universe is index `i` in the observation's per-asset
//! blocks and in the policy's action vector. The sequence is fixed once
//! loaded; there is no way to reorder or extend an [`AssetUniverse`].

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("asset universe is empty")]
    Empty,

    #[error("empty ticker in list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

#[derive(Debug, Clone)]
pub struct AssetUniverse {
    tickers: Vec<String>,
    index: HashMap<String, usize>,
}

impl AssetUniverse {
    pub fn new(tickers: Vec<String>) -> Result<Self, UniverseError> {
        if tickers.is_empty() {
            return Err(UniverseError::Empty);
        }
        let mut index = HashMap::with_capacity(tickers.len());
        for (i, ticker) in tickers.iter().enumerate() {
            if ticker.trim().is_empty() {
                return Err(UniverseError::EmptyToken);
            }
            if index.insert(ticker.clone(), i).is_some() {
                return Err(UniverseError::DuplicateTicker(ticker.clone()));
            }
        }
        Ok(Self { tickers, index })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Position of `ticker` in the universe, exact match.
    pub fn index_of(&self, ticker: &str) -> Option<usize> {
        self.index.get(ticker).copied()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.index.contains_key(ticker)
    }

    /// Split `requested` into (supported, unsupported), each keeping request order.
    pub fn partition(&self, requested: &[String]) -> (Vec<String>, Vec<String>) {
        requested
            .iter()
            .cloned()
            .partition(|ticker| self.contains(ticker))
    }
}

/// Parse a comma-separated ticker list: trimmed, uppercased, no blanks or repeats.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}
