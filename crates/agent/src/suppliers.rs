//! Supplier lookup behind a trait so the vector-store-backed service can
//! slot in without touching the tool surface.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierRecord {
    pub name: String,
    pub region: String,
    pub description: String,
    #[serde(default)]
    pub transport_modes: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub carbon_emissions_per_shipment_kg: f64,
    #[serde(default)]
    pub esg_rating: Option<String>,
}

#[derive(Debug, Error)]
pub enum SupplierIndexError {
    #[error("could not read supplier data `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse supplier data `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
}

/// Ranked supplier retrieval: natural-language query, optional region
/// filter, top-k results with carbon metadata.
pub trait SupplierIndex: Send + Sync {
    fn query(&self, query: &str, region: Option<&str>, top_k: usize) -> Vec<SupplierRecord>;
}

/// Keyword-scoring index over a JSON supplier file. Deterministic and
/// offline; a semantic index implements the same trait.
pub struct JsonSupplierIndex {
    records: Vec<SupplierRecord>,
}

impl JsonSupplierIndex {
    pub fn from_path(path: &Path) -> Result<Self, SupplierIndexError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| SupplierIndexError::ReadFile { path: path.to_path_buf(), source })?;
        let records = serde_json::from_str(&raw)
            .map_err(|source| SupplierIndexError::ParseFile { path: path.to_path_buf(), source })?;
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<SupplierRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn score(record: &SupplierRecord, tokens: &[String]) -> usize {
        let haystack = format!(
            "{} {} {} {} {}",
            record.name,
            record.region,
            record.description,
            record.transport_modes.join(" "),
            record.certifications.join(" ")
        )
        .to_lowercase();

        tokens.iter().filter(|token| haystack.contains(token.as_str())).count()
    }
}

impl SupplierIndex for JsonSupplierIndex {
    fn query(&self, query: &str, region: Option<&str>, top_k: usize) -> Vec<SupplierRecord> {
        let tokens: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.len() > 2)
            .map(str::to_string)
            .collect();

        let mut scored: Vec<(usize, &SupplierRecord)> = self
            .records
            .iter()
            .filter(|record| match region {
                Some(region) => record.region.eq_ignore_ascii_case(region),
                None => true,
            })
            .map(|record| (Self::score(record, &tokens), record))
            .filter(|(score, _)| tokens.is_empty() || *score > 0)
            .collect();

        // Stable sort keeps input order for equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(top_k).map(|(_, record)| record.clone()).collect()
    }
}

/// The lowest-emission record among the matches, ties broken by first
/// occurrence in ranked order.
pub fn lowest_emission(matches: &[SupplierRecord]) -> Option<&SupplierRecord> {
    let mut best: Option<&SupplierRecord> = None;
    for record in matches {
        let beats_current = match best {
            Some(current) => {
                record.carbon_emissions_per_shipment_kg < current.carbon_emissions_per_shipment_kg
            }
            None => true,
        };
        if beats_current {
            best = Some(record);
        }
    }
    best
}
