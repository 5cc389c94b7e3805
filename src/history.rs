//! Aggregates over stored test results.

use std::io::Write;

use itertools::Itertools;

use crate::{
    error::Result,
    session::TestResult,
    util::{mean, std_dev},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean_wpm: f64,
    pub mean_accuracy: f64,
    pub wpm_std_dev: f64,
}

impl Summary {
    pub fn of(results: &[TestResult]) -> Option<Self> {
        let wpms: Vec<f64> = results.iter().map(|r| r.wpm as f64).collect();
        let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy as f64).collect();

        Some(Self {
            count: results.len(),
            mean_wpm: mean(&wpms)?,
            mean_accuracy: mean(&accuracies)?,
            wpm_std_dev: std_dev(&wpms)?,
        })
    }
}

/// Best run and run count for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBest<'a> {
    pub document_name: &'a str,
    pub runs: usize,
    pub best: &'a TestResult,
}

/// One entry per document, most practised first.
pub fn best_per_document(results: &[TestResult]) -> Vec<DocumentBest<'_>> {
    results
        .iter()
        .into_group_map_by(|r| r.document_id.as_str())
        .into_values()
        .filter_map(|runs| {
            let best = runs.iter().copied().max_by_key(|r| (r.wpm, r.accuracy))?;
            Some(DocumentBest {
                document_name: &best.document_name,
                runs: runs.len(),
                best,
            })
        })
        .sorted_by(|a, b| {
            b.runs
                .cmp(&a.runs)
                .then_with(|| a.document_name.cmp(b.document_name))
        })
        .collect()
}

/// Writes every result as one CSV row, with a header.
pub fn write_csv<W: Write>(results: &[TestResult], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in results {
        wtr.serialize(result)?;
    }
    wtr.flush()?;
    Ok(())
}
