use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::debug;

use crate::data::Table;
use crate::error::{parse_number, Result};
use crate::ir::{ScoredTerm, TextVisualizationData};
use crate::text::{extract_url_domain, tokenize};
use crate::visualization::{Extract, TextVisualization};
use crate::PrepareOptions;

#[derive(Debug, Default)]
struct VocabularyStats {
    /// Sum of row weights over every occurrence.
    value: f64,
    /// Number of rows containing the term.
    doc_freq: usize,
    row_ids: Vec<String>,
}

/// Main entry point: rank the terms of a text column
pub fn prepare_text_data(
    table: &Table,
    visualization: &TextVisualization,
    options: &PrepareOptions,
) -> Result<TextVisualizationData> {
    let mut data = TextVisualizationData {
        kind: visualization.kind,
        top_terms: Vec::new(),
    };
    if table.row_count() == 0 {
        return Ok(data);
    }

    let texts = table.column(&visualization.text_column)?;
    let weights = match &visualization.value_column {
        Some(col) => Some(table.column(col)?),
        None => None,
    };

    let vocabulary = build_vocabulary(table, &texts, weights.as_deref(), visualization);
    debug!(table = %table.id, vocabulary = vocabulary.len(), "built vocabulary");

    data.top_terms = top_terms(vocabulary, texts.len(), options.top_terms);
    Ok(data)
}

fn build_vocabulary(
    table: &Table,
    texts: &[Option<&str>],
    weights: Option<&[Option<&str>]>,
    visualization: &TextVisualization,
) -> IndexMap<String, VocabularyStats> {
    let mut vocabulary: IndexMap<String, VocabularyStats> = IndexMap::new();

    for (i, (text, row)) in texts.iter().zip(&table.body.rows).enumerate() {
        let Some(text) = text else { continue };

        let weight = match weights {
            Some(w) => match parse_number(w.get(i).copied().flatten().unwrap_or_default()) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!(row = %row.id, error = %e, "discarding term weight");
                    None
                }
            },
            None => Some(1.0),
        };

        let units = if visualization.tokenize { tokenize(text) } else { vec![*text] };

        for unit in units {
            let term = match visualization.extract {
                Some(Extract::UrlDomain) => extract_url_domain(unit),
                None => unit.to_string(),
            };

            let stats = vocabulary.entry(term).or_default();
            // document frequency counts a row once
            if stats.row_ids.last() != Some(&row.id) {
                stats.doc_freq += 1;
                stats.row_ids.push(row.id.clone());
            }
            if let Some(w) = weight {
                stats.value += w;
            }
        }
    }

    vocabulary
}

/// Score by weighted term frequency times inverse document frequency.
fn top_terms(vocabulary: IndexMap<String, VocabularyStats>, n_docs: usize, limit: usize) -> Vec<ScoredTerm> {
    let mut terms: Vec<ScoredTerm> = vocabulary
        .into_iter()
        .map(|(text, stats)| {
            let idf = (n_docs as f64 / stats.doc_freq as f64).ln();
            ScoredTerm {
                text,
                value: stats.value,
                importance: stats.value * idf,
                row_ids: stats.row_ids,
            }
        })
        .collect();

    // -0.0 and 0.0 tie; doc_freq >= 1 keeps NaN out
    terms.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(Ordering::Equal));
    terms.truncate(limit);
    terms
}
