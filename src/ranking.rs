// SPDX-License-Identifier: MIT OR Apache-2.0

//! BM25 relevance scoring over the chunks of one request
//!
//! Every chunk is a document and the corpus is exactly the chunks gathered
//! for the current request. Scores are only comparable within one call.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tantivy::{
    collector::TopDocs,
    doc,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::{IndexRecordOption, Schema, Value, STORED, TEXT},
    tokenizer::TokenStream,
    Index, IndexWriter, TantivyDocument, Term,
};

use crate::config::RankerKind;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Split on runs of non-word characters, drop empties, lowercase.
pub fn tokenize(text: &str) -> Vec<String> {
    NON_WORD
        .split(text)
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Scores documents against query tokens.
///
/// Returns one score per document, in document order. A document sharing no
/// token with the query scores 0.
pub trait Ranker: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, documents: &[&str], query_tokens: &[String]) -> Result<Vec<f32>>;
}

pub fn ranker_for(kind: RankerKind) -> Box<dyn Ranker> {
    match kind {
        RankerKind::Bm25 => Box::new(Bm25Ranker::default()),
        RankerKind::Tantivy => Box::new(TantivyRanker),
    }
}

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// Okapi BM25 computed in memory
#[derive(Debug, Clone, Copy)]
pub struct Bm25Ranker {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Ranker {
    fn default() -> Self {
        Self {
            k1: BM25_K1,
            b: BM25_B,
        }
    }
}

impl Ranker for Bm25Ranker {
    fn name(&self) -> &'static str {
        "bm25"
    }

    fn score(&self, documents: &[&str], query_tokens: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let query: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();
        if query.is_empty() {
            return Ok(vec![0.0; documents.len()]);
        }

        // Only query terms matter, so term frequencies are kept for those alone.
        let mut term_freqs: Vec<HashMap<&str, u32>> = Vec::with_capacity(documents.len());
        let mut doc_lens: Vec<usize> = Vec::with_capacity(documents.len());
        let mut doc_freqs: HashMap<&str, usize> = HashMap::new();

        for document in documents {
            let tokens = tokenize(document);
            let mut tf: HashMap<&str, u32> = HashMap::new();
            for token in &tokens {
                if let Some(term) = query.get(token.as_str()) {
                    *tf.entry(*term).or_insert(0) += 1;
                }
            }
            for term in tf.keys() {
                *doc_freqs.entry(*term).or_insert(0) += 1;
            }
            doc_lens.push(tokens.len());
            term_freqs.push(tf);
        }

        let total_docs = documents.len() as f32;
        let avg_doc_len = (doc_lens.iter().sum::<usize>() as f32 / total_docs).max(1.0);

        let idf: HashMap<&str, f32> = doc_freqs
            .iter()
            .map(|(term, df)| {
                let df = *df as f32;
                (*term, ((total_docs - df + 0.5) / (df + 0.5)).ln_1p())
            })
            .collect();

        let scores: Vec<f32> = term_freqs
            .iter()
            .zip(&doc_lens)
            .map(|(tf, len)| {
                let length_norm = self.b.mul_add(*len as f32 / avg_doc_len, 1.0 - self.b);
                tf.iter()
                    .map(|(term, freq)| {
                        let freq = *freq as f32;
                        let weight = idf.get(term).copied().unwrap_or_default();
                        weight * (freq * (self.k1 + 1.0)) / self.k1.mul_add(length_norm, freq)
                    })
                    .sum::<f32>()
            })
            .collect();

        Ok(scores)
    }
}

const TANTIVY_WRITER_BUDGET_BYTES: usize = 15_000_000;

/// Scores through a throwaway in-RAM tantivy index, using tantivy's own
/// tokenizer and BM25 similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TantivyRanker;

impl Ranker for TantivyRanker {
    fn name(&self) -> &'static str {
        "tantivy"
    }

    fn score(&self, documents: &[&str], query_tokens: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut schema_builder = Schema::builder();
        let ordinal_field = schema_builder.add_u64_field("ordinal", STORED);
        let content_field = schema_builder.add_text_field("content", TEXT);
        let index = Index::create_in_ram(schema_builder.build());

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, TANTIVY_WRITER_BUDGET_BYTES)
            .context("Failed to create in-memory index writer")?;
        for (ordinal, document) in documents.iter().enumerate() {
            writer.add_document(doc!(
                ordinal_field => ordinal as u64,
                content_field => *document
            ))?;
        }
        writer.commit().context("Failed to commit in-memory index")?;

        let mut analyzer = index
            .tokenizer_for_field(content_field)
            .context("Missing tokenizer for content field")?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for token in query_tokens {
            let mut stream = analyzer.token_stream(token);
            while stream.advance() {
                let text = stream.token().text.clone();
                if seen.insert(text.clone()) {
                    let term = Term::from_field_text(content_field, &text);
                    clauses.push((
                        Occur::Should,
                        Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
                    ));
                }
            }
        }

        let mut scores = vec![0.0; documents.len()];
        if clauses.is_empty() {
            return Ok(scores);
        }

        let reader = index.reader().context("Failed to open in-memory index")?;
        let searcher = reader.searcher();
        let query = BooleanQuery::new(clauses);
        let hits = searcher.search(&query, &TopDocs::with_limit(documents.len()))?;

        for (score, address) in hits {
            let stored: TantivyDocument = searcher.doc(address)?;
            let ordinal = stored
                .get_first(ordinal_field)
                .and_then(|value| value.as_u64())
                .context("Stored document is missing its ordinal")?;
            if let Some(slot) = scores.get_mut(ordinal as usize) {
                *slot = score;
            }
        }

        Ok(scores)
    }
}
