use anyhow::{Context, Result};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::*;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy};

use crate::models::RetrievableUnit;

/// BM25 search index over unit contents, built on tantivy and held in RAM.
pub struct Bm25Index {
    index: Index,
    reader: IndexReader,
    // Field handles
    f_sequence_id: Field,
    f_content: Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Hit {
    pub sequence_id: u64,
    pub score: f32,
}

impl Bm25Index {
    /// Build an in-memory index for the given units.
    pub fn build(units: &[RetrievableUnit]) -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let f_sequence_id =
            schema_builder.add_u64_field("sequence_id", NumericOptions::default() | STORED);
        let f_content = schema_builder.add_text_field("content", TEXT);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, 50_000_000)
            .context("Failed to create index writer")?;

        for unit in units {
            writer.add_document(doc!(
                f_sequence_id => unit.sequence_id,
                f_content => unit.content.clone(),
            ))?;
        }

        writer.commit().context("Failed to commit index")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create reader")?;

        Ok(Self {
            index,
            reader,
            f_sequence_id,
            f_content,
        })
    }

    /// Search the index and return scored hits, best first.
    ///
    /// Parsing is lenient: question marks, quotes and other query syntax in a
    /// natural-language question never fail the search.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<Bm25Hit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(&self.index, vec![self.f_content]);
        let (query, errors) = query_parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            tracing::debug!("Lenient BM25 parse dropped {} clause(s)", errors.len());
        }

        let top_docs = searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .context("Search failed")?;

        let mut hits = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .context("Failed to retrieve document")?;

            let Some(sequence_id) = doc.get_first(self.f_sequence_id).and_then(|v| v.as_u64())
            else {
                continue;
            };

            hits.push(Bm25Hit { sequence_id, score });
        }

        Ok(hits)
    }

    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}
