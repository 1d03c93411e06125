//! Extraction, projection and assembly for one strategy.

use tracing::info;

use crate::assemble::{assemble, augment_table, PlotRow};
use crate::config::TextSpaceConfig;
use crate::document::{documents_from_table, validate_batch, Document, Table};
use crate::error::Result;
use crate::features::{FeatureExtractor, Models, StrategyKind};
use crate::reduce::fit_project;

/// The documents → features → points → rows transform.
#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: FeatureExtractor,
    config: TextSpaceConfig,
}

impl Pipeline {
    /// Validate `config` and wire the extractor to the given models.
    pub fn new(models: Models, config: TextSpaceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(models, &config),
            config,
        })
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn config(&self) -> &TextSpaceConfig {
        &self.config
    }

    /// Plot rows for `documents` under `strategy`, in input order.
    pub fn run(&self, documents: &[Document], strategy: StrategyKind) -> Result<Vec<PlotRow>> {
        validate_batch(documents)?;

        let features = self.extractor.extract(documents, strategy)?;
        let points = fit_project(features.view())?;
        let rows = assemble(documents, &points, strategy)?;

        info!("{} projection ready: {} points", strategy, rows.len());
        Ok(rows)
    }

    /// Table in, table out: the input rows with `x`, `y`, `z` appended.
    pub fn run_table(&self, table: &Table, strategy: StrategyKind) -> Result<Table> {
        let documents = documents_from_table(table, &self.config.columns)?;
        let rows = self.run(&documents, strategy)?;
        augment_table(table, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn songs() -> Vec<Document> {
        vec![
            Document::new(0, "Morning", "a", "sunrise over quiet hills and golden fields"),
            Document::new(1, "Storm", "b", "thunder rolls and rain falls on dark hills"),
            Document::new(2, "Harbor", "a", "boats rest in the harbor under golden light"),
            Document::new(3, "Night", "c", "stars over the dark harbor and silent boats"),
        ]
    }

    #[test]
    fn lexical_run_keeps_order() {
        let pipeline = Pipeline::new(Models::new(), TextSpaceConfig::default()).unwrap();
        let rows = pipeline.run(&songs(), StrategyKind::Lexical).unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Morning", "Storm", "Harbor", "Night"]);
        assert!(rows.iter().all(|r| r.strategy == StrategyKind::Lexical));
    }

    #[test]
    fn duplicate_titles_fail_before_extraction() {
        let mut docs = songs();
        docs[3].title = "Morning".to_string();
        let pipeline = Pipeline::new(Models::new(), TextSpaceConfig::default()).unwrap();
        let err = pipeline.run(&docs, StrategyKind::Lexical).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn table_round_trip_adds_coordinates() {
        let table = Table::from_rows(
            ["title", "author", "text", "source"],
            songs()
                .into_iter()
                .map(|d| vec![json!(d.title), json!(d.author), json!(d.text), json!("test")])
                .collect(),
        )
        .unwrap();
        let pipeline = Pipeline::new(Models::new(), TextSpaceConfig::default()).unwrap();
        let out = pipeline.run_table(&table, StrategyKind::Topic).unwrap();

        assert_eq!(out.len(), table.len());
        assert_eq!(out.columns().len(), 7);
        for row in 0..out.len() {
            assert_eq!(out.get(row, "title"), table.get(row, "title"));
            assert!(out.get(row, "x").and_then(|v| v.as_f64()).is_some());
        }
    }

    #[test]
    fn missing_text_column_fails_table_run() {
        let table = Table::from_rows(
            ["title", "author"],
            vec![vec![json!("A"), json!("x")]],
        )
        .unwrap();
        let pipeline = Pipeline::new(Models::new(), TextSpaceConfig::default()).unwrap();
        let err = pipeline.run_table(&table, StrategyKind::Lexical).unwrap_err();
        assert!(err.to_string().contains("'text'"));
    }
}
