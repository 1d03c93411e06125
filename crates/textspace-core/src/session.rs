//! Interactive exploration state.
//!
//! A session owns one validated batch of documents and remembers the plot
//! rows of every strategy it has already computed, so switching back and
//! forth between views only pays for each projection once. Click events from
//! the front end are resolved by [`DocumentId`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::assemble::PlotRow;
use crate::document::{documents_from_table, validate_batch, Document, DocumentId, Table};
use crate::error::{Result, TextSpaceError};
use crate::features::StrategyKind;
use crate::pipeline::Pipeline;
use crate::plot::ScatterFigure;

/// Shown in the text pane before anything has been clicked.
pub const CLICK_PLACEHOLDER: &str = "Click on a point to see the text";

pub struct TextSpaceSession {
    documents: Vec<Document>,
    by_id: HashMap<DocumentId, usize>,
    pipeline: Pipeline,
    computed: RwLock<HashMap<StrategyKind, Arc<Vec<PlotRow>>>>,
}

impl TextSpaceSession {
    /// Start a session over `documents`. The batch is validated once here.
    pub fn new(documents: Vec<Document>, pipeline: Pipeline) -> Result<Self> {
        validate_batch(&documents)?;

        let mut by_id = HashMap::with_capacity(documents.len());
        for (idx, doc) in documents.iter().enumerate() {
            if by_id.insert(doc.id, idx).is_some() {
                return Err(TextSpaceError::Validation(format!(
                    "document id {} appears more than once",
                    doc.id
                )));
            }
        }

        info!("session opened with {} documents", documents.len());
        Ok(Self {
            documents,
            by_id,
            pipeline,
            computed: RwLock::new(HashMap::new()),
        })
    }

    /// Start a session from a table, using the pipeline's column mapping.
    pub fn from_table(table: &Table, pipeline: Pipeline) -> Result<Self> {
        let documents = documents_from_table(table, &pipeline.config().columns)?;
        Self::new(documents, pipeline)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Strategies offered to the user, in menu order.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        StrategyKind::ALL
            .into_iter()
            .filter(|s| self.pipeline.extractor().supports(*s))
            .collect()
    }

    pub fn is_computed(&self, strategy: StrategyKind) -> bool {
        self.computed.read().contains_key(&strategy)
    }

    /// Plot rows for `strategy`, computed on first use.
    pub fn select(&self, strategy: StrategyKind) -> Result<Arc<Vec<PlotRow>>> {
        if let Some(rows) = self.computed.read().get(&strategy) {
            debug!("{} rows served from memory", strategy);
            return Ok(Arc::clone(rows));
        }

        let rows = Arc::new(self.pipeline.run(&self.documents, strategy)?);
        let mut computed = self.computed.write();
        Ok(Arc::clone(computed.entry(strategy).or_insert(rows)))
    }

    /// Like [`select`](Self::select), but from a user-supplied name.
    pub fn select_named(&self, strategy: &str) -> Result<Arc<Vec<PlotRow>>> {
        self.select(strategy.parse()?)
    }

    /// Scatter figure for `strategy`.
    pub fn figure(&self, strategy: StrategyKind) -> Result<ScatterFigure> {
        let rows = self.select(strategy)?;
        ScatterFigure::from_rows(&rows, &self.pipeline.config().plot)
    }

    /// Compute every offered strategy up front.
    pub fn precompute(&self) -> Result<()> {
        let pending: Vec<StrategyKind> = self
            .strategies()
            .into_iter()
            .filter(|s| !self.is_computed(*s))
            .collect();

        #[cfg(feature = "parallel")]
        let results: Vec<(StrategyKind, Result<Vec<PlotRow>>)> = {
            use rayon::prelude::*;
            pending
                .par_iter()
                .map(|&s| (s, self.pipeline.run(&self.documents, s)))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<(StrategyKind, Result<Vec<PlotRow>>)> = pending
            .iter()
            .map(|&s| (s, self.pipeline.run(&self.documents, s)))
            .collect();

        let mut computed = self.computed.write();
        for (strategy, rows) in results {
            computed.entry(strategy).or_insert(Arc::new(rows?));
        }
        info!("{} strategies precomputed", computed.len());
        Ok(())
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.by_id.get(&id).map(|&idx| &self.documents[idx])
    }

    /// Text pane content for a click, or the placeholder when nothing is
    /// selected.
    pub fn click_text(&self, clicked: Option<DocumentId>) -> Result<String> {
        let Some(id) = clicked else {
            return Ok(CLICK_PLACEHOLDER.to_string());
        };
        self.document(id)
            .map(pane_text)
            .ok_or_else(|| TextSpaceError::Validation(format!("no document with id {}", id)))
    }

    /// Resolve a click by title.
    ///
    /// Only kept for front ends that report the clicked label instead of the
    /// point id; titles are unique within a session.
    pub fn click_text_by_title(&self, title: &str) -> Result<String> {
        self.documents
            .iter()
            .find(|d| d.title == title)
            .map(pane_text)
            .ok_or_else(|| TextSpaceError::Validation(format!("no document titled '{}'", title)))
    }
}

fn pane_text(doc: &Document) -> String {
    format!("{}\n\n{}", doc.title, doc.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextSpaceConfig;
    use crate::features::Models;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;

    fn session() -> TextSpaceSession {
        let docs = vec![
            Document::new(0, "Fields", "a", "wheat and barley in the summer fields"),
            Document::new(1, "Sea", "b", "waves break on the rocks by the sea"),
            Document::new(2, "City", "a", "lights and traffic in the busy city"),
            Document::new(3, "Forest", "c", "pines and moss in the quiet forest"),
        ];
        let pipeline = Pipeline::new(Models::new(), TextSpaceConfig::default()).unwrap();
        TextSpaceSession::new(docs, pipeline).unwrap()
    }

    #[test]
    fn offers_only_model_free_strategies_without_models() {
        assert_eq!(
            session().strategies(),
            vec![StrategyKind::Lexical, StrategyKind::Topic]
        );
    }

    #[test]
    fn select_is_memoised() {
        let session = session();
        assert!(!session.is_computed(StrategyKind::Lexical));
        let first = session.select(StrategyKind::Lexical).unwrap();
        assert!(session.is_computed(StrategyKind::Lexical));
        let second = session.select_named("bow").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unavailable_strategy_is_a_configuration_error() {
        let err = session().select(StrategyKind::Neural).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = session().select_named("word2vec").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn precompute_fills_every_offered_strategy() {
        let session = session();
        session.precompute().unwrap();
        assert!(session.is_computed(StrategyKind::Lexical));
        assert!(session.is_computed(StrategyKind::Topic));
        assert!(!session.is_computed(StrategyKind::Emotion));
    }

    #[test]
    fn click_text_shows_title_and_body() {
        let session = session();
        assert_eq!(session.click_text(None).unwrap(), CLICK_PLACEHOLDER);
        assert_eq!(
            session.click_text(Some(DocumentId(1))).unwrap(),
            "Sea\n\nwaves break on the rocks by the sea"
        );
        assert_eq!(
            session.click_text_by_title("City").unwrap(),
            "City\n\nlights and traffic in the busy city"
        );
        assert!(session.click_text(Some(DocumentId(9))).is_err());
        assert!(session.click_text_by_title("Desert").is_err());
    }

    #[test]
    fn figure_click_resolves_to_document() {
        let session = session();
        let figure = session.figure(StrategyKind::Topic).unwrap();
        assert_eq!(figure.len(), 4);
        let id = figure.document_at(0, 1).unwrap();
        assert_eq!(session.document(id).unwrap().title, "City");
    }

    #[test]
    fn rejects_duplicate_titles_at_open() {
        let docs = vec![
            Document::new(0, "Same", "a", "one text"),
            Document::new(1, "Same", "b", "another text"),
        ];
        let pipeline = Pipeline::new(Models::new(), TextSpaceConfig::default()).unwrap();
        let err = TextSpaceSession::new(docs, pipeline).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
