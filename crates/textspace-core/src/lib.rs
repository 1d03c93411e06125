//! TextSpace: explore a corpus of texts as points in 3D.
//!
//! Each document is turned into a feature vector by one of several
//! strategies (word counts, emotion scores, neural embeddings, topic
//! mixtures), the vectors are reduced to three principal components, and the
//! resulting points are joined back with the document metadata for a 3D
//! scatter plot coloured by author.
//!
//! ```rust
//! use textspace_core::{Document, Models, Pipeline, StrategyKind, TextSpaceConfig};
//!
//! let docs = vec![
//!     Document::new(0, "Hello", "Adele", "hello from the other side"),
//!     Document::new(1, "Yesterday", "The Beatles", "all my troubles seemed so far away"),
//!     Document::new(2, "Imagine", "John Lennon", "imagine all the people living for today"),
//! ];
//! let pipeline = Pipeline::new(Models::new(), TextSpaceConfig::default()).unwrap();
//! let rows = pipeline.run(&docs, StrategyKind::Lexical).unwrap();
//! assert_eq!(rows.len(), 3);
//! assert_eq!(rows[1].title, "Yesterday");
//! ```

pub mod assemble;
pub mod config;
pub mod document;
pub mod error;
pub mod features;
pub mod logging;
pub mod pipeline;
pub mod plot;
pub mod reduce;
pub mod session;

pub use assemble::{assemble, augment_table, PlotRow};
pub use config::{ColumnMapping, PlotOptions, TextSpaceConfig, PLOT_DIMENSIONS};
pub use document::{documents_from_table, metadata_from_file_name, Document, DocumentId, Table};
pub use error::{ErrorKind, Result, TextSpaceError};
pub use features::{
    EmotionClassifier, EmotionScores, FeatureExtractor, Models, SequenceEncoder, StrategyKind,
};
pub use pipeline::Pipeline;
pub use plot::ScatterFigure;
pub use reduce::{fit_project, Pca, ProjectedPoint};
pub use session::TextSpaceSession;
