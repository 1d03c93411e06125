//! End-to-end tests for the TextSpace pipeline with in-process model stand-ins

use std::sync::Arc;

use serde_json::json;
use textspace_core::features::Emotion;
use textspace_core::{
    logging, Document, DocumentId, EmotionClassifier, EmotionScores, ErrorKind, Models, Pipeline,
    Result, ScatterFigure, SequenceEncoder, StrategyKind, Table, TextSpaceConfig, TextSpaceError,
    TextSpaceSession,
};

/// Byte-frequency "encoder" over the first `max_tokens` bytes: deterministic
/// and cheap.
struct CharEncoder;

impl SequenceEncoder for CharEncoder {
    fn name(&self) -> &str {
        "char-encoder"
    }

    fn hidden_size(&self) -> usize {
        8
    }

    fn encode_batch(&self, texts: &[&str], max_tokens: usize) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 8];
                for b in t.bytes().take(max_tokens) {
                    v[(b % 8) as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Keyword-vote classifier producing a proper distribution.
struct VoteClassifier;

impl EmotionClassifier for VoteClassifier {
    fn name(&self) -> &str {
        "vote"
    }

    fn classify(&self, text: &str) -> Result<EmotionScores> {
        let mut votes = [1.0f32; 7];
        for word in text.split_whitespace() {
            let emotion = match word {
                "love" | "sunshine" => Emotion::Joy,
                "cry" | "alone" => Emotion::Sadness,
                "hate" | "burn" => Emotion::Anger,
                "dark" | "run" => Emotion::Fear,
                _ => Emotion::Neutral,
            };
            votes[emotion.index()] += 1.0;
        }
        let total: f32 = votes.iter().sum();
        Ok(votes.map(|v| v / total))
    }
}

/// Returns scores that do not sum to one.
struct SkewedClassifier;

impl EmotionClassifier for SkewedClassifier {
    fn name(&self) -> &str {
        "skewed"
    }

    fn classify(&self, _text: &str) -> Result<EmotionScores> {
        Ok([0.5; 7])
    }
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new(0, "Sunny Day", "Ana", "love the sunshine love the day"),
        Document::new(1, "Lonely Road", "Ben", "I cry alone on the road at night"),
        Document::new(2, "Fire", "Ana", "hate will burn the bridges we built"),
        Document::new(3, "Shadows", "Cleo", "run from the dark before it finds you"),
        Document::new(4, "Ordinary", "Ben", "coffee at nine and the bus at ten"),
    ]
}

fn full_models() -> Models {
    Models::new()
        .with_encoder(Arc::new(CharEncoder))
        .with_emotion_classifier(Arc::new(VoteClassifier))
}

fn pipeline() -> Pipeline {
    logging::try_init("textspace_core=debug");
    Pipeline::new(full_models(), TextSpaceConfig::default()).unwrap()
}

#[test]
fn test_every_strategy_yields_one_row_per_document() {
    let pipeline = pipeline();
    let docs = corpus();

    for strategy in StrategyKind::ALL {
        let rows = pipeline.run(&docs, strategy).unwrap();
        assert_eq!(rows.len(), docs.len(), "{}", strategy);
        for (row, doc) in rows.iter().zip(&docs) {
            assert_eq!(row.id, doc.id);
            assert_eq!(row.title, doc.title);
            assert_eq!(row.author, doc.author);
            assert_eq!(row.strategy, strategy);
            assert!(row.point.x.is_finite() && row.point.y.is_finite() && row.point.z.is_finite());
        }
    }
}

#[test]
fn test_emotion_features_are_distributions() {
    let pipeline = pipeline();
    let matrix = pipeline
        .extractor()
        .extract(&corpus(), StrategyKind::Emotion)
        .unwrap();

    assert_eq!(matrix.dim(), (5, 7));
    for row in matrix.rows() {
        let sum: f64 = row.sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
    // "Sunny Day" leans towards joy
    let joy = matrix[[0, Emotion::Joy.index()]];
    let sadness = matrix[[0, Emotion::Sadness.index()]];
    assert!(joy > sadness);
}

#[test]
fn test_invalid_classifier_output_is_a_model_error() {
    let models = Models::new().with_emotion_classifier(Arc::new(SkewedClassifier));
    let pipeline = Pipeline::new(models, TextSpaceConfig::default()).unwrap();
    let err = pipeline.run(&corpus(), StrategyKind::Emotion).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Model);
}

#[test]
fn test_projection_is_deterministic() {
    let pipeline = pipeline();
    let first = pipeline.run(&corpus(), StrategyKind::Neural).unwrap();
    let second = pipeline.run(&corpus(), StrategyKind::Neural).unwrap();
    assert_eq!(first, second);

    let first = pipeline.run(&corpus(), StrategyKind::Topic).unwrap();
    let second = pipeline.run(&corpus(), StrategyKind::Topic).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_neural_context_window_comes_from_config() {
    let docs = corpus();
    let config = TextSpaceConfig::builder().neural_max_tokens(4).build().unwrap();
    let capped = Pipeline::new(full_models(), config).unwrap();
    let matrix = capped
        .extractor()
        .extract(&docs, StrategyKind::Neural)
        .unwrap();
    for row in matrix.rows() {
        assert_eq!(row.sum(), 4.0);
    }

    let full = pipeline()
        .extractor()
        .extract(&docs, StrategyKind::Neural)
        .unwrap();
    for (row, doc) in full.rows().into_iter().zip(&docs) {
        assert_eq!(row.sum(), doc.text.len() as f64);
    }
}

#[test]
fn test_missing_text_column_is_reported() {
    let table = Table::from_rows(
        ["author", "title", "lyrics"],
        vec![vec![json!("Ana"), json!("Sunny Day"), json!("love")]],
    )
    .unwrap();
    let err = pipeline()
        .run_table(&table, StrategyKind::Lexical)
        .unwrap_err();
    match err {
        TextSpaceError::MissingColumn { column } => assert_eq!(column, "text"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_custom_column_mapping() {
    let config = TextSpaceConfig::builder()
        .columns("artist", "lyrics", "song")
        .build()
        .unwrap();
    let pipeline = Pipeline::new(Models::new(), config).unwrap();
    let table = Table::from_rows(
        ["artist", "song", "lyrics"],
        corpus()
            .into_iter()
            .map(|d| vec![json!(d.author), json!(d.title), json!(d.text)])
            .collect(),
    )
    .unwrap();

    let out = pipeline.run_table(&table, StrategyKind::Lexical).unwrap();
    assert_eq!(out.columns(), ["artist", "song", "lyrics", "x", "y", "z"]);
    assert_eq!(out.get(3, "song"), Some(&json!("Shadows")));
}

#[test]
fn test_unknown_strategy_name() {
    let err = pipeline()
        .extractor()
        .extract_named(&corpus(), "doc2vec")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    // older names still resolve
    let bow = pipeline().extractor().extract_named(&corpus(), "BoW").unwrap();
    let lexical = pipeline()
        .extractor()
        .extract(&corpus(), StrategyKind::Lexical)
        .unwrap();
    assert_eq!(bow, lexical);
}

#[test]
fn test_too_few_features_to_project() {
    let docs = vec![
        Document::new(0, "One", "a", "yes yes"),
        Document::new(1, "Two", "b", "no no"),
        Document::new(2, "Three", "c", "yes no"),
    ];
    let err = pipeline().run(&docs, StrategyKind::Lexical).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_empty_batch_and_blank_text() {
    let err = pipeline().run(&[], StrategyKind::Lexical).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut docs = corpus();
    docs[2].text = "   ".to_string();
    let err = pipeline().run(&docs, StrategyKind::Topic).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_session_click_round_trip() {
    let session = TextSpaceSession::new(corpus(), pipeline()).unwrap();
    assert_eq!(session.strategies(), StrategyKind::ALL.to_vec());

    let figure: ScatterFigure = session.figure(StrategyKind::Emotion).unwrap();
    let authors: Vec<&str> = figure.data.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(authors, ["Ana", "Ben", "Cleo"]);

    // second point of Ben's trace is "Ordinary"
    let id = figure.document_at(1, 1).unwrap();
    assert_eq!(id, DocumentId(4));
    assert_eq!(
        session.click_text(Some(id)).unwrap(),
        "Ordinary\n\ncoffee at nine and the bus at ten"
    );
}

#[test]
fn test_session_precompute() {
    let session = TextSpaceSession::new(corpus(), pipeline()).unwrap();
    session.precompute().unwrap();
    for strategy in StrategyKind::ALL {
        assert!(session.is_computed(strategy));
    }
}
