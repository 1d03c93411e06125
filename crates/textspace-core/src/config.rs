//! Configuration for the TextSpace pipeline.
//!
//! Every section has defaults, so an empty JSON object is a valid
//! configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TextSpaceError};

/// Number of axes a projected point has.
pub const PLOT_DIMENSIONS: usize = 3;

/// Names of the required input columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub author: String,
    pub text: String,
    pub title: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            author: "author".to_string(),
            text: "text".to_string(),
            title: "title".to_string(),
        }
    }
}

/// Emotion strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Characters of each text handed to the classifier
    pub max_chars: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self { max_chars: 512 }
    }
}

/// Neural strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    /// Token ceiling; longer inputs are truncated by the encoder
    pub max_tokens: usize,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self { max_tokens: 1024 }
    }
}

/// Topic strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub n_topics: usize,
    pub max_iter: usize,
    /// Seed for the factor initialisation
    pub seed: u64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            n_topics: 5,
            max_iter: 200,
            seed: 0,
        }
    }
}

/// Dimensionality reducer settings.
///
/// Plot space is always three-dimensional. The field is kept so that a
/// config file asking for another target fails at load time instead of
/// being silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Must equal [`PLOT_DIMENSIONS`]
    pub components: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            components: PLOT_DIMENSIONS,
        }
    }
}

/// Figure settings for the scatter adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// Figure title is `"<title_prefix> <strategy>"`
    pub title_prefix: String,
    pub height: u32,
    pub opacity: f64,
    /// Characters of text shown on hover before `...`
    pub hover_max_chars: usize,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            title_prefix: "TextSpace".to_string(),
            height: 800,
            opacity: 0.7,
            hover_max_chars: 1000,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSpaceConfig {
    pub columns: ColumnMapping,
    pub emotion: EmotionConfig,
    pub neural: NeuralConfig,
    pub topic: TopicConfig,
    pub reducer: ReducerConfig,
    pub plot: PlotOptions,
}

impl TextSpaceConfig {
    /// Create a new builder for constructing a [`TextSpaceConfig`].
    pub fn builder() -> TextSpaceConfigBuilder {
        TextSpaceConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TextSpaceError::Configuration(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable together.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("author", &self.columns.author),
            ("text", &self.columns.text),
            ("title", &self.columns.title),
        ];
        let mut distinct = HashSet::new();
        for (role, name) in names {
            if name.trim().is_empty() {
                return Err(TextSpaceError::Configuration(format!(
                    "{} column name is empty",
                    role
                )));
            }
            if !distinct.insert(name.as_str()) {
                return Err(TextSpaceError::Configuration(format!(
                    "column '{}' is mapped to more than one role",
                    name
                )));
            }
        }

        if self.emotion.max_chars == 0 {
            return Err(config_error("emotion.max_chars must be greater than zero"));
        }
        if self.neural.max_tokens == 0 {
            return Err(config_error("neural.max_tokens must be greater than zero"));
        }
        if self.topic.n_topics == 0 {
            return Err(config_error("topic.n_topics must be greater than zero"));
        }
        if self.topic.max_iter == 0 {
            return Err(config_error("topic.max_iter must be greater than zero"));
        }
        if self.reducer.components != PLOT_DIMENSIONS {
            return Err(TextSpaceError::Configuration(format!(
                "reducer.components must be {}, got {}",
                PLOT_DIMENSIONS, self.reducer.components
            )));
        }
        if !(self.plot.opacity > 0.0 && self.plot.opacity <= 1.0) {
            return Err(TextSpaceError::Configuration(format!(
                "plot.opacity must be in (0, 1], got {}",
                self.plot.opacity
            )));
        }
        if self.plot.hover_max_chars == 0 {
            return Err(config_error("plot.hover_max_chars must be greater than zero"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> TextSpaceError {
    TextSpaceError::Configuration(message.to_string())
}

/// Builder for constructing a validated [`TextSpaceConfig`].
#[derive(Debug, Clone, Default)]
pub struct TextSpaceConfigBuilder {
    config: TextSpaceConfig,
}

impl TextSpaceConfigBuilder {
    /// Set the author, text and title column names.
    pub fn columns(
        mut self,
        author: impl Into<String>,
        text: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.config.columns = ColumnMapping {
            author: author.into(),
            text: text.into(),
            title: title.into(),
        };
        self
    }

    pub fn emotion_max_chars(mut self, max_chars: usize) -> Self {
        self.config.emotion.max_chars = max_chars;
        self
    }

    pub fn neural_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.neural.max_tokens = max_tokens;
        self
    }

    pub fn topics(mut self, n_topics: usize) -> Self {
        self.config.topic.n_topics = n_topics;
        self
    }

    pub fn topic_iterations(mut self, max_iter: usize) -> Self {
        self.config.topic.max_iter = max_iter;
        self
    }

    pub fn topic_seed(mut self, seed: u64) -> Self {
        self.config.topic.seed = seed;
        self
    }

    pub fn reducer_components(mut self, components: usize) -> Self {
        self.config.reducer.components = components;
        self
    }

    pub fn plot(mut self, plot: PlotOptions) -> Self {
        self.config.plot = plot;
        self
    }

    /// Build the [`TextSpaceConfig`], validating it.
    ///
    /// # Errors
    ///
    /// Returns [`TextSpaceError::Configuration`] for any value rejected by
    /// [`TextSpaceConfig::validate`].
    pub fn build(self) -> Result<TextSpaceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
