//! 3D scatter figure description.
//!
//! Builds a plotly-compatible figure from the rows of one strategy: one
//! `scatter3d` trace per author (the colour key), titles as point labels and
//! the (shortened) text in the hover box. Rendering is left to whatever
//! front end consumes the JSON.

use serde::Serialize;

use crate::assemble::PlotRow;
use crate::config::PlotOptions;
use crate::document::DocumentId;
use crate::error::{Result, TextSpaceError};
use crate::features::{truncate_chars, StrategyKind};

const HOVER_TEMPLATE: &str = "Title: %{text}<br>Lyrics: %{customdata[0]}<br>";

/// A complete figure: traces plus layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterFigure {
    pub data: Vec<ScatterTrace>,
    pub layout: Layout,
    #[serde(skip)]
    pub strategy: StrategyKind,
}

/// Points of one author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterTrace {
    #[serde(rename = "type")]
    pub trace_type: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub legendgroup: String,
    /// Stable row ids, echoed back by click events
    pub ids: Vec<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Point labels (titles)
    pub text: Vec<String>,
    /// Hover text, one single-element array per point
    pub customdata: Vec<[String; 1]>,
    pub hovertemplate: &'static str,
    pub textposition: &'static str,
    pub marker: Marker,
    #[serde(skip)]
    pub document_ids: Vec<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub height: u32,
    pub font: Font,
    pub legend: Legend,
    pub scene: Scene,
    pub margin: Margin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub family: &'static str,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub xaxis: SceneAxis,
    pub yaxis: SceneAxis,
    pub zaxis: SceneAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneAxis {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub b: u32,
    pub t: u32,
}

impl ScatterFigure {
    /// Build the figure for rows that all belong to one strategy.
    pub fn from_rows(rows: &[PlotRow], options: &PlotOptions) -> Result<Self> {
        let strategy = rows
            .first()
            .map(|r| r.strategy)
            .ok_or_else(|| TextSpaceError::Validation("no rows to plot".to_string()))?;
        if let Some(other) = rows.iter().find(|r| r.strategy != strategy) {
            return Err(TextSpaceError::InvariantViolation(format!(
                "figure mixes {} and {} rows",
                strategy, other.strategy
            )));
        }

        let mut data: Vec<ScatterTrace> = Vec::new();
        for row in rows {
            let idx = match data.iter().position(|t| t.name == row.author) {
                Some(idx) => idx,
                None => {
                    data.push(ScatterTrace::new(&row.author, options.opacity));
                    data.len() - 1
                }
            };
            data[idx].push(row, options.hover_max_chars);
        }

        Ok(Self {
            data,
            layout: Layout::new(format!("{} {}", options.title_prefix, strategy), options.height),
            strategy,
        })
    }

    /// Total number of points across traces.
    pub fn len(&self) -> usize {
        self.data.iter().map(|t| t.x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a click given as (trace number, point number).
    pub fn document_at(&self, curve: usize, point: usize) -> Option<DocumentId> {
        self.data.get(curve)?.document_ids.get(point).copied()
    }

    /// Plotly figure JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl ScatterTrace {
    fn new(author: &str, opacity: f64) -> Self {
        Self {
            trace_type: "scatter3d",
            mode: "markers+text",
            name: author.to_string(),
            legendgroup: author.to_string(),
            ids: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            text: Vec::new(),
            customdata: Vec::new(),
            hovertemplate: HOVER_TEMPLATE,
            textposition: "top center",
            marker: Marker { opacity },
            document_ids: Vec::new(),
        }
    }

    fn push(&mut self, row: &PlotRow, hover_max_chars: usize) {
        self.ids.push(row.id.to_string());
        self.document_ids.push(row.id);
        self.x.push(row.point.x);
        self.y.push(row.point.y);
        self.z.push(row.point.z);
        self.text.push(row.title.clone());
        self.customdata.push([hover_text(&row.text, hover_max_chars)]);
    }
}

impl Layout {
    fn new(title: String, height: u32) -> Self {
        let axis = |name: &str| SceneAxis {
            title: Title {
                text: name.to_string(),
            },
        };
        Self {
            title: Title { text: title },
            height,
            font: Font {
                family: "serif",
                size: 18,
            },
            legend: Legend {
                title: Title {
                    text: "author".to_string(),
                },
            },
            scene: Scene {
                xaxis: axis("x"),
                yaxis: axis("y"),
                zaxis: axis("z"),
            },
            margin: Margin { l: 0, r: 0, b: 0, t: 0 },
        }
    }
}

/// Text for the hover box: cut to `max_chars` (marked with `...`) and with
/// line breaks as `<br>`.
pub fn hover_text(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    let mut out = cut.replace('\n', "<br>");
    if cut.len() < text.len() {
        out.push_str("...");
    }
    out
}
