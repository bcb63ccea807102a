//! Effect parameters and their override chain.
//!
//! Each effect reads one typed parameter struct. Values come from up to three
//! override tiers (per-glyph-per-instance, per-instance, caller) and fall
//! back to the built-in defaults below.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EffectError;

/// Parameters for dot placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DotParams {
    /// Diameter of each dot.
    pub dot_size: f64,
    /// Preferred gap between neighbouring dots.
    pub dot_spacing: f64,
    /// How far (as a percentage of `dot_spacing`) spacing may stretch or
    /// shrink so a contour ends on an even fit.
    pub flex_percent: f64,
    /// Drop dots closer than `dot_size` to an already placed one.
    pub prevent_overlaps: bool,
    /// Break contours where they cross each other.
    pub split_paths: bool,
    /// Dot a different layer's outline instead of the glyph's own.
    pub contour_source: Option<String>,
}

impl Default for DotParams {
    fn default() -> Self {
        Self {
            dot_size: 15.0,
            dot_spacing: 15.0,
            flex_percent: 25.0,
            prevent_overlaps: true,
            split_paths: false,
            contour_source: None,
        }
    }
}

impl DotParams {
    /// Distance between centres of neighbouring dots before any adjustment.
    pub fn preferred_step(&self) -> f64 {
        self.dot_size + self.dot_spacing
    }
}

/// Cap drawn at the open ends of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cap {
    Round,
    Square,
    Circle,
}

impl FromStr for Cap {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round" => Ok(Cap::Round),
            "square" => Ok(Cap::Square),
            "circle" => Ok(Cap::Circle),
            _ => Err(EffectError::UnknownCap(s.to_string())),
        }
    }
}

impl TryFrom<String> for Cap {
    type Error = EffectError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cap> for String {
    fn from(cap: Cap) -> Self {
        match cap {
            Cap::Round => "round",
            Cap::Square => "square",
            Cap::Circle => "circle",
        }
        .to_string()
    }
}

/// How consecutive stroke segments are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Join {
    Round,
    Bevel,
    Mitre,
    Circle,
}

impl FromStr for Join {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round" => Ok(Join::Round),
            "bevel" => Ok(Join::Bevel),
            "mitre" | "miter" => Ok(Join::Mitre),
            "circle" => Ok(Join::Circle),
            _ => Err(EffectError::UnknownJoin(s.to_string())),
        }
    }
}

impl TryFrom<String> for Join {
    type Error = EffectError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Join> for String {
    fn from(join: Join) -> Self {
        match join {
            Join::Round => "round",
            Join::Bevel => "bevel",
            Join::Mitre => "mitre",
            Join::Circle => "circle",
        }
        .to_string()
    }
}

/// Parameters for the constant-width stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrokeParams {
    /// Full width of the nib in font units.
    pub stroker_width: f64,
    /// Full height of the nib; the width is used when unset or zero.
    pub stroker_height: Option<f64>,
    /// Nib rotation in degrees.
    pub stroker_angle: f64,
    pub start_cap: Cap,
    pub end_cap: Cap,
    pub join_type: Join,
    /// Keep only the outer side of stroked closed contours.
    pub remove_internal: bool,
    /// Keep only the inner side of stroked closed contours.
    pub remove_external: bool,
    /// Stroke every segment on its own.
    pub segment_wise: bool,
}

impl Default for StrokeParams {
    fn default() -> Self {
        Self {
            stroker_width: 50.0,
            stroker_height: None,
            stroker_angle: 0.0,
            start_cap: Cap::Round,
            end_cap: Cap::Round,
            join_type: Join::Round,
            remove_internal: false,
            remove_external: false,
            segment_wise: false,
        }
    }
}

impl StrokeParams {
    pub fn height(&self) -> f64 {
        match self.stroker_height {
            Some(h) if h != 0.0 => h,
            _ => self.stroker_width,
        }
    }
}

/// Vertical position of a guideline: a named font metric or a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuideHeight {
    Value(f64),
    Metric(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guideline {
    pub height: GuideHeight,
    pub thickness: f64,
}

impl Guideline {
    fn metric(name: &str) -> Self {
        Guideline {
            height: GuideHeight::Metric(name.to_string()),
            thickness: 10.0,
        }
    }
}

/// Parameters for horizontal writing guidelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuidelineParams {
    pub guidelines: Vec<Guideline>,
    /// How far the bars extend beyond the glyph on either side.
    pub guideline_overlap: f64,
}

impl Default for GuidelineParams {
    fn default() -> Self {
        Self {
            guidelines: vec![
                Guideline::metric("Descender"),
                Guideline::metric("x-Height"),
                Guideline::metric("Cap Height"),
                Guideline::metric("Ascender"),
            ],
            guideline_overlap: 0.0,
        }
    }
}

/// Parameters for marking where each contour starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartDotParams {
    pub start_dot_size: f64,
}

impl Default for StartDotParams {
    fn default() -> Self {
        Self {
            start_dot_size: 30.0,
        }
    }
}

/// The three override tiers for one glyph layer, most specific first.
#[derive(Debug, Clone, Default)]
pub struct ParamLayers {
    /// Overrides stored on the glyph for the active instance.
    pub layer: Map<String, Value>,
    /// Defaults stored on the active instance.
    pub instance: Map<String, Value>,
    /// Overrides supplied by the caller (command line, JSON config).
    pub caller: Map<String, Value>,
}

impl ParamLayers {
    /// Resolve a typed parameter struct; unset fields take built-in defaults.
    pub fn resolve<T: DeserializeOwned>(&self) -> Result<T, EffectError> {
        let mut merged = self.caller.clone();
        for (key, value) in self.instance.iter().chain(&self.layer) {
            merged.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(merged)).map_err(|e| {
            // Unknown cap/join names surface as serde errors; keep their wording.
            EffectError::InvalidParameter(e.to_string())
        })
    }
}
