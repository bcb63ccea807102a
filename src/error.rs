use thiserror::Error;

/// Errors that can occur while transforming glyph outlines.
///
/// Configuration errors are reported before any geometry work starts.
/// Geometry errors are scoped to a single contour or glyph; batch runs
/// record them per glyph and keep going.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EffectError {
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    #[error("unknown cap type: {0}")]
    UnknownCap(String),

    #[error("unknown join type: {0}")]
    UnknownJoin(String),

    #[error("no instance named {0:?}")]
    UnknownInstance(String),

    #[error("invalid parameters: {0}")]
    InvalidParameter(String),

    #[error("component nesting deeper than {depth} levels (at {base:?})")]
    ReferenceDepth { base: String, depth: usize },

    #[error("component references missing glyph {0:?}")]
    MissingReference(String),

    #[error("intersection point ({x:.2}, {y:.2}) is not on the path")]
    PointNotOnPath { x: f64, y: f64 },

    #[error("no insertion index for segment at node {0}")]
    MissingInsertionIndex(usize),

    #[error("stroke engine failed: {0}")]
    Stroke(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "ufo")]
    #[error("norad error: {0}")]
    Norad(#[from] norad::error::FontLoadError),

    #[cfg(feature = "ufo")]
    #[error("norad write error: {0}")]
    NoradWrite(#[from] norad::error::FontWriteError),

    #[cfg(feature = "ufo")]
    #[error("invalid glyph name: {0}")]
    Name(#[from] norad::error::NamingError),

    #[cfg(feature = "ufo")]
    #[error("invalid lib data: {0}")]
    Plist(#[from] plist::Error),
}

impl EffectError {
    /// True for errors in the input's setup rather than its geometry.
    ///
    /// Parameter errors stop a batch before it starts; a missing component
    /// base is only found while decomposing and fails just that glyph.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EffectError::UnknownEffect(_)
                | EffectError::UnknownCap(_)
                | EffectError::UnknownJoin(_)
                | EffectError::UnknownInstance(_)
                | EffectError::InvalidParameter(_)
                | EffectError::ReferenceDepth { .. }
                | EffectError::MissingReference(_)
        )
    }
}
