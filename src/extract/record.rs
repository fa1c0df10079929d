use serde::Serialize;

/// One extracted record, an independent value object
///
/// Field order mirrors the export column order. `index` is the position in
/// the final aggregated sequence; it is recomputed after truncation and
/// enrichment, never trusted mid-pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Dense, zero-based position in the final record sequence
    pub index: usize,

    /// Element name of the match (e.g. `div`, `img`)
    pub tag: String,

    /// Visible text with intra-element whitespace collapsed to single spaces
    pub text: String,

    /// Absolute link carried by the element itself, if any
    pub href: Option<String>,

    /// Resolved value of the caller-chosen attribute, if requested
    pub attribute_value: Option<String>,

    /// Best-effort detected or enriched image URL
    pub image_url: Option<String>,

    /// Absolute link to a secondary detail page, if one could be resolved
    pub detail_url: Option<String>,

    /// Serialized outer markup of the element, length-capped
    pub html: String,
}
