use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    Thin,
    Medium,
    Thick,
    Double,
    Dashed,
    Dotted,
    Hair,
}

/// Cell style fragment. Every field is optional so that styles can be layered:
/// a later layer only fills the gaps an earlier layer left open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<HorizontalAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valign: Option<VerticalAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
}

impl CellStyle {
    pub fn bold() -> Self {
        Self {
            bold: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset field from `other`. Fields already set on `self`
    /// always win; this is the merge rule used across the whole style stack.
    pub fn merge_missing(&mut self, other: &CellStyle) {
        if self.bold.is_none() {
            self.bold = other.bold;
        }
        if self.italic.is_none() {
            self.italic = other.italic;
        }
        if self.font_size.is_none() {
            self.font_size = other.font_size;
        }
        if self.font_color.is_none() {
            self.font_color = other.font_color.clone();
        }
        if self.fill_color.is_none() {
            self.fill_color = other.fill_color.clone();
        }
        if self.align.is_none() {
            self.align = other.align;
        }
        if self.valign.is_none() {
            self.valign = other.valign;
        }
        if self.num_format.is_none() {
            self.num_format = other.num_format.clone();
        }
        if self.border.is_none() {
            self.border = other.border;
        }
        if self.wrap.is_none() {
            self.wrap = other.wrap;
        }
    }
}

/// Style configuration for the sheet regions of one output format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionStyles {
    #[serde(default)]
    pub header: CellStyle,
    #[serde(default)]
    pub body: CellStyle,
    #[serde(default)]
    pub group_row: CellStyle,
    /// Border/fill applied to the full header+body rectangle after the body
    /// pass completes.
    #[serde(default)]
    pub box_style: CellStyle,
}
