use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::style::CellStyle;
use super::value::{CellValue, Key, Model};

/// Caller-supplied cell content resolver: `(model, key, overall index) -> value`.
#[derive(Clone)]
pub struct ContentResolver(Arc<dyn Fn(&Model, &Key, u64) -> CellValue + Send + Sync>);

impl ContentResolver {
    pub fn new(f: impl Fn(&Model, &Key, u64) -> CellValue + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn resolve(&self, model: &Model, key: &Key, index: u64) -> CellValue {
        (self.0)(model, key, index)
    }
}

impl fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentResolver(..)")
    }
}

/// Caller-supplied aggregate: receives the computed cell range (e.g. "C2:C5")
/// and produces the footer cell for that group run.
#[derive(Clone)]
pub struct CustomAggregate(Arc<dyn Fn(&str) -> CellValue + Send + Sync>);

impl CustomAggregate {
    pub fn new(f: impl Fn(&str) -> CellValue + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn compute(&self, range: &str) -> CellValue {
        (self.0)(range)
    }
}

impl fmt::Debug for CustomAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomAggregate(..)")
    }
}

/// Aggregate emitted at a group-run boundary.
#[derive(Debug, Clone)]
pub enum GroupAggregate {
    Sum,
    Count,
    Average,
    Max,
    Min,
    Custom(CustomAggregate),
}

impl GroupAggregate {
    /// Spreadsheet formula over `range`, or the custom callback's value.
    pub fn compute(&self, range: &str) -> CellValue {
        let func = match self {
            GroupAggregate::Sum => "SUM",
            GroupAggregate::Count => "COUNT",
            GroupAggregate::Average => "AVERAGE",
            GroupAggregate::Max => "MAX",
            GroupAggregate::Min => "MIN",
            GroupAggregate::Custom(custom) => return custom.compute(range),
        };
        CellValue::Formula(format!("={func}({range})"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Regular data column resolved from the model.
    Data,
    /// Running row number; ignores resolvers and attributes.
    Serial,
    /// UI action column, never exported.
    Action,
}

/// Display format spec for a column.
///
/// `kind` is kept as free text on purpose: an unrecognized kind falls back to
/// raw passthrough instead of failing the export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    /// chrono pattern the incoming text value is parsed with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_in: Option<String>,
    /// chrono pattern the cell is rendered with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_out: Option<String>,
}

impl FormatSpec {
    pub fn raw() -> Self {
        Self {
            kind: "raw".to_string(),
            ..Self::default()
        }
    }

    pub fn integer() -> Self {
        Self {
            kind: "integer".to_string(),
            ..Self::default()
        }
    }

    pub fn decimal(decimals: u32) -> Self {
        Self {
            kind: "decimal".to_string(),
            decimals: Some(decimals),
            ..Self::default()
        }
    }

    pub fn currency(decimals: u32) -> Self {
        Self {
            kind: "currency".to_string(),
            decimals: Some(decimals),
            ..Self::default()
        }
    }

    pub fn percent(decimals: u32) -> Self {
        Self {
            kind: "percent".to_string(),
            decimals: Some(decimals),
            ..Self::default()
        }
    }

    pub fn date(date_in: &str, date_out: &str) -> Self {
        Self {
            kind: "date".to_string(),
            date_in: Some(date_in.to_string()),
            date_out: Some(date_out.to_string()),
            ..Self::default()
        }
    }
}

/// Column descriptor supplied by the collaborator before the export starts.
#[derive(Debug, Clone)]
pub struct Column {
    /// 0-based position within the full column list; stable across filtering.
    pub ordinal: usize,
    pub kind: ColumnKind,
    /// Dotted path into the model, e.g. "customer.name".
    pub attribute: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub content: Option<ContentResolver>,
    pub format: Option<FormatSpec>,
    pub style: Option<CellStyle>,
    /// Marks this column as a grouping key: consecutive equal values form a
    /// run that ends with an aggregate row and a merged display cell.
    pub group: bool,
    pub group_footer: Option<GroupAggregate>,
    pub hidden: bool,
    pub no_export: bool,
    pub selectable: bool,
}

impl Column {
    pub fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            kind: ColumnKind::Data,
            attribute: None,
            header: None,
            footer: None,
            content: None,
            format: None,
            style: None,
            group: false,
            group_footer: None,
            hidden: false,
            no_export: false,
            selectable: true,
        }
    }

    pub fn for_attribute(ordinal: usize, attribute: &str) -> Self {
        Self::new(ordinal).with_attribute(attribute)
    }

    pub fn serial(ordinal: usize) -> Self {
        let mut column = Self::new(ordinal);
        column.kind = ColumnKind::Serial;
        column
    }

    pub fn action(ordinal: usize) -> Self {
        let mut column = Self::new(ordinal);
        column.kind = ColumnKind::Action;
        column
    }

    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn with_header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    pub fn with_footer(mut self, footer: &str) -> Self {
        self.footer = Some(footer.to_string());
        self
    }

    pub fn with_content(mut self, resolver: ContentResolver) -> Self {
        self.content = Some(resolver);
        self
    }

    pub fn with_format(mut self, format: FormatSpec) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn grouped(mut self) -> Self {
        self.group = true;
        self
    }

    pub fn with_group_footer(mut self, aggregate: GroupAggregate) -> Self {
        self.group_footer = Some(aggregate);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn no_export(mut self) -> Self {
        self.no_export = true;
        self
    }

    /// Whether this column occupies a slot in the exported sheet, given an
    /// optional caller-selected ordinal subset.
    pub fn is_exportable(&self, selected: Option<&[usize]>) -> bool {
        if self.kind == ColumnKind::Action || self.no_export || self.hidden {
            return false;
        }
        match selected {
            Some(ordinals) => ordinals.contains(&self.ordinal),
            None => true,
        }
    }
}

/// "first_name" or "customer.first_name" -> "First Name".
pub(crate) fn humanize_attribute(attribute: &str) -> String {
    let leaf = attribute.rsplit('.').next().unwrap_or(attribute);
    leaf.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
