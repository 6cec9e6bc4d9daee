pub mod batch;

pub use batch::BatchSource;

use anyhow::Result;

use crate::models::{CellValue, Key, Model};

/// Paginated data provider supplied by the collaborator.
///
/// Errors out of a provider are application-level and travel as `anyhow`
/// errors; the engine wraps them into `ExportError::Provider` at its boundary.
pub trait DataProvider {
    /// Total rows in the unpaginated result. Called exactly once per job.
    fn total_count(&mut self) -> Result<u64>;

    /// The provider's own page size, if it paginates.
    fn page_size(&self) -> Option<usize>;

    /// Reconfigure pagination to the given page size. Returns `false` when
    /// the provider cannot be re-paged, which fails the job before any
    /// output is generated.
    fn configure_paging(&mut self, page_size: usize) -> bool;

    fn set_page(&mut self, page: usize);

    /// Push the previously captured total back into the provider so a page
    /// refresh does not re-run the count query.
    fn assert_total_count(&mut self, _total: u64) {}

    /// Load the current page.
    fn refresh(&mut self) -> Result<()>;

    /// Models of the current page.
    fn models(&self) -> Vec<Model>;

    /// Keys parallel to [`DataProvider::models`].
    fn keys(&self) -> Vec<Key>;
}

/// How attribute values and labels are read off a model.
///
/// The variant is picked once, by a feature test on the first model the
/// source yields, never per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Plain JSON mapping: attributes are looked up directly on the object.
    Plain,
    /// Labeled model shape: `{"attributes": {...}, "labels": {...}}`.
    Labeled,
}

impl ValueSource {
    pub fn detect(model: &Model) -> Self {
        let has = |key: &str| model.get(key).map(|v| v.is_object()).unwrap_or(false);
        if has("attributes") && has("labels") {
            ValueSource::Labeled
        } else {
            ValueSource::Plain
        }
    }

    /// Dotted-path attribute lookup. Missing segments resolve to an empty
    /// string so writers never see a hole where the model had none.
    pub fn attribute(&self, model: &Model, path: &str) -> CellValue {
        let root = match self {
            ValueSource::Plain => model,
            ValueSource::Labeled => model.get("attributes").unwrap_or(model),
        };
        let mut current = root;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return CellValue::Text(String::new()),
            }
        }
        CellValue::from_json(current)
    }

    pub fn attribute_label(&self, model: &Model, name: &str) -> Option<String> {
        match self {
            ValueSource::Plain => None,
            ValueSource::Labeled => model
                .get("labels")
                .and_then(|labels| labels.get(name))
                .and_then(|label| label.as_str())
                .map(str::to_string),
        }
    }
}

/// In-memory provider over a vector of models, with optional pagination.
pub struct MemoryProvider {
    models: Vec<Model>,
    keys: Vec<Key>,
    page_size: Option<usize>,
    page: usize,
}

impl MemoryProvider {
    pub fn new(models: Vec<Model>) -> Self {
        let keys = (0..models.len())
            .map(|i| serde_json::json!(i))
            .collect();
        Self {
            models,
            keys,
            page_size: None,
            page: 0,
        }
    }

    pub fn with_keys(mut self, keys: Vec<Key>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn page_bounds(&self) -> (usize, usize) {
        match self.page_size {
            Some(size) => {
                let start = (self.page * size).min(self.models.len());
                let end = (start + size).min(self.models.len());
                (start, end)
            }
            None => (0, self.models.len()),
        }
    }
}

impl DataProvider for MemoryProvider {
    fn total_count(&mut self) -> Result<u64> {
        Ok(self.models.len() as u64)
    }

    fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    fn configure_paging(&mut self, page_size: usize) -> bool {
        self.page_size = Some(page_size);
        true
    }

    fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    fn models(&self) -> Vec<Model> {
        let (start, end) = self.page_bounds();
        self.models[start..end].to_vec()
    }

    fn keys(&self) -> Vec<Key> {
        let (start, end) = self.page_bounds();
        self.keys[start..end].to_vec()
    }
}
