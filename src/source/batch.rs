use std::collections::VecDeque;

use tracing::debug;

use crate::error::{ExportError, Result};
use crate::models::Row;
use crate::source::{DataProvider, ValueSource};

/// Wraps a [`DataProvider`] into a lazy, finite, non-restartable row stream.
///
/// The total count is captured once at construction and trusted for the rest
/// of the job; a result set that changes underneath produces stale-count
/// output rather than a re-query. At most one batch of rows is held in
/// memory.
pub struct BatchSource {
    provider: Box<dyn DataProvider>,
    total: u64,
    page_size: Option<usize>,
    value_source: ValueSource,
    pending: VecDeque<Row>,
    next_index: u64,
    next_page: usize,
    exhausted: bool,
}

impl std::fmt::Debug for BatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSource")
            .field("total", &self.total)
            .field("page_size", &self.page_size)
            .field("value_source", &self.value_source)
            .field("pending", &self.pending)
            .field("next_index", &self.next_index)
            .field("next_page", &self.next_page)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl BatchSource {
    /// Capture the total count, configure paging, and prime the first batch.
    ///
    /// `batch_size` overrides the provider's own page size; a provider that
    /// refuses re-paging fails the job here, before any output exists.
    pub fn new(mut provider: Box<dyn DataProvider>, batch_size: Option<usize>) -> Result<Self> {
        if let Some(size) = batch_size {
            if size == 0 {
                return Err(ExportError::config("batch size must be at least 1"));
            }
            if !provider.configure_paging(size) {
                return Err(ExportError::config(
                    "data provider does not support re-paging for batched export",
                ));
            }
        }
        let page_size = provider.page_size();
        let total = provider.total_count().map_err(ExportError::provider)?;

        let mut source = Self {
            provider,
            total,
            page_size,
            value_source: ValueSource::Plain,
            pending: VecDeque::new(),
            next_index: 0,
            next_page: 0,
            exhausted: total == 0,
        };
        source.fill()?;
        if let Some(first) = source.pending.front() {
            source.value_source = ValueSource::detect(&first.model);
        }
        Ok(source)
    }

    /// Total rows reported by the provider at construction time.
    pub fn total_count(&self) -> u64 {
        self.total
    }

    pub fn value_source(&self) -> ValueSource {
        self.value_source
    }

    /// Next row without consuming it; fetches the next batch when the
    /// current one is drained.
    pub fn peek(&mut self) -> Result<Option<&Row>> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(self.pending.front())
    }

    pub fn next_row(&mut self) -> Result<Option<Row>> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(self.pending.pop_front())
    }

    fn fill(&mut self) -> Result<()> {
        if self.exhausted || !self.pending.is_empty() {
            return Ok(());
        }

        match self.page_size {
            Some(_) => {
                self.provider.set_page(self.next_page);
                self.provider.assert_total_count(self.total);
                self.provider.refresh().map_err(ExportError::provider)?;
                self.next_page += 1;
            }
            None => {
                self.provider.refresh().map_err(ExportError::provider)?;
                self.exhausted = true;
            }
        }

        let models = self.provider.models();
        let keys = self.provider.keys();
        debug!(batch = models.len(), index = self.next_index, "fetched batch");

        if models.is_empty() {
            self.exhausted = true;
            return Ok(());
        }

        for (model, key) in models.into_iter().zip(keys.into_iter()) {
            self.pending.push_back(Row {
                model,
                key,
                index: self.next_index,
            });
            self.next_index += 1;
        }

        if self.next_index >= self.total {
            self.exhausted = true;
        }
        Ok(())
    }
}
