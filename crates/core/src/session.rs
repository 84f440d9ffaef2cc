use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::fields::{self, FieldAnalysis};
use crate::filter::{self, AppliedFilters};
use crate::page::{self, Pagination};
use crate::parse::{self, SourceFormat};
use crate::value::Item;

pub const DEFAULT_PAGE_SIZE: usize = 60;

/// Metadata returned with every successful response. `field_analysis`
/// is only present on a load response; everything else is reported on
/// every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMetadata {
    /// Size of the raw collection.
    pub item_count: usize,
    /// Byte size of the originally loaded content.
    pub total_size: u64,
    /// Wall-clock duration of the triggering operation, milliseconds.
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    pub lines_read: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_analysis: Option<FieldAnalysis>,
    pub pagination: Pagination,
}

/// One page of the current view plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewPage {
    pub items: Vec<Item>,
    pub metadata: ViewMetadata,
}

#[derive(Debug, Clone)]
struct StaticMeta {
    field_analysis: FieldAnalysis,
    total_size: u64,
    lines_read: usize,
}

/// Single-session state: the raw collection, the filtered view over
/// it, and the load-time static metadata. Replaced wholesale on every
/// load, mutated in place by refine, read-only for page.
///
/// No failed operation leaves the session partially mutated: a failed
/// load keeps the previous generation intact, a failed refine keeps
/// the previous filtered collection.
#[derive(Debug)]
pub struct Session {
    raw: Vec<Item>,
    filtered: Vec<Item>,
    statics: Option<StaticMeta>,
    page_size: usize,
}

impl Session {
    pub fn new(page_size: usize) -> Self {
        Self {
            raw: Vec::new(),
            filtered: Vec::new(),
            statics: None,
            page_size: page_size.max(1),
        }
    }

    /// Parses `content`, replaces the whole session state and returns
    /// page 1 of the fresh (unfiltered) view.
    pub fn load(
        &mut self,
        content: &str,
        format: SourceFormat,
        selector: &str,
    ) -> Result<ViewPage> {
        let started = Instant::now();
        if content.trim().is_empty() {
            return Err(EngineError::EmptyContent);
        }
        if format == SourceFormat::Xml && selector.trim().is_empty() {
            return Err(EngineError::SelectorRequired("XML"));
        }
        let (items, source_meta) = parse::parse(content, format, selector)?;
        let field_analysis = fields::analyze(&items);

        self.raw = items;
        self.filtered = self.raw.clone();
        self.statics = Some(StaticMeta {
            field_analysis,
            total_size: content.len() as u64,
            lines_read: source_meta.lines_read,
        });
        info!(
            items = self.raw.len(),
            format = %format,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded collection"
        );
        self.view(1, started, true)
    }

    /// Recomputes the filtered collection from the raw collection and
    /// the full filter set, then returns page 1. Never incremental, so
    /// filters cannot be order-dependent or stale.
    pub fn refine(&mut self, filters: &AppliedFilters) -> Result<ViewPage> {
        let started = Instant::now();
        if self.statics.is_none() {
            return Err(EngineError::NoData);
        }
        self.filtered = filter::apply_filters(&self.raw, filters);
        debug!(
            kept = self.filtered.len(),
            total = self.raw.len(),
            "refined collection"
        );
        self.view(1, started, false)
    }

    /// Returns slice `page` of the current filtered collection.
    /// Out-of-range pages yield an empty slice, not an error.
    pub fn page(&self, page: usize) -> Result<ViewPage> {
        let started = Instant::now();
        if self.statics.is_none() {
            return Err(EngineError::NoData);
        }
        self.view(page, started, false)
    }

    fn view(&self, page: usize, started: Instant, with_analysis: bool) -> Result<ViewPage> {
        let statics = self.statics.as_ref().ok_or(EngineError::NoData)?;
        let (items, pagination) =
            page::paginate(&self.filtered, page, self.page_size, self.raw.len());
        Ok(ViewPage {
            items,
            metadata: ViewMetadata {
                item_count: self.raw.len(),
                total_size: statics.total_size,
                processing_time_ms: started.elapsed().as_millis() as u64,
                lines_read: statics.lines_read,
                field_analysis: with_analysis.then(|| statics.field_analysis.clone()),
                pagination,
            },
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
