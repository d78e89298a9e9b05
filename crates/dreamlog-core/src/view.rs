//! View controller
//!
//! Turns a filtered, sorted snapshot of a collection into the window the
//! UI should render. Three mutually exclusive modes:
//!
//! - **Paged**: fixed number of records per page, current page clamped
//!   into range on every recompute
//! - **Show all**: the whole filtered collection on one page
//! - **Endless**: a growing prefix of the collection, extended by a fixed
//!   increment whenever the reader scrolls near the bottom
//!
//! Recomputing is idempotent, so callers simply recompute after every
//! mutation instead of serializing it.

use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;
use crate::models::Record;

/// Records per page when nothing else is configured
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// Records added per endless-scroll load
pub const DEFAULT_ENDLESS_INCREMENT: usize = 10;

/// Distance from the bottom, in pixels, that counts as "near the bottom"
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 200.0;

/// How a collection is split for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LimitRepr", into = "LimitRepr")]
pub enum PaginationMode {
    Paged(NonZeroUsize),
    ShowAll,
    Endless,
}

impl PaginationMode {
    /// Paged mode with `n` records per page; zero is rejected
    pub fn paged(n: usize) -> Result<Self, ValidationError> {
        NonZeroUsize::new(n)
            .map(PaginationMode::Paged)
            .ok_or(ValidationError::OutOfRange {
                field: "items per page",
                min: 1,
            })
    }
}

impl Default for PaginationMode {
    fn default() -> Self {
        match NonZeroUsize::new(DEFAULT_ITEMS_PER_PAGE) {
            Some(n) => PaginationMode::Paged(n),
            None => PaginationMode::ShowAll,
        }
    }
}

impl fmt::Display for PaginationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationMode::Paged(n) => write!(f, "{}", n),
            PaginationMode::ShowAll => f.write_str("all"),
            PaginationMode::Endless => f.write_str("endless"),
        }
    }
}

impl FromStr for PaginationMode {
    type Err = ValidationError;

    /// Parse the limit selector: a page size, `all` or `endless`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(PaginationMode::ShowAll),
            "endless" => Ok(PaginationMode::Endless),
            other => match other.parse::<usize>() {
                Ok(n) => PaginationMode::paged(n),
                Err(_) => Err(ValidationError::InvalidValue {
                    field: "pagination limit",
                    value: s.to_string(),
                }),
            },
        }
    }
}

/// Config files may spell the limit as a number or a string
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Number(usize),
    Text(String),
}

impl TryFrom<LimitRepr> for PaginationMode {
    type Error = ValidationError;

    fn try_from(repr: LimitRepr) -> Result<Self, Self::Error> {
        match repr {
            LimitRepr::Number(n) => PaginationMode::paged(n),
            LimitRepr::Text(s) => s.parse(),
        }
    }
}

impl From<PaginationMode> for LimitRepr {
    fn from(mode: PaginationMode) -> Self {
        match mode {
            PaginationMode::Paged(n) => LimitRepr::Number(n.get()),
            other => LimitRepr::Text(other.to_string()),
        }
    }
}

/// One entry of the page-number bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageItem::Page(n) => serializer.serialize_u64(*n as u64),
            PageItem::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{}", n),
            PageItem::Ellipsis => f.write_str("..."),
        }
    }
}

/// Compressed page-number sequence for a page bar
///
/// The first and last pages are always present, as is the window
/// `current - 1 ..= current + 1`. A gap of exactly one page is filled with
/// that page's number; a gap of two or more collapses to an ellipsis.
///
/// `generate_page_numbers(5, 20)` yields `1 ... 4 5 6 ... 20`.
pub fn generate_page_numbers(current: usize, total_pages: usize) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);

    let mut shown = vec![1, total_pages];
    for page in current.saturating_sub(1)..=current + 1 {
        if (1..=total_pages).contains(&page) {
            shown.push(page);
        }
    }
    shown.sort_unstable();
    shown.dedup();

    let mut items = Vec::with_capacity(shown.len() + 2);
    let mut previous = 0;
    for page in shown {
        match page - previous {
            1 => {}
            2 => items.push(PageItem::Page(page - 1)),
            _ => items.push(PageItem::Ellipsis),
        }
        items.push(PageItem::Page(page));
        previous = page;
    }
    items
}

/// Scroll geometry reported by the UI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    /// Distance scrolled from the top
    pub offset: f64,
    /// Height of the visible area
    pub viewport: f64,
    /// Height of the full content
    pub content: f64,
}

impl ScrollPosition {
    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.offset + self.viewport >= self.content - threshold
    }
}

/// Change to the scroll listener caused by a mode switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerChange {
    Attached,
    Detached,
    Unchanged,
}

/// What to render for the current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewWindow {
    pub mode: PaginationMode,
    /// Indices of the visible records within the filtered collection
    pub range: Range<usize>,
    pub current_page: usize,
    pub total_pages: usize,
    /// Size of the filtered collection
    pub total: usize,
    /// Records loaded so far, in endless mode
    pub loaded: Option<usize>,
}

impl ViewWindow {
    /// The visible part of `filtered`
    ///
    /// Tolerates a collection that changed size since the recompute.
    pub fn slice<'a, R>(&self, filtered: &'a [R]) -> &'a [R] {
        let end = self.range.end.min(filtered.len());
        let start = self.range.start.min(end);
        &filtered[start..end]
    }

    /// Whether more records exist beyond the window
    pub fn has_more(&self) -> bool {
        self.range.end < self.total
    }

    /// Page bar for paged mode; empty otherwise
    pub fn page_numbers(&self) -> Vec<PageItem> {
        match self.mode {
            PaginationMode::Paged(_) => generate_page_numbers(self.current_page, self.total_pages),
            _ => Vec::new(),
        }
    }
}

/// Pagination state for one collection
#[derive(Debug, Clone)]
pub struct ViewController {
    mode: PaginationMode,
    increment: usize,
    threshold: f64,
    current_page: usize,
    loaded: usize,
    loading: bool,
    total: usize,
    listener_attached: bool,
    criteria: Option<String>,
    stale: bool,
}

impl ViewController {
    pub fn new(mode: PaginationMode, increment: usize) -> Self {
        let increment = increment.max(1);
        Self {
            mode,
            increment,
            threshold: DEFAULT_SCROLL_THRESHOLD,
            current_page: 1,
            loaded: increment,
            loading: false,
            total: 0,
            listener_attached: mode == PaginationMode::Endless,
            criteria: None,
            stale: true,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn scroll_listener_attached(&self) -> bool {
        self.listener_attached
    }

    /// True when a mutation happened since the last recompute
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn total_pages(&self) -> usize {
        match self.mode {
            PaginationMode::Paged(n) => self.total.div_ceil(n.get()).max(1),
            PaginationMode::ShowAll | PaginationMode::Endless => 1,
        }
    }

    /// Switch modes, resetting position and attaching or detaching the
    /// scroll listener
    pub fn set_mode(&mut self, mode: PaginationMode) -> ListenerChange {
        self.mode = mode;
        self.reset();

        let wants_listener = mode == PaginationMode::Endless;
        match (wants_listener, self.listener_attached) {
            (true, false) => {
                self.listener_attached = true;
                ListenerChange::Attached
            }
            (false, true) => {
                self.listener_attached = false;
                ListenerChange::Detached
            }
            _ => ListenerChange::Unchanged,
        }
    }

    /// Back to the first page and the initial endless window
    pub fn reset(&mut self) {
        self.current_page = 1;
        self.loaded = self.increment;
        self.loading = false;
        self.stale = true;
    }

    /// Mark the view as out of date after a mutation
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Record the criteria the next snapshot was filtered with
    ///
    /// A different key than last time resets the view. Returns whether it
    /// did.
    pub fn set_criteria(&mut self, key: &str) -> bool {
        if self.criteria.as_deref() == Some(key) {
            return false;
        }
        let first = self.criteria.is_none();
        self.criteria = Some(key.to_string());
        if !first {
            self.reset();
        }
        !first
    }

    /// Jump to `page`, clamped into range; returns the page now current
    pub fn go_to_page(&mut self, page: usize) -> usize {
        self.current_page = match self.mode {
            PaginationMode::Paged(_) => page.clamp(1, self.total_pages()),
            PaginationMode::ShowAll | PaginationMode::Endless => 1,
        };
        self.current_page
    }

    /// Recompute the window for a filtered collection of `total` records
    pub fn recompute(&mut self, total: usize) -> ViewWindow {
        self.total = total;
        self.stale = false;

        let (range, loaded) = match self.mode {
            PaginationMode::Paged(n) => {
                self.current_page = self.current_page.clamp(1, self.total_pages());
                let start = (self.current_page - 1) * n.get();
                (start..(start + n.get()).min(total), None)
            }
            PaginationMode::ShowAll => {
                self.current_page = 1;
                (0..total, None)
            }
            PaginationMode::Endless => {
                self.current_page = 1;
                self.loaded = self.loaded.max(self.increment).min(total);
                (0..self.loaded, Some(self.loaded))
            }
        };

        ViewWindow {
            mode: self.mode,
            range,
            current_page: self.current_page,
            total_pages: self.total_pages(),
            total,
            loaded,
        }
    }

    /// Handle a scroll event; true when a load was started
    pub fn on_scroll(&mut self, position: ScrollPosition) -> bool {
        if !self.listener_attached || !position.is_near_bottom(self.threshold) {
            return false;
        }
        self.request_more()
    }

    /// Start loading the next increment
    ///
    /// Refused outside endless mode, while a load is in flight, or when
    /// everything is already loaded.
    pub fn request_more(&mut self) -> bool {
        if self.mode != PaginationMode::Endless || self.loading || self.loaded >= self.total {
            return false;
        }
        self.loading = true;
        true
    }

    /// Finish a load started by [`request_more`](Self::request_more)
    pub fn complete_load(&mut self) -> usize {
        if self.loading {
            self.loaded = (self.loaded + self.increment).min(self.total);
            self.loading = false;
        }
        self.loaded
    }
}

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;
type Comparator<R> = Box<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// Filter and sort applied to a snapshot before pagination
///
/// The key identifies the criteria; the view resets when it changes.
pub struct ViewQuery<R> {
    key: String,
    predicate: Predicate<R>,
    comparator: Comparator<R>,
}

impl<R: Record> ViewQuery<R> {
    /// Everything, newest first
    pub fn all() -> Self {
        Self::new("")
    }

    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            predicate: Box::new(|_| true),
            comparator: Box::new(|a: &R, b: &R| b.created_at().cmp(&a.created_at())),
        }
    }

    pub fn filter(mut self, predicate: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn sort_by(mut self, comparator: impl Fn(&R, &R) -> Ordering + Send + Sync + 'static) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Filter then sort; ties keep their stored order
    pub fn apply(&self, records: Vec<R>) -> Vec<R> {
        let mut filtered: Vec<R> = records.into_iter().filter(|r| (self.predicate)(r)).collect();
        filtered.sort_by(|a, b| (self.comparator)(a, b));
        filtered
    }
}

impl<R: Record> Default for ViewQuery<R> {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dream, DreamDraft};
    use PageItem::{Ellipsis, Page};

    fn paged(n: usize) -> PaginationMode {
        PaginationMode::paged(n).unwrap()
    }

    #[test]
    fn test_page_numbers_middle() {
        assert_eq!(
            generate_page_numbers(5, 20),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(20)]
        );
        assert_eq!(
            serde_json::to_string(&generate_page_numbers(5, 20)).unwrap(),
            r#"[1,"...",4,5,6,"...",20]"#
        );
    }

    #[test]
    fn test_page_numbers_edges() {
        assert_eq!(generate_page_numbers(1, 1), vec![Page(1)]);
        assert_eq!(generate_page_numbers(1, 2), vec![Page(1), Page(2)]);
        assert_eq!(
            generate_page_numbers(1, 10),
            vec![Page(1), Page(2), Ellipsis, Page(10)]
        );
        assert_eq!(
            generate_page_numbers(10, 10),
            vec![Page(1), Ellipsis, Page(9), Page(10)]
        );
        assert!(generate_page_numbers(1, 0).is_empty());
    }

    #[test]
    fn test_page_numbers_single_gap_is_a_number() {
        // Page 2 sits alone between 1 and the window 3..=5
        assert_eq!(
            generate_page_numbers(4, 7),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Page(6), Page(7)]
        );
        assert_eq!(
            generate_page_numbers(4, 8),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(8)]
        );
    }

    #[test]
    fn test_page_numbers_clamps_current() {
        assert_eq!(generate_page_numbers(50, 3), vec![Page(1), Page(2), Page(3)]);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("25".parse::<PaginationMode>().unwrap(), paged(25));
        assert_eq!("ALL".parse::<PaginationMode>().unwrap(), PaginationMode::ShowAll);
        assert_eq!(
            " endless ".parse::<PaginationMode>().unwrap(),
            PaginationMode::Endless
        );
        assert!("0".parse::<PaginationMode>().is_err());
        assert!("lots".parse::<PaginationMode>().is_err());
        assert_eq!(PaginationMode::default().to_string(), "10");
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut view = ViewController::new(paged(10), DEFAULT_ENDLESS_INCREMENT);
        view.recompute(23);
        assert_eq!(view.go_to_page(3), 3);

        let window = view.recompute(23);
        assert_eq!(window.range, 20..23);
        assert_eq!(window.total_pages, 3);

        // 15 deleted
        let window = view.recompute(8);
        assert_eq!(window.current_page, 1);
        assert_eq!(window.total_pages, 1);
        assert_eq!(window.range, 0..8);
    }

    #[test]
    fn test_go_to_page_clamps() {
        let mut view = ViewController::new(paged(10), DEFAULT_ENDLESS_INCREMENT);
        view.recompute(35);
        assert_eq!(view.go_to_page(0), 1);
        assert_eq!(view.go_to_page(99), 4);
        assert_eq!(view.recompute(35).range, 30..35);
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let mut view = ViewController::new(paged(10), DEFAULT_ENDLESS_INCREMENT);
        let window = view.recompute(0);
        assert_eq!(window.total_pages, 1);
        assert_eq!(window.current_page, 1);
        assert_eq!(window.range, 0..0);
        assert_eq!(window.page_numbers(), vec![Page(1)]);
    }

    #[test]
    fn test_show_all() {
        let mut view = ViewController::new(PaginationMode::ShowAll, DEFAULT_ENDLESS_INCREMENT);
        view.recompute(40);
        assert_eq!(view.go_to_page(3), 1);

        let window = view.recompute(40);
        assert_eq!(window.range, 0..40);
        assert!(window.page_numbers().is_empty());
        assert!(!window.has_more());
    }

    #[test]
    fn test_endless_increment_boundary() {
        let mut view = ViewController::new(PaginationMode::Endless, 5);
        assert_eq!(view.recompute(12).loaded, Some(5));

        assert!(view.request_more());
        assert_eq!(view.complete_load(), 10);
        assert!(view.request_more());
        assert_eq!(view.complete_load(), 12);

        assert!(!view.request_more());
        assert_eq!(view.complete_load(), 12);
        assert_eq!(view.recompute(12).range, 0..12);
    }

    #[test]
    fn test_endless_ignores_scroll_while_loading() {
        let mut view = ViewController::new(PaginationMode::Endless, 5);
        view.recompute(30);

        let bottom = ScrollPosition {
            offset: 900.0,
            viewport: 100.0,
            content: 1000.0,
        };
        let top = ScrollPosition {
            offset: 0.0,
            viewport: 100.0,
            content: 1000.0,
        };

        assert!(!view.on_scroll(top));
        assert!(view.on_scroll(bottom));
        assert!(!view.on_scroll(bottom));
        assert!(view.is_loading());

        assert_eq!(view.complete_load(), 10);
        assert!(view.on_scroll(bottom));
    }

    #[test]
    fn test_endless_loaded_follows_total() {
        let mut view = ViewController::new(PaginationMode::Endless, 5);
        assert_eq!(view.recompute(3).loaded, Some(3));
        assert_eq!(view.recompute(4).loaded, Some(4));
        assert_eq!(view.recompute(40).loaded, Some(5));
    }

    #[test]
    fn test_listener_attach_is_idempotent() {
        let mut view = ViewController::new(paged(10), DEFAULT_ENDLESS_INCREMENT);
        assert!(!view.scroll_listener_attached());

        assert_eq!(view.set_mode(PaginationMode::Endless), ListenerChange::Attached);
        assert_eq!(view.set_mode(PaginationMode::Endless), ListenerChange::Unchanged);
        assert!(view.scroll_listener_attached());

        assert_eq!(view.set_mode(paged(5)), ListenerChange::Detached);
        assert_eq!(view.set_mode(PaginationMode::ShowAll), ListenerChange::Unchanged);
        assert!(!view.scroll_listener_attached());
    }

    #[test]
    fn test_mode_switch_resets_position() {
        let mut view = ViewController::new(paged(10), 5);
        view.recompute(50);
        view.go_to_page(4);

        view.set_mode(paged(20));
        assert_eq!(view.current_page(), 1);

        view.set_mode(PaginationMode::Endless);
        view.recompute(50);
        view.request_more();
        view.complete_load();
        assert_eq!(view.loaded(), 10);

        view.set_mode(PaginationMode::Endless);
        assert_eq!(view.loaded(), 5);
    }

    #[test]
    fn test_criteria_change_resets() {
        let mut view = ViewController::new(paged(10), DEFAULT_ENDLESS_INCREMENT);
        assert!(!view.set_criteria("tag:flying"));
        view.recompute(50);
        view.go_to_page(3);

        assert!(!view.set_criteria("tag:flying"));
        assert_eq!(view.current_page(), 3);

        assert!(view.set_criteria("tag:falling"));
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn test_window_slice_tolerates_shrink() {
        let mut view = ViewController::new(paged(10), DEFAULT_ENDLESS_INCREMENT);
        view.recompute(25);
        view.go_to_page(3);
        let window = view.recompute(25);

        let shrunk: Vec<usize> = (0..22).collect();
        assert_eq!(window.slice(&shrunk), &[20, 21]);
        assert!(window.slice(&shrunk[..5]).is_empty());
    }

    #[test]
    fn test_query_filters_and_sorts_newest_first() {
        let mut dreams = Vec::new();
        for (i, tag) in ["sea", "sky", "sea"].iter().enumerate() {
            let mut dream = DreamDraft::new(format!("dream {}", i))
                .with_tags([*tag])
                .into_dream()
                .unwrap();
            dream.created_at += chrono::Duration::minutes(i as i64);
            dreams.push(dream);
        }

        let query = ViewQuery::<Dream>::new("tag:sea").filter(|d| d.tags.iter().any(|t| t == "sea"));
        let visible = query.apply(dreams.clone());
        let contents: Vec<&str> = visible.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["dream 2", "dream 0"]);
        assert_eq!(query.key(), "tag:sea");

        assert_eq!(ViewQuery::<Dream>::all().apply(dreams).len(), 3);
    }

    #[test]
    fn test_mode_serde_accepts_number_or_text() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            limit: PaginationMode,
        }

        let w: Wrapper = toml::from_str("limit = 25").unwrap();
        assert_eq!(w.limit, paged(25));
        let w: Wrapper = toml::from_str("limit = \"endless\"").unwrap();
        assert_eq!(w.limit, PaginationMode::Endless);
        assert!(toml::from_str::<Wrapper>("limit = 0").is_err());

        let out = toml::to_string(&Wrapper { limit: paged(7) }).unwrap();
        assert_eq!(out.trim(), "limit = 7");
    }
}
