//! Search, filter, sort and pagination over a loaded collection.
//!
//! [`derive_view`] is a pure function of the records, the [`ViewState`] and
//! the current day. It keeps the order the records were loaded in unless a
//! sort is requested, and never fails on records with missing fields: an
//! absent field simply does not match.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::record::Record;

pub const DEFAULT_ITEMS_PER_PAGE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// What the user has typed and selected above a record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search_text: String,
    pub filters: BTreeMap<String, String>,
    pub sort: Option<SortSpec>,
    current_page: usize,
    items_per_page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_PER_PAGE)
    }
}

impl ViewState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            search_text: String::new(),
            filters: BTreeMap::new(),
            sort: None,
            current_page: 1,
            items_per_page: items_per_page.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// Pages are 1-based; 0 is treated as 1.
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Clamped to at least 1.
    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.items_per_page = items_per_page.max(1);
    }

    /// Sets or clears (`None` or an empty value) the filter on `field`.
    pub fn set_filter(&mut self, field: impl Into<String>, value: Option<String>) {
        let field = field.into();
        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                self.filters.insert(field, v);
            }
            None => {
                self.filters.remove(&field);
            }
        }
    }

    /// Resets the cursor to page 1 if it no longer addresses a page of a
    /// result set with `total_pages` pages. Returns whether it moved.
    pub fn clamp_page(&mut self, total_pages: usize) -> bool {
        if self.current_page > total_pages.max(1) {
            self.current_page = 1;
            true
        } else {
            false
        }
    }
}

/// One rendered page of a collection.
#[derive(Debug)]
pub struct RecordView<'a, R> {
    pub page: Vec<&'a R>,
    /// Page actually shown, after resolving an out-of-range cursor.
    pub current_page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub total_count: usize,
}

/// Whether `record` passes the search text and every active filter.
///
/// Any non-empty search text, whitespace included, is matched verbatim.
pub fn matches<R: Record>(record: &R, state: &ViewState, today: NaiveDate) -> bool {
    if !state.search_text.is_empty() {
        let needle = state.search_text.to_lowercase();
        let hit = record
            .search_value(today)
            .is_some_and(|value| value.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    state
        .filters
        .iter()
        .all(|(field, wanted)| record.field(field, today).as_deref() == Some(wanted.as_str()))
}

/// `ceil(filtered_count / items_per_page)`, never less than 1.
pub fn total_pages(filtered_count: usize, items_per_page: usize) -> usize {
    filtered_count.div_ceil(items_per_page.max(1)).max(1)
}

pub fn derive_view<'a, R: Record>(
    records: &'a [R],
    state: &ViewState,
    today: NaiveDate,
) -> RecordView<'a, R> {
    let mut filtered: Vec<&'a R> = records
        .iter()
        .filter(|r| matches(*r, state, today))
        .collect();

    if let Some(sort) = &state.sort {
        // Stable: equal keys keep load order. Missing values sort first.
        filtered.sort_by(|a, b| {
            let ord = compare_fields(
                a.field(&sort.field, today).as_deref(),
                b.field(&sort.field, today).as_deref(),
            );
            match sort.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }

    let per_page = state.items_per_page.max(1);
    let filtered_count = filtered.len();
    let total_pages = total_pages(filtered_count, per_page);
    let current_page = if state.current_page > total_pages {
        1
    } else {
        state.current_page.max(1)
    };

    let start = (current_page - 1) * per_page;
    let page = filtered.into_iter().skip(start).take(per_page).collect();

    RecordView {
        page,
        current_page,
        total_pages,
        filtered_count,
        total_count: records.len(),
    }
}

fn compare_fields(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_lowercase().cmp(&b.to_lowercase()),
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Duty, Station};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn stations(names: &[&str]) -> Vec<Station> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Station::new(*n, "Ward 1").with_id(format!("s{i}")))
            .collect()
    }

    #[test]
    fn search_is_case_insensitive() {
        let records = stations(&["Central Station", "North Station"]);
        for needle in ["central", "CENTRAL", "Central S"] {
            let mut state = ViewState::default();
            state.search_text = needle.to_string();
            let view = derive_view(&records, &state, today());
            let names: Vec<_> = view.page.iter().map(|s| s.name.as_deref()).collect();
            assert_eq!(names, vec![Some("Central Station")]);
        }
    }

    #[test]
    fn whitespace_search_is_not_blank() {
        let mut records = stations(&["Central Station"]);
        records.push(Station::default().with_id("blank"));
        let mut state = ViewState::default();

        state.search_text = "  ".to_string();
        assert_eq!(derive_view(&records, &state, today()).filtered_count, 0);

        state.search_text = " ".to_string();
        let view = derive_view(&records, &state, today());
        assert_eq!(view.filtered_count, 1);
        assert_eq!(view.page[0].id.as_deref(), Some("s0"));

        state.search_text.clear();
        assert_eq!(derive_view(&records, &state, today()).filtered_count, 2);
    }

    #[test]
    fn empty_collection_has_one_page() {
        let records: Vec<Station> = Vec::new();
        let view = derive_view(&records, &ViewState::default(), today());
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.current_page, 1);
        assert!(view.page.is_empty());
    }

    #[test]
    fn page_past_end_resolves_to_first() {
        let records = stations(&["A1", "B1", "C1"]);
        let mut state = ViewState::new(2);
        state.set_page(5);
        let view = derive_view(&records, &state, today());
        assert_eq!(view.current_page, 1);
        assert_eq!(view.page.len(), 2);
    }

    #[test]
    fn records_missing_the_field_never_match() {
        let mut records = stations(&["Central Station"]);
        records.push(Station::default().with_id("blank"));
        let mut state = ViewState::default();
        state.search_text = "station".to_string();
        state.set_filter("location", Some("Ward 1".to_string()));
        let view = derive_view(&records, &state, today());
        assert_eq!(view.filtered_count, 1);
    }

    #[test]
    fn status_filter_uses_derived_status() {
        let records = vec![
            Duty::new("B-1", "Central").between("2024-06-01", "2024-06-05"),
            Duty::new("B-2", "Central").between("2024-06-01", "2024-06-20"),
            Duty::new("B-3", "Central").on("2024-07-01"),
        ];
        let mut state = ViewState::default();
        state.set_filter("status", Some("Completed".to_string()));
        let view = derive_view(&records, &state, today());
        assert_eq!(view.page.len(), 1);
        assert_eq!(view.page[0].badge_number.as_deref(), Some("B-1"));

        state.set_filter("status", Some("In Progress".to_string()));
        let view = derive_view(&records, &state, today());
        assert_eq!(view.page[0].badge_number.as_deref(), Some("B-2"));
    }

    #[test]
    fn sort_is_stable_and_numeric_aware() {
        let records = vec![
            Duty::new("10", "North").with_id("a"),
            Duty::new("9", "Central").with_id("b"),
            Duty::new("10", "Central").with_id("c"),
        ];
        let mut state = ViewState::default();
        state.sort = Some(SortSpec {
            field: "badgeNumber".to_string(),
            direction: SortDirection::Ascending,
        });
        let view = derive_view(&records, &state, today());
        let ids: Vec<_> = view.page.iter().map(|d| d.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        state.sort.as_mut().unwrap().direction = SortDirection::Descending;
        let view = derive_view(&records, &state, today());
        let ids: Vec<_> = view.page.iter().map(|d| d.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn clamp_page_resets_only_when_out_of_range() {
        let mut state = ViewState::new(5);
        state.set_page(3);
        assert!(!state.clamp_page(3));
        assert!(state.clamp_page(2));
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn items_per_page_is_clamped() {
        let mut state = ViewState::new(0);
        assert_eq!(state.items_per_page(), 1);
        state.set_items_per_page(0);
        assert_eq!(state.items_per_page(), 1);
        assert_eq!(total_pages(0, 0), 1);
        assert_eq!(total_pages(21, 20), 2);
    }
}
