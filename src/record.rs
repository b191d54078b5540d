use std::fmt::Debug;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::validation::FieldError;

/// A row of one administered collection.
///
/// Implementors describe how the generic list controller searches, filters,
/// validates and displays them. Field lookups return owned strings so stored
/// and derived fields (such as a duty's status) go through the same path.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Path segment of the REST collection, e.g. `stations`.
    const COLLECTION: &'static str;

    /// Singular human label used in notifications, e.g. `station`.
    const LABEL: &'static str;

    /// Field matched by free-text search.
    const SEARCH_FIELD: &'static str;

    /// Fields offered as exact-match filters.
    const FILTER_FIELDS: &'static [&'static str];

    /// Column headers, in the order produced by [`Record::row`].
    const COLUMNS: &'static [&'static str];

    /// Server-assigned identifier, absent on drafts.
    fn id(&self) -> Option<&str>;

    /// Value of a stored or derived field as shown to the user. Unknown or
    /// absent fields yield `None` and never match a filter.
    fn field(&self, key: &str, today: NaiveDate) -> Option<String>;

    /// Display cells for one table row.
    fn row(&self, today: NaiveDate) -> Vec<String>;

    /// Client-side checks run before create and update.
    fn validate(&self) -> Vec<FieldError>;

    fn search_value(&self, today: NaiveDate) -> Option<String> {
        self.field(Self::SEARCH_FIELD, today)
    }
}
