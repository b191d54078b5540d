pub mod action;
pub mod api_client;
pub mod client;
pub mod controller;
pub mod error;
pub mod models;
pub mod overview;
pub mod record;
pub mod session;
pub mod status;
pub mod ui;
pub mod validation;
pub mod view;

pub use api_client::{ApiClient, ApiConfig};
pub use client::{DutyDeskClient, RecordBackend, RestCollection};
pub use controller::{Mutation, Notification, NotificationLevel, RecordListController};
pub use error::{ApiError, ControllerError, SessionError, UnknownEntity};
pub use record::Record;
pub use status::{Clock, DutyStatus, FixedClock, SystemClock};
pub use view::{derive_view, RecordView, SortDirection, SortSpec, ViewState};
