//! Extraction pipeline for the SEACE public procurement search.
//!
//! A run navigates to the search page, applies the caller's filters through
//! the dropdown widgets, triggers the search, waits for the AJAX result table
//! to settle and walks every result page, producing either a [`RunReport`] or
//! a diagnosed [`RunFailure`].

pub mod chrome;
pub mod diagnostics;
pub mod driver;
pub mod errors;
pub mod extract;
pub mod layout;
pub mod models;
pub mod pagination;
pub mod resolver;
pub mod search;
pub mod session;

pub use driver::{BrowserLauncher, Condition, Locator, UiDriver, Wait};
pub use errors::{RunError, WaitKind};
pub use layout::SeaceLayout;
pub use models::{
    Criterion, Diagnostics, FilterCriteria, ResultRecord, RunFailure, RunOutcome, RunReport,
    RunStatus,
};
pub use session::{RunSession, RunSettings, SeaceRunner};
