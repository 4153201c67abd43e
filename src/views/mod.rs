//! State behind the two note surfaces: the popup bound to the active tab
//! and the dashboard listing every page.

pub mod dashboard;
pub mod popup;

use chrono::{DateTime, Local, TimeZone, Utc};
use url::Url;

pub use dashboard::{DashboardCard, DashboardView, WebsiteOption};
pub use popup::{EditMode, PopupNote, PopupView, TabSource};

/// `Oct 18, 2026, 04:34 PM` in local time.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    format_timestamp_in(value, &Local)
}

pub fn format_timestamp_in<Tz: TimeZone>(value: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    value
        .with_timezone(tz)
        .format("%b %-d, %Y, %I:%M %p")
        .to_string()
}

/// Host part of a page URL, or the URL itself when it has none.
pub fn hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
