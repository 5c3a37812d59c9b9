use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetch::FetchCoordinator;
use crate::model::EventSummary;
use crate::EMPTY_LIST_MESSAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Owner,
    Confirmed,
    Pending,
}

impl AttendanceStatus {
    #[must_use]
    pub const fn of(event: &EventSummary) -> Self {
        if event.is_owner {
            Self::Owner
        } else if event.is_attending {
            Self::Confirmed
        } else {
            Self::Pending
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Owner => "ORGANIZER",
            Self::Confirmed => "CONFIRMED",
            Self::Pending => "PENDING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDate {
    pub day: String,
    pub month: String,
    pub year: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCard {
    pub id: String,
    pub title: String,
    pub address: String,
    pub date: Option<CardDate>,
    pub attendee_names: Vec<String>,
    pub status: AttendanceStatus,
    pub status_label: String,
}

impl From<&EventSummary> for EventCard {
    fn from(event: &EventSummary) -> Self {
        let status = AttendanceStatus::of(event);
        Self {
            id: event.id.to_string(),
            title: event.title.clone(),
            address: event.address.clone(),
            date: parse_event_date(&event.date).map(|d| CardDate {
                day: format!("{:02}", d.day()),
                month: d.format("%b").to_string(),
                year: d.year().to_string(),
            }),
            attendee_names: event.attendees.iter().map(|a| a.name.clone()).collect(),
            status,
            status_label: status.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventListView {
    Skeleton,
    Empty {
        message: String,
    },
    Items {
        cards: Vec<EventCard>,
        is_refreshing: bool,
        is_fetching_more: bool,
        has_next_page: bool,
    },
}

#[must_use]
pub fn present(coordinator: &FetchCoordinator) -> EventListView {
    if !coordinator.has_loaded() {
        return EventListView::Skeleton;
    }

    let pagination = coordinator.pagination();
    let items = coordinator.items();
    if items.is_empty() && !pagination.is_busy() {
        return EventListView::Empty {
            message: EMPTY_LIST_MESSAGE.to_string(),
        };
    }

    EventListView::Items {
        cards: items.iter().map(EventCard::from).collect(),
        is_refreshing: pagination.is_refreshing,
        is_fetching_more: pagination.is_fetching_more,
        has_next_page: pagination.has_next_page,
    }
}

/// End-reached trigger: fires once the last visible row is within
/// `threshold` rows of the end of the list.
#[must_use]
pub const fn should_load_more(last_visible_index: usize, len: usize, threshold: usize) -> bool {
    len > 0 && last_visible_index.saturating_add(threshold).saturating_add(1) >= len
}

/// Server dates arrive as RFC 3339, naive ISO timestamps or epoch millis.
#[must_use]
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive())
}

/// Long form used on the detail screen, e.g. `Jun 1st 2018`.
#[must_use]
pub fn format_event_date(raw: &str) -> Option<String> {
    let date = parse_event_date(raw)?;
    let day = date.day();
    Some(format!(
        "{} {day}{} {}",
        date.format("%b"),
        ordinal_suffix(day),
        date.year()
    ))
}

const fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
