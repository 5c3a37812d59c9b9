use serde::{Deserialize, Serialize};

use crate::model::FilterOverride;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterModalKind {
    Distance,
    Date,
}

/// Open/closed state of the distance and date filter modals. Confirming
/// yields the override to refetch with; dismissing changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterModals {
    distance_open: bool,
    date_open: bool,
}

impl FilterModals {
    pub fn open(&mut self, kind: FilterModalKind) {
        *self.flag(kind) = true;
    }

    pub fn dismiss(&mut self, kind: FilterModalKind) {
        *self.flag(kind) = false;
    }

    #[must_use]
    pub const fn is_open(&self, kind: FilterModalKind) -> bool {
        match kind {
            FilterModalKind::Distance => self.distance_open,
            FilterModalKind::Date => self.date_open,
        }
    }

    pub fn confirm_distance(&mut self, km: u32) -> Option<FilterOverride> {
        self.take(FilterModalKind::Distance)
            .then(|| FilterOverride::distance(km))
    }

    /// `None` days means no date restriction.
    pub fn confirm_date(&mut self, days: Option<u32>) -> Option<FilterOverride> {
        self.take(FilterModalKind::Date)
            .then(|| FilterOverride::days(days))
    }

    fn take(&mut self, kind: FilterModalKind) -> bool {
        std::mem::take(self.flag(kind))
    }

    fn flag(&mut self, kind: FilterModalKind) -> &mut bool {
        match kind {
            FilterModalKind::Distance => &mut self.distance_open,
            FilterModalKind::Date => &mut self.date_open,
        }
    }
}
