//! Fetch-state coordination for the paginated events list.
//!
//! The coordinator owns the committed filters, the cursor and the two
//! in-flight flags. It never talks to the network itself: `refetch` and
//! `load_more` hand back a [`FetchRequest`] for the caller to send, and
//! the caller feeds the outcome back through [`FetchCoordinator::complete`].
//!
//! Every request carries a [`FetchStamp`]. Only the completion whose stamp
//! matches the latest issued request is applied, so a slow response for a
//! superseded query can never overwrite newer results.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::{Coordinates, EventSummary, FilterOverride, FilterState, PaginationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchPolicy {
    /// Bypass the page cache.
    NetworkOnly,
    /// Serve from the page cache when the exact variables were seen before.
    StoreOrNetwork,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchKind {
    Refetch,
    LoadMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchStamp {
    pub mount_id: u64,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub stamp: FetchStamp,
    pub kind: FetchKind,
    pub policy: FetchPolicy,
    pub filters: FilterState,
    pub cursor: Option<String>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventsPage {
    pub items: Vec<EventSummary>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied(FetchKind),
    Failed(FetchKind),
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
struct InFlight {
    stamp: FetchStamp,
    kind: FetchKind,
    /// Filters to commit once a refetch lands.
    filters: Option<FilterState>,
}

#[derive(Debug, Clone)]
pub struct FetchCoordinator {
    mount_id: u64,
    generation: u64,
    filters: FilterState,
    pagination: PaginationState,
    items: Vec<EventSummary>,
    has_loaded: bool,
    in_flight: Option<InFlight>,
}

impl FetchCoordinator {
    #[must_use]
    pub fn new(mount_id: u64, filters: FilterState, page_size: u32) -> Self {
        Self {
            mount_id,
            generation: 0,
            filters,
            pagination: PaginationState::with_page_size(page_size),
            items: Vec::new(),
            has_loaded: false,
            in_flight: None,
        }
    }

    #[must_use]
    pub const fn mount_id(&self) -> u64 {
        self.mount_id
    }

    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    #[must_use]
    pub const fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    #[must_use]
    pub fn items(&self) -> &[EventSummary] {
        &self.items
    }

    /// True once any fetch for this mount has completed, successfully or not.
    #[must_use]
    pub const fn has_loaded(&self) -> bool {
        self.has_loaded
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<FetchStamp> {
        self.in_flight.as_ref().map(|f| f.stamp)
    }

    /// Records the device position for this mount.
    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.filters.coordinates = coordinates;
        self.filters.has_coordinates = true;
    }

    /// Starts a forced reload from the first page with `patch` merged over
    /// the committed filters. Dropped while another refetch is outstanding.
    pub fn refetch(&mut self, patch: &FilterOverride) -> Option<FetchRequest> {
        if self.pagination.is_refreshing {
            tracing::debug!(
                mount_id = self.mount_id,
                generation = self.generation,
                "refetch dropped while refreshing"
            );
            return None;
        }

        let filters = self.filters.merged(patch);
        self.pagination.is_refreshing = true;
        self.pagination.is_fetching_more = false;
        let stamp = self.next_stamp();
        self.in_flight = Some(InFlight {
            stamp,
            kind: FetchKind::Refetch,
            filters: Some(filters.clone()),
        });

        Some(FetchRequest {
            stamp,
            kind: FetchKind::Refetch,
            policy: FetchPolicy::NetworkOnly,
            filters,
            cursor: None,
            count: self.pagination.page_size,
        })
    }

    /// Requests the page after the current cursor.
    pub fn load_more(&mut self) -> Option<FetchRequest> {
        let p = &self.pagination;
        if p.is_fetching_more || p.is_refreshing || !p.has_next_page {
            return None;
        }

        self.pagination.is_fetching_more = true;
        let stamp = self.next_stamp();
        self.in_flight = Some(InFlight {
            stamp,
            kind: FetchKind::LoadMore,
            filters: None,
        });

        Some(FetchRequest {
            stamp,
            kind: FetchKind::LoadMore,
            policy: FetchPolicy::StoreOrNetwork,
            filters: self.filters.clone(),
            cursor: self.pagination.cursor.clone(),
            count: self.pagination.page_size,
        })
    }

    pub fn complete(&mut self, stamp: FetchStamp, result: Result<EventsPage, AppError>) -> Completion {
        let current = self.in_flight.as_ref().map(|f| f.stamp);
        if stamp.mount_id != self.mount_id || current != Some(stamp) {
            tracing::debug!(
                mount_id = stamp.mount_id,
                generation = stamp.generation,
                current_generation = self.generation,
                "stale events page discarded"
            );
            return Completion::Stale;
        }

        let Some(in_flight) = self.in_flight.take() else {
            return Completion::Stale;
        };
        self.pagination.is_refreshing = false;
        self.pagination.is_fetching_more = false;
        self.has_loaded = true;

        match result {
            Ok(page) => {
                match in_flight.kind {
                    FetchKind::Refetch => {
                        if let Some(filters) = in_flight.filters {
                            self.filters = filters;
                        }
                        self.items = page.items;
                    }
                    FetchKind::LoadMore => self.items.extend(page.items),
                }
                self.pagination.cursor = page.end_cursor;
                self.pagination.has_next_page = page.has_next_page;
                Completion::Applied(in_flight.kind)
            }
            Err(error) => {
                tracing::warn!(
                    kind = ?in_flight.kind,
                    code = error.code(),
                    error = %error,
                    "events fetch failed"
                );
                Completion::Failed(in_flight.kind)
            }
        }
    }

    fn next_stamp(&mut self) -> FetchStamp {
        self.generation += 1;
        FetchStamp {
            mount_id: self.mount_id,
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::EventId;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn summary(id: &str) -> EventSummary {
        EventSummary {
            id: EventId::new(id),
            title: format!("Event {id}"),
            address: "Rua Augusta".into(),
            date: "2018-06-01T19:00:00Z".into(),
            attendees: Vec::new(),
            is_owner: false,
            is_attending: false,
        }
    }

    fn page(ids: &[&str], cursor: &str, has_next_page: bool) -> EventsPage {
        EventsPage {
            items: ids.iter().map(|id| summary(id)).collect(),
            end_cursor: Some(cursor.into()),
            has_next_page,
        }
    }

    fn loaded(has_next_page: bool) -> FetchCoordinator {
        let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
        let req = c.refetch(&FilterOverride::default()).unwrap();
        c.complete(req.stamp, Ok(page(&["a", "b"], "c1", has_next_page)));
        c
    }

    #[test]
    fn refetch_is_forced_from_first_page() {
        let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
        let req = c.refetch(&FilterOverride::default()).unwrap();
        assert_eq!(req.policy, FetchPolicy::NetworkOnly);
        assert_eq!(req.cursor, None);
        assert_eq!(req.count, 10);
        assert!(c.pagination().is_refreshing);
    }

    #[test]
    fn refetch_while_refreshing_is_dropped_and_first_filters_win() {
        let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
        let first = c.refetch(&FilterOverride::search("conf")).unwrap();
        assert!(c.refetch(&FilterOverride::search("meetup")).is_none());

        assert_eq!(
            c.complete(first.stamp, Ok(EventsPage::default())),
            Completion::Applied(FetchKind::Refetch)
        );
        assert_eq!(c.filters().search, "conf");
    }

    #[test]
    fn search_override_leaves_other_fields_untouched() {
        let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
        let before = c.filters().clone();
        let req = c.refetch(&FilterOverride::search("conf")).unwrap();
        c.complete(req.stamp, Ok(EventsPage::default()));

        let after = c.filters();
        assert_eq!(after.search, "conf");
        assert_eq!(after.distance_radius, before.distance_radius);
        assert_eq!(after.date_window_days, before.date_window_days);
        assert_eq!(after.coordinates, before.coordinates);
    }

    #[test]
    fn filters_are_not_committed_before_completion() {
        let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
        let req = c.refetch(&FilterOverride::distance(50)).unwrap();
        assert_eq!(req.filters.distance_radius, 50);
        assert_eq!(c.filters().distance_radius, 80);
    }

    #[test]
    fn failed_refetch_keeps_filters_and_clears_flags() {
        let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
        let req = c.refetch(&FilterOverride::distance(50)).unwrap();
        let outcome = c.complete(req.stamp, Err(AppError::new(ErrorKind::Network, "offline")));
        assert_eq!(outcome, Completion::Failed(FetchKind::Refetch));
        assert_eq!(c.filters().distance_radius, 80);
        assert!(!c.pagination().is_busy());
        assert!(c.has_loaded());
    }

    #[test]
    fn load_more_without_next_page_is_noop() {
        let mut c = loaded(false);
        assert!(c.load_more().is_none());
        assert!(!c.pagination().is_fetching_more);
    }

    #[test]
    fn load_more_is_idempotent_under_reentry() {
        let mut c = loaded(true);
        let first = c.load_more().unwrap();
        assert_eq!(first.cursor.as_deref(), Some("c1"));
        assert_eq!(first.policy, FetchPolicy::StoreOrNetwork);
        assert!(c.load_more().is_none());
        assert!(c.load_more().is_none());
        assert_eq!(c.in_flight(), Some(first.stamp));
    }

    #[test]
    fn load_more_appends_and_advances_cursor() {
        let mut c = loaded(true);
        let req = c.load_more().unwrap();
        c.complete(req.stamp, Ok(page(&["c"], "c2", false)));
        let ids: Vec<_> = c.items().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(c.pagination().cursor.as_deref(), Some("c2"));
        assert!(!c.pagination().has_next_page);
    }

    #[test]
    fn refetch_supersedes_pending_load_more() {
        let mut c = loaded(true);
        let more = c.load_more().unwrap();
        let refresh = c.refetch(&FilterOverride::default()).unwrap();
        assert!(!c.pagination().is_fetching_more);

        assert_eq!(c.complete(more.stamp, Ok(page(&["x"], "cx", true))), Completion::Stale);
        assert_matches!(
            c.complete(refresh.stamp, Ok(page(&["z"], "cz", false))),
            Completion::Applied(FetchKind::Refetch)
        );
        assert_eq!(c.items().len(), 1);
    }

    #[test]
    fn load_more_rejected_while_refreshing() {
        let mut c = loaded(true);
        c.refetch(&FilterOverride::default()).unwrap();
        assert!(c.load_more().is_none());
    }

    #[test]
    fn completion_from_another_mount_is_stale() {
        let mut c = FetchCoordinator::new(2, FilterState::default(), 10);
        let req = c.refetch(&FilterOverride::default()).unwrap();
        let foreign = FetchStamp {
            mount_id: 1,
            generation: req.stamp.generation,
        };
        assert_eq!(c.complete(foreign, Ok(EventsPage::default())), Completion::Stale);
        assert!(c.pagination().is_refreshing);
    }

    #[test]
    fn set_coordinates_marks_fix() {
        let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
        c.set_coordinates(Coordinates::ORIGIN);
        assert!(c.filters().has_coordinates);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Refetch(u32),
        LoadMore,
        CompleteLatest { ok: bool, more: bool },
        CompleteOld,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..200).prop_map(Op::Refetch),
            Just(Op::LoadMore),
            (any::<bool>(), any::<bool>()).prop_map(|(ok, more)| Op::CompleteLatest { ok, more }),
            Just(Op::CompleteOld),
        ]
    }

    proptest! {
        #[test]
        fn busy_flags_are_mutually_exclusive(ops in proptest::collection::vec(op(), 1..40)) {
            let mut c = FetchCoordinator::new(1, FilterState::default(), 10);
            let mut issued: Vec<FetchStamp> = Vec::new();

            for op in ops {
                match op {
                    Op::Refetch(km) => {
                        if let Some(req) = c.refetch(&FilterOverride::distance(km)) {
                            issued.push(req.stamp);
                        }
                    }
                    Op::LoadMore => {
                        let before = c.pagination().clone();
                        match c.load_more() {
                            Some(req) => issued.push(req.stamp),
                            None => prop_assert_eq!(&before, c.pagination()),
                        }
                    }
                    Op::CompleteLatest { ok, more } => {
                        if let Some(stamp) = c.in_flight() {
                            let result = if ok {
                                Ok(EventsPage { items: Vec::new(), end_cursor: Some("c".into()), has_next_page: more })
                            } else {
                                Err(AppError::new(ErrorKind::Timeout, "slow"))
                            };
                            prop_assert_ne!(c.complete(stamp, result), Completion::Stale);
                            prop_assert!(!c.pagination().is_busy());
                        }
                    }
                    Op::CompleteOld => {
                        let latest = c.in_flight();
                        if let Some(old) = issued.iter().copied().find(|s| Some(*s) != latest) {
                            let before = c.pagination().clone();
                            prop_assert_eq!(c.complete(old, Ok(EventsPage::default())), Completion::Stale);
                            prop_assert_eq!(&before, c.pagination());
                        }
                    }
                }

                let p = c.pagination();
                prop_assert!(!(p.is_fetching_more && p.is_refreshing));
                prop_assert_eq!(p.is_busy(), c.in_flight().is_some());
            }
        }
    }
}
