use assert_matches::assert_matches;
use crux_core::testing::AppTester;
use serde_json::Value;

use shared::capabilities::{PermissionOperation, PermissionStatus, Position};
use shared::fetch::{EventsPage, FetchStamp};
use shared::filters::FilterModalKind;
use shared::graphql::{EventsVariables, MutationPayload};
use shared::list::EventListView;
use shared::model::{EventId, EventSummary};
use shared::session::AuthFlow;
use shared::view::ScreenView;
use shared::{App, AppConfig, Effect, Event, Model, Platform};

type Tester = AppTester<App, Effect>;

fn start(platform: Platform) -> (Tester, Model, Vec<Effect>) {
    let app = Tester::default();
    let mut model = Model::default();
    let config = AppConfig {
        platform,
        ..AppConfig::default()
    };
    app.update(Event::AppStarted { config: Some(config) }, &mut model);
    let update = app.update(
        Event::SessionTokenLoaded {
            token: Some(b"secret-token".to_vec()),
        },
        &mut model,
    );
    (app, model, update.effects)
}

fn mount_id(model: &Model) -> u64 {
    model.events_screen.as_ref().unwrap().mount_id
}

fn in_flight(model: &Model) -> FetchStamp {
    model
        .events_screen
        .as_ref()
        .unwrap()
        .coordinator
        .in_flight()
        .unwrap()
}

fn graphql_bodies(effects: &[Effect]) -> Vec<Value> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Http(req) => Some(serde_json::from_slice(&req.operation.body).unwrap()),
            _ => None,
        })
        .collect()
}

const LNG: f64 = -46.63;
const LAT: f64 = -23.55;

/// iOS session with the device located; returns the first-page request body.
fn located(app: &Tester, model: &mut Model) -> Value {
    let id = mount_id(model);
    let update = app.update(
        Event::PositionReceived {
            mount_id: id,
            result: Ok(Position {
                longitude: LNG,
                latitude: LAT,
                accuracy_m: Some(12.0),
                timestamp_ms: None,
            }),
        },
        model,
    );
    let mut bodies = graphql_bodies(&update.effects);
    assert_eq!(bodies.len(), 1);
    bodies.remove(0)
}

fn summary(id: &str) -> EventSummary {
    EventSummary {
        id: EventId::new(id),
        title: format!("Event {id}"),
        address: "Rua Augusta".into(),
        date: "2018-06-01T19:00:00Z".into(),
        attendees: vec![],
        is_owner: false,
        is_attending: false,
    }
}

fn page(ids: &[&str], cursor: Option<&str>, has_next_page: bool) -> EventsPage {
    EventsPage {
        items: ids.iter().map(|id| summary(id)).collect(),
        end_cursor: cursor.map(str::to_string),
        has_next_page,
    }
}

fn deliver(app: &Tester, model: &mut Model, stamp: FetchStamp, page: EventsPage) -> Vec<Effect> {
    app.update(
        Event::EventsFetched {
            stamp,
            cache_key: format!("key-{}", stamp.generation),
            result: Ok(page),
        },
        model,
    )
    .effects
}

/// Answers whatever fetch is currently outstanding.
fn answer(app: &Tester, model: &mut Model, page: EventsPage) -> Vec<Effect> {
    let stamp = in_flight(model);
    deliver(app, model, stamp, page)
}

fn item_ids(model: &Model) -> Vec<String> {
    model
        .events_screen
        .as_ref()
        .unwrap()
        .coordinator
        .items()
        .iter()
        .map(|e| e.id.to_string())
        .collect()
}

#[test]
fn ios_reads_position_then_requests_first_page() {
    let (app, mut model, effects) = start(Platform::Ios);

    assert!(effects.iter().any(|e| matches!(e, Effect::Geolocation(_))));
    assert!(graphql_bodies(&effects).is_empty());
    assert_matches!(
        app.view(&model).screen,
        ScreenView::Events(view) if view.list == EventListView::Skeleton
    );

    let body = located(&app, &mut model);
    assert!(body["query"].as_str().unwrap().contains("EventsScreenRefetchQuery"));
    let vars = &body["variables"];
    assert_eq!(vars["count"], 10);
    assert_eq!(vars["cursor"], Value::Null);
    assert_eq!(vars["search"], "");
    assert_eq!(vars["coordinates"], serde_json::json!([LNG, LAT]));
    assert_eq!(vars["distance"], 80);
    assert_eq!(vars["days"], 7);
}

#[test]
fn graphql_requests_carry_the_session_token() {
    let (app, mut model, _) = start(Platform::Ios);
    let id = mount_id(&model);
    let update = app.update(
        Event::PositionReceived {
            mount_id: id,
            result: Ok(Position {
                longitude: LNG,
                latitude: LAT,
                accuracy_m: None,
                timestamp_ms: None,
            }),
        },
        &mut model,
    );

    let Some(Effect::Http(req)) = update.effects.iter().find(|e| matches!(e, Effect::Http(_)))
    else {
        panic!("expected an HTTP effect");
    };
    assert_eq!(req.operation.method, "POST");
    assert!(req
        .operation
        .headers
        .iter()
        .any(|h| h.name.eq_ignore_ascii_case("authorization") && h.value == "secret-token"));
}

#[test]
fn android_denied_permission_falls_back_to_default_filters() {
    let (app, mut model, effects) = start(Platform::Android);
    let id = mount_id(&model);

    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Permissions(req) if matches!(req.operation, PermissionOperation::Check { .. })
    )));

    let update = app.update(
        Event::LocationPermissionChecked {
            mount_id: id,
            status: PermissionStatus::Denied,
        },
        &mut model,
    );
    let rationale = update.effects.iter().find_map(|e| match e {
        Effect::Permissions(req) => match &req.operation {
            PermissionOperation::Request { rationale, .. } => Some(rationale.clone()),
            PermissionOperation::Check { .. } => None,
        },
        _ => None,
    });
    assert_eq!(rationale.unwrap().title, "Location Permission");

    let update = app.update(
        Event::LocationPermissionAnswered {
            mount_id: id,
            status: PermissionStatus::Denied,
        },
        &mut model,
    );
    let bodies = graphql_bodies(&update.effects);
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["variables"]["coordinates"], serde_json::json!([0.0, 0.0]));
    assert_eq!(bodies[0]["variables"]["distance"], 80);

    assert_matches!(
        app.view(&model).screen,
        ScreenView::Events(view) if view.location_denied
    );
}

#[test]
fn answers_for_an_old_mount_are_ignored() {
    let (app, mut model, _) = start(Platform::Android);
    let id = mount_id(&model);

    let update = app.update(
        Event::LocationPermissionChecked {
            mount_id: id + 7,
            status: PermissionStatus::Granted,
        },
        &mut model,
    );
    assert!(!update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Geolocation(_) | Effect::Http(_))));
}

#[test]
fn empty_first_page_shows_the_empty_message() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, EventsPage::default());

    assert_matches!(
        app.view(&model).screen,
        ScreenView::Events(view)
            if view.list == (EventListView::Empty { message: "No events near you".into() })
    );
}

#[test]
fn refetch_is_dropped_while_refreshing() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    let first = in_flight(&model);

    let update = app.update(Event::RefreshRequested, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());
    let update = app.update(Event::SearchChanged { text: "rust".into() }, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());

    assert_eq!(in_flight(&model), first);
}

#[test]
fn load_more_is_rejected_while_refreshing() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1", "2"], Some("c1"), true));

    let update = app.update(Event::RefreshRequested, &mut model);
    assert_eq!(graphql_bodies(&update.effects).len(), 1);

    let update = app.update(Event::LoadMoreRequested, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());
    let pagination = model.events_screen.as_ref().unwrap().coordinator.pagination();
    assert!(pagination.is_refreshing);
    assert!(!pagination.is_fetching_more);
}

#[test]
fn load_more_appends_the_next_page_and_stops_at_the_end() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1", "2"], Some("c1"), true));

    let update = app.update(Event::LoadMoreRequested, &mut model);
    let bodies = graphql_bodies(&update.effects);
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["variables"]["cursor"], "c1");

    // Second load-more while the first is outstanding is a no-op.
    let update = app.update(Event::LoadMoreRequested, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());

    answer(&app, &mut model, page(&["3"], Some("c2"), false));
    assert_eq!(item_ids(&model), ["1", "2", "3"]);

    let update = app.update(Event::LoadMoreRequested, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());
}

#[test]
fn end_reached_respects_the_threshold() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    let ids: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    answer(&app, &mut model, page(&ids, Some("c1"), true));

    let update = app.update(Event::EndReached { last_visible_index: 5 }, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());

    let update = app.update(Event::EndReached { last_visible_index: 6 }, &mut model);
    assert_eq!(graphql_bodies(&update.effects).len(), 1);
}

#[test]
fn superseded_page_is_discarded() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1"], Some("c1"), true));

    app.update(Event::LoadMoreRequested, &mut model);
    let load_more = in_flight(&model);

    app.update(Event::RefreshRequested, &mut model);
    let refresh = in_flight(&model);
    assert!(refresh.generation > load_more.generation);

    deliver(&app, &mut model, load_more, page(&["late"], None, false));
    assert_eq!(item_ids(&model), ["1"]);
    assert!(model
        .page_cache
        .get(&format!("key-{}", load_more.generation))
        .is_none());
    assert!(model.events_screen.as_ref().unwrap().coordinator.pagination().is_refreshing);

    deliver(&app, &mut model, refresh, page(&["fresh"], None, false));
    assert_eq!(item_ids(&model), ["fresh"]);
}

#[test]
fn failed_refetch_keeps_committed_filters_and_reports() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1"], None, false));

    app.update(Event::FilterModalOpened { kind: FilterModalKind::Distance }, &mut model);
    app.update(Event::DistanceConfirmed { km: 20 }, &mut model);
    let stamp = in_flight(&model);

    app.update(
        Event::EventsFetched {
            stamp,
            cache_key: "k".into(),
            result: Err(shared::AppError::new(shared::ErrorKind::Network, "offline")),
        },
        &mut model,
    );

    let screen = model.events_screen.as_ref().unwrap();
    assert_eq!(screen.coordinator.filters().distance_radius, 80);
    assert!(!screen.coordinator.pagination().is_refreshing);
    assert_eq!(item_ids(&model), ["1"]);
    assert!(model.notices.current().is_some());
}

#[test]
fn filter_override_is_merged_and_committed() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1"], None, false));

    // Confirming a closed modal does nothing.
    let update = app.update(Event::DistanceConfirmed { km: 20 }, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());

    app.update(Event::SearchChanged { text: "rust".into() }, &mut model);
    answer(&app, &mut model, page(&["2"], None, false));

    app.update(Event::FilterModalOpened { kind: FilterModalKind::Date }, &mut model);
    let update = app.update(Event::DateConfirmed { days: Some(30) }, &mut model);
    let bodies = graphql_bodies(&update.effects);
    assert_eq!(bodies[0]["variables"]["days"], 30);
    assert_eq!(bodies[0]["variables"]["search"], "rust");
    assert_eq!(bodies[0]["variables"]["coordinates"], serde_json::json!([LNG, LAT]));

    answer(&app, &mut model, page(&["3"], None, false));
    let ScreenView::Events(view) = app.view(&model).screen else {
        panic!("expected the events screen");
    };
    assert_eq!(view.date_window_days, Some(30));
    assert_eq!(view.distance_km, 80);
    assert!(!view.date_modal_open);
}

#[test]
fn load_more_is_served_from_the_page_cache() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1"], Some("c1"), true));

    app.update(Event::LoadMoreRequested, &mut model);
    let stamp = in_flight(&model);
    let key = EventsVariables {
        count: 10,
        cursor: Some("c1".into()),
        search: String::new(),
        coordinates: [LNG, LAT],
        distance: 80,
        days: Some(7),
    }
    .cache_key();
    app.update(
        Event::EventsFetched {
            stamp,
            cache_key: key,
            result: Ok(page(&["2"], None, false)),
        },
        &mut model,
    );

    app.update(Event::RefreshRequested, &mut model);
    answer(&app, &mut model, page(&["1"], Some("c1"), true));

    let update = app.update(Event::LoadMoreRequested, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());
    assert_eq!(item_ids(&model), ["1", "2"]);
    assert!(model.events_screen.as_ref().unwrap().coordinator.in_flight().is_none());
}

#[test]
fn distance_confirm_carries_the_new_radius_and_closes_the_modal() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1"], None, false));

    app.update(Event::FilterModalOpened { kind: FilterModalKind::Distance }, &mut model);
    assert_matches!(app.view(&model).screen, ScreenView::Events(view) if view.distance_modal_open);

    let update = app.update(Event::DistanceConfirmed { km: 50 }, &mut model);
    let bodies = graphql_bodies(&update.effects);
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["variables"]["distance"], 50);
    assert_matches!(app.view(&model).screen, ScreenView::Events(view) if !view.distance_modal_open);
}

#[test]
fn search_override_commits_only_the_search() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1"], None, false));
    let before = model.events_screen.as_ref().unwrap().coordinator.filters().clone();

    app.update(Event::SearchChanged { text: "conf".into() }, &mut model);
    answer(&app, &mut model, page(&["2"], None, false));

    let after = model.events_screen.as_ref().unwrap().coordinator.filters().clone();
    assert_eq!(after.search, "conf");
    assert_eq!(after.coordinates, before.coordinates);
    assert_eq!(after.has_coordinates, before.has_coordinates);
    assert_eq!(after.distance_radius, before.distance_radius);
    assert_eq!(after.date_window_days, before.date_window_days);
}

#[test]
fn distance_confirmed_before_location_shapes_the_first_page() {
    let (app, mut model, _) = start(Platform::Ios);

    app.update(Event::FilterModalOpened { kind: FilterModalKind::Distance }, &mut model);
    let update = app.update(Event::DistanceConfirmed { km: 50 }, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());
    assert_matches!(
        app.view(&model).screen,
        ScreenView::Events(view) if !view.distance_modal_open && view.distance_km == 50
    );

    let body = located(&app, &mut model);
    assert_eq!(body["variables"]["distance"], 50);
    assert_eq!(body["variables"]["coordinates"], serde_json::json!([LNG, LAT]));

    answer(&app, &mut model, page(&["1"], None, false));
    let screen = model.events_screen.as_ref().unwrap();
    assert_eq!(screen.coordinator.filters().distance_radius, 50);
    assert!(screen.pending.is_empty());
}

#[test]
fn search_typed_before_location_is_kept() {
    let (app, mut model, _) = start(Platform::Ios);

    app.update(Event::SearchToggled, &mut model);
    let update = app.update(Event::SearchChanged { text: "meetup".into() }, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());
    app.update(Event::FilterModalOpened { kind: FilterModalKind::Date }, &mut model);
    app.update(Event::DateConfirmed { days: Some(30) }, &mut model);

    let body = located(&app, &mut model);
    assert_eq!(body["variables"]["search"], "meetup");
    assert_eq!(body["variables"]["days"], 30);
    assert_eq!(body["variables"]["distance"], 80);
}

#[test]
fn opening_search_starts_from_an_empty_term() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["1"], None, false));

    app.update(Event::SearchToggled, &mut model);
    app.update(Event::SearchChanged { text: "rust".into() }, &mut model);
    answer(&app, &mut model, page(&["2"], None, false));
    app.update(Event::SearchToggled, &mut model);

    let update = app.update(Event::SearchToggled, &mut model);
    let bodies = graphql_bodies(&update.effects);
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["variables"]["search"], "");
    assert_matches!(
        app.view(&model).screen,
        ScreenView::Events(view) if view.search_visible && view.search_text.is_empty()
    );

    // Reopening with no committed term sends nothing.
    answer(&app, &mut model, page(&["1"], None, false));
    app.update(Event::SearchToggled, &mut model);
    let update = app.update(Event::SearchToggled, &mut model);
    assert!(graphql_bodies(&update.effects).is_empty());
}

#[test]
fn late_page_after_logout_does_not_reach_the_next_session() {
    let (app, mut model, _) = start(Platform::Ios);
    located(&app, &mut model);
    answer(&app, &mut model, page(&["a1"], Some("c1"), true));

    app.update(Event::LoadMoreRequested, &mut model);
    let stamp = in_flight(&model);
    let key = EventsVariables {
        count: 10,
        cursor: Some("c1".into()),
        search: String::new(),
        coordinates: [LNG, LAT],
        distance: 80,
        days: Some(7),
    }
    .cache_key();

    app.update(Event::LogoutRequested, &mut model);
    app.update(
        Event::EventsFetched {
            stamp,
            cache_key: key,
            result: Ok(page(&["a2"], None, false)),
        },
        &mut model,
    );
    assert!(model.page_cache.is_empty());

    app.update(
        Event::AuthCompleted {
            flow: AuthFlow::Login,
            result: Ok(MutationPayload {
                token: Some("other-token".into()),
                error: None,
            }),
        },
        &mut model,
    );
    located(&app, &mut model);
    answer(&app, &mut model, page(&["b1"], Some("c1"), true));

    let update = app.update(Event::LoadMoreRequested, &mut model);
    let bodies = graphql_bodies(&update.effects);
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["variables"]["cursor"], "c1");
    assert_eq!(item_ids(&model), ["b1"]);
}
