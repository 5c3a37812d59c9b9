use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::capabilities::Capabilities;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::event::Event;
use crate::event_form::{complete_mutation, EventForm, EventMutation, EventMutationKind};
use crate::fetch::{Completion, EventsPage, FetchPolicy, FetchRequest, FetchStamp};
use crate::geocoding::GeocodeResponse;
use crate::graphql::{
    self, EventDetailData, EventDetailVariables, EventsData, EventsVariables, InputVariables,
    MutationData, MutationKind, MutationPayload, PageCache, EVENTS_QUERY, EVENT_DETAIL_QUERY,
};
use crate::list::should_load_more;
use crate::location::{LocationOutcome, LocationStep};
use crate::model::{EventsScreen, FilterOverride, Model};
use crate::navigation::{Navigate, Route};
use crate::notice::Notify;
use crate::session::{self, AuthFlow};
use crate::view::{self, ViewModel};
use crate::SESSION_TOKEN_KEY;

#[derive(Default)]
pub struct App;

impl App {
    /// POSTs a GraphQL document to the configured endpoint, attaching the
    /// session token when there is one.
    fn send_graphql<T, V, F>(
        model: &Model,
        caps: &Capabilities,
        operation: &'static str,
        query: &'static str,
        variables: V,
        make_event: F,
    ) -> AppResult<()>
    where
        T: DeserializeOwned + Send + 'static,
        V: Serialize,
        F: FnOnce(Result<T, AppError>) -> Event + Send + 'static,
    {
        let body = graphql::encode_request(query, variables)?;

        let mut request = caps
            .http
            .post(&model.config.graphql_endpoint)
            .body_string(body)
            .header("Content-Type", "application/json");
        if let Some(token) = &model.session_token {
            request = request.header("Authorization", token.expose_secret().as_str());
        }

        tracing::debug!(operation, "graphql request");
        request
            .expect_json::<graphql::GraphqlResponse<T>>()
            .send(move |result| {
                let result = result
                    .map(|mut response| response.take_body())
                    .map_err(|e| e.to_string());
                make_event(
                    graphql::decode_response(operation, result)
                        .map_err(|e| AppError::from(e).with_context("operation", operation)),
                )
            });
        Ok(())
    }

    fn send_mutation<I, F>(
        model: &Model,
        caps: &Capabilities,
        kind: MutationKind,
        input: I,
        make_event: F,
    ) -> AppResult<()>
    where
        I: Serialize,
        F: FnOnce(Result<MutationPayload, AppError>) -> Event + Send + 'static,
    {
        Self::send_graphql::<MutationData, _, _>(
            model,
            caps,
            kind.field(),
            kind.document(),
            InputVariables { input },
            move |result| {
                make_event(
                    result.and_then(|data| graphql::take_payload(kind, data).map_err(AppError::from)),
                )
            },
        )
    }

    fn mount_events_screen(model: &mut Model, caps: &Capabilities) {
        let mount_id = model.allocate_mount_id();
        let mut screen = EventsScreen::new(mount_id, &model.config, model.location_permission);
        let step = screen.location.start();
        model.events_screen = Some(screen);

        tracing::debug!(mount_id, "events screen mounted");
        Self::dispatch_location_step(model, caps, step);
    }

    fn dispatch_location_step(model: &mut Model, caps: &Capabilities, step: Option<LocationStep>) {
        let Some(screen) = model.events_screen.as_mut() else {
            return;
        };
        let mount_id = screen.mount_id;
        model.location_permission = screen.location.permission();

        let request = match step {
            None => return,
            Some(LocationStep::CheckPermission(permission)) => {
                caps.permissions.check(permission, move |status| {
                    Event::LocationPermissionChecked { mount_id, status }
                });
                return;
            }
            Some(LocationStep::RequestPermission(permission, rationale)) => {
                caps.permissions.request(permission, rationale, move |status| {
                    Event::LocationPermissionAnswered { mount_id, status }
                });
                return;
            }
            Some(LocationStep::ReadPosition(options)) => {
                caps.geolocation.current_position(options, move |result| {
                    Event::PositionReceived { mount_id, result }
                });
                return;
            }
            Some(LocationStep::Finished(outcome)) => {
                match outcome {
                    LocationOutcome::Located(coordinates) => {
                        screen.coordinator.set_coordinates(coordinates);
                    }
                    LocationOutcome::PermissionDenied => {}
                    LocationOutcome::Unavailable(error) => {
                        model.notices.report(&AppError::from(error));
                    }
                }
                let pending = std::mem::take(&mut screen.pending);
                if !pending.is_empty() {
                    tracing::debug!(mount_id, "folding early filter changes into first page");
                }
                screen.coordinator.refetch(&pending)
            }
        };

        Self::issue_fetch(model, caps, request);
    }

    fn issue_fetch(model: &mut Model, caps: &Capabilities, request: Option<FetchRequest>) {
        let Some(request) = request else {
            return;
        };
        let stamp = request.stamp;
        let variables = EventsVariables::from(&request);
        let cache_key = variables.cache_key();

        if request.policy == FetchPolicy::StoreOrNetwork {
            if let Some(page) = model.page_cache.get(&cache_key) {
                tracing::debug!(generation = stamp.generation, "events page served from cache");
                Self::on_events_fetched(model, stamp, None, Ok(page));
                return;
            }
        }

        let sent = Self::send_graphql::<EventsData, _, _>(
            model,
            caps,
            "events",
            EVENTS_QUERY,
            variables,
            move |result| Event::EventsFetched {
                stamp,
                cache_key,
                result: result.map(EventsData::into_page),
            },
        );
        if let Err(error) = sent {
            Self::on_events_fetched(model, stamp, None, Err(error));
        }
    }

    fn on_events_fetched(
        model: &mut Model,
        stamp: FetchStamp,
        cache_key: Option<String>,
        result: Result<EventsPage, AppError>,
    ) {
        let Some(screen) = model.events_screen.as_mut() else {
            tracing::debug!(mount_id = stamp.mount_id, "events page for unmounted screen");
            return;
        };

        // Only pages the screen accepted may seed the cache.
        let fresh = match (cache_key, &result) {
            (Some(key), Ok(page)) => Some((key, page.clone())),
            _ => None,
        };
        let failure = result.as_ref().err().cloned();

        match screen.coordinator.complete(stamp, result) {
            Completion::Applied(_) => {
                if let Some((key, page)) = fresh {
                    model.page_cache.put(key, page);
                }
            }
            Completion::Failed(_) => {
                if let Some(error) = failure {
                    model.notices.report(&error);
                }
            }
            Completion::Stale => {}
        }
    }

    /// Until the location flow resolves, filter changes are held on the
    /// screen and go out with the mount's first page.
    fn refetch_events(model: &mut Model, caps: &Capabilities, patch: &FilterOverride) {
        let Some(screen) = model.events_screen.as_mut() else {
            return;
        };
        if !screen.location.is_resolved() {
            screen.pending.merge(patch);
            return;
        }
        let request = screen.coordinator.refetch(patch);
        Self::issue_fetch(model, caps, request);
    }

    fn send_event_mutation(model: &mut Model, caps: &Capabilities, mutation: EventMutation) {
        let kind = mutation.kind();
        let make_event = move |result| Event::EventMutationCompleted { kind, result };
        let mutation_kind = MutationKind::from(kind);

        let sent = match mutation {
            EventMutation::Add(input) | EventMutation::Edit(input) => {
                Self::send_mutation(model, caps, mutation_kind, input, make_event)
            }
            EventMutation::Attend(input) | EventMutation::CantGo(input) => {
                Self::send_mutation(model, caps, mutation_kind, input, make_event)
            }
        };

        if let Err(error) = sent {
            if let Some(form) = model.event_form.as_mut() {
                form.is_submitting = false;
            }
            model.notices.report(&error);
        }
    }

    fn request_attendance(model: &mut Model, caps: &Capabilities, kind: EventMutationKind) {
        let mutation = model
            .event_form
            .as_mut()
            .and_then(|form| form.toggle_attendance(kind));
        if let Some(mutation) = mutation {
            Self::send_event_mutation(model, caps, mutation);
        }
    }

    /// Signed-in screens stay closed without a session token.
    fn open_route(model: &mut Model, route: Route) -> bool {
        if route.requires_session() && !model.is_authenticated() {
            tracing::warn!(?route, "route needs a session");
            return false;
        }
        model.navigator.navigate(route);
        true
    }

    fn sign_out(model: &mut Model, caps: &Capabilities) {
        model.session_token = None;
        model.events_screen = None;
        model.event_form = None;
        model.login = session::LoginForm::default();
        model.register = session::RegisterForm::default();
        model.focus.clear();
        model.page_cache.clear();
        model.notices.clear();
        model.navigator.reset(Route::Auth);

        caps.key_value.delete(SESSION_TOKEN_KEY.to_string(), |result| {
            Event::SessionTokenCleared {
                ok: result.is_ok(),
            }
        });
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        tracing::debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        match event {
            Event::AppStarted { config } => {
                if let Some(config) = config {
                    match config.validate() {
                        Ok(()) => model.config = config,
                        Err(e) => {
                            tracing::error!(error = %e, "rejected shell configuration");
                            model.notices.report(&AppError::from(e));
                        }
                    }
                }
                model.page_cache = PageCache::new(model.config.cache_capacity);

                caps.key_value.get(SESSION_TOKEN_KEY.to_string(), |result| {
                    Event::SessionTokenLoaded {
                        token: result.ok().flatten(),
                    }
                });
                caps.render.render();
            }

            Event::SessionTokenLoaded { token } => {
                if model.session_restored {
                    return;
                }
                model.session_restored = true;
                model.session_token = session::decode_token(token);

                let has_token = model.session_token.is_some();
                tracing::info!(has_token, "session restored");
                model.navigator.reset(session::initial_route(has_token));
                if has_token {
                    Self::mount_events_screen(model, caps);
                }
                caps.render.render();
            }

            Event::SessionTokenStored { ok } => {
                if !ok {
                    tracing::warn!("failed to persist session token");
                    model
                        .notices
                        .report(&AppError::new(ErrorKind::Storage, "token write failed"));
                    caps.render.render();
                }
            }

            Event::SessionTokenCleared { ok } => {
                if !ok {
                    tracing::warn!("failed to delete session token");
                }
            }

            Event::LogoutRequested => {
                Self::sign_out(model, caps);
                tracing::info!("signed out");
                caps.render.render();
            }

            Event::OpenLogin => {
                if Self::open_route(model, Route::Login) {
                    caps.render.render();
                }
            }

            Event::OpenRegister => {
                if Self::open_route(model, Route::Register) {
                    caps.render.render();
                }
            }

            Event::NavigateBack => {
                if model.navigator.go_back() {
                    if !matches!(
                        model.navigator.current(),
                        Route::EventAdd | Route::EventDetails { .. }
                    ) {
                        model.event_form = None;
                        model.focus.clear();
                    }
                    caps.render.render();
                }
            }

            Event::OpenEventAdd => {
                if !Self::open_route(model, Route::EventAdd) {
                    return;
                }
                model.event_form = Some(EventForm::create());
                model.focus.clear();
                caps.render.render();
            }

            Event::OpenEventDetail { id } => {
                if !Self::open_route(model, Route::EventDetails { id: id.clone() }) {
                    return;
                }
                model.event_form = Some(EventForm::for_event(id.clone()));
                model.focus.clear();

                let event_id = id.clone();
                let sent = Self::send_graphql::<EventDetailData, _, _>(
                    model,
                    caps,
                    "event",
                    EVENT_DETAIL_QUERY,
                    EventDetailVariables { id },
                    move |result| Event::EventDetailFetched {
                        id: event_id,
                        result: result.and_then(|data| {
                            data.event.ok_or_else(|| {
                                AppError::new(ErrorKind::NotFound, "event not found")
                            })
                        }),
                    },
                );
                if let Err(error) = sent {
                    model.notices.report(&error);
                }
                caps.render.render();
            }

            Event::LoginFieldChanged { field, value } => {
                model.login.set(field, value);
                caps.render.render();
            }

            Event::LoginSubmitted => {
                match model.login.submit() {
                    Ok(input) => {
                        let sent = Self::send_mutation(
                            model,
                            caps,
                            MutationKind::LoginEmail,
                            input,
                            |result| Event::AuthCompleted {
                                flow: AuthFlow::Login,
                                result,
                            },
                        );
                        if let Err(error) = sent {
                            model.login.is_submitting = false;
                            model.notices.report(&error);
                        }
                    }
                    Err(e) => model.notices.report(&AppError::from(e)),
                }
                caps.render.render();
            }

            Event::RegisterFieldChanged { field, value } => {
                model.register.set(field, value);
                caps.render.render();
            }

            Event::RegisterSubmitted => {
                match model.register.submit() {
                    Ok(input) => {
                        let sent = Self::send_mutation(
                            model,
                            caps,
                            MutationKind::RegisterEmail,
                            input,
                            |result| Event::AuthCompleted {
                                flow: AuthFlow::Register,
                                result,
                            },
                        );
                        if let Err(error) = sent {
                            model.register.is_submitting = false;
                            model.notices.report(&error);
                        }
                    }
                    Err(e) => model.notices.report(&AppError::from(e)),
                }
                caps.render.render();
            }

            Event::AuthCompleted { flow, result } => {
                match flow {
                    AuthFlow::Login => model.login.is_submitting = false,
                    AuthFlow::Register => model.register.is_submitting = false,
                }

                let token =
                    session::complete_auth(flow, result, &mut model.navigator, &mut model.notices);
                if let Some(token) = token {
                    caps.key_value.set(
                        SESSION_TOKEN_KEY.to_string(),
                        token.expose_secret().as_bytes().to_vec(),
                        |result| Event::SessionTokenStored {
                            ok: result.is_ok(),
                        },
                    );
                    model.session_token = Some(token);
                    model.session_restored = true;
                    model.login = session::LoginForm::default();
                    model.register = session::RegisterForm::default();
                    tracing::info!(?flow, "signed in");
                    Self::mount_events_screen(model, caps);
                }
                caps.render.render();
            }

            Event::FieldFocused { field } => {
                model.focus.focus(field);
                caps.render.render();
            }

            Event::KeyboardShown => {
                model.focus.keyboard_shown();
                caps.render.render();
            }

            Event::KeyboardHidden => {
                model.focus.keyboard_hidden();
                caps.render.render();
            }

            Event::LocationPermissionChecked { mount_id, status } => {
                let step = model
                    .events_screen
                    .as_mut()
                    .filter(|s| s.mount_id == mount_id)
                    .and_then(|s| s.location.on_permission_checked(status));
                Self::dispatch_location_step(model, caps, step);
                caps.render.render();
            }

            Event::LocationPermissionAnswered { mount_id, status } => {
                let step = model
                    .events_screen
                    .as_mut()
                    .filter(|s| s.mount_id == mount_id)
                    .and_then(|s| s.location.on_permission_requested(status));
                Self::dispatch_location_step(model, caps, step);
                caps.render.render();
            }

            Event::PositionReceived { mount_id, result } => {
                let step = model
                    .events_screen
                    .as_mut()
                    .filter(|s| s.mount_id == mount_id)
                    .and_then(|s| s.location.on_position(result));
                Self::dispatch_location_step(model, caps, step);
                caps.render.render();
            }

            Event::SearchToggled => {
                let Some(screen) = model.events_screen.as_mut() else {
                    return;
                };
                screen.search_visible = !screen.search_visible;
                // A freshly opened bar starts empty and lists without a search term.
                if screen.search_visible {
                    screen.search_text.clear();
                    if !screen.effective_filters().search.is_empty() {
                        Self::refetch_events(model, caps, &FilterOverride::search(""));
                    }
                }
                caps.render.render();
            }

            Event::SearchChanged { text } => {
                if let Some(screen) = model.events_screen.as_mut() {
                    screen.search_text.clone_from(&text);
                }
                Self::refetch_events(model, caps, &FilterOverride::search(text));
                caps.render.render();
            }

            Event::RefreshRequested => {
                Self::refetch_events(model, caps, &FilterOverride::default());
                caps.render.render();
            }

            Event::EndReached { last_visible_index } => {
                let threshold = model.config.end_reached_threshold;
                let request = model.events_screen.as_mut().and_then(|screen| {
                    let len = screen.coordinator.items().len();
                    should_load_more(last_visible_index, len, threshold)
                        .then(|| screen.coordinator.load_more())
                        .flatten()
                });
                if request.is_some() {
                    Self::issue_fetch(model, caps, request);
                    caps.render.render();
                }
            }

            Event::LoadMoreRequested => {
                let request = model
                    .events_screen
                    .as_mut()
                    .and_then(|screen| screen.coordinator.load_more());
                if request.is_some() {
                    Self::issue_fetch(model, caps, request);
                    caps.render.render();
                }
            }

            Event::EventsFetched {
                stamp,
                cache_key,
                result,
            } => {
                Self::on_events_fetched(model, stamp, Some(cache_key), result);
                caps.render.render();
            }

            Event::FilterModalOpened { kind } => {
                if let Some(screen) = model.events_screen.as_mut() {
                    screen.modals.open(kind);
                    caps.render.render();
                }
            }

            Event::DistanceConfirmed { km } => {
                let patch = model
                    .events_screen
                    .as_mut()
                    .and_then(|screen| screen.modals.confirm_distance(km));
                if let Some(patch) = patch {
                    Self::refetch_events(model, caps, &patch);
                }
                caps.render.render();
            }

            Event::DateConfirmed { days } => {
                let patch = model
                    .events_screen
                    .as_mut()
                    .and_then(|screen| screen.modals.confirm_date(days));
                if let Some(patch) = patch {
                    Self::refetch_events(model, caps, &patch);
                }
                caps.render.render();
            }

            Event::FilterModalDismissed { kind } => {
                if let Some(screen) = model.events_screen.as_mut() {
                    screen.modals.dismiss(kind);
                    caps.render.render();
                }
            }

            Event::EventDetailFetched { id, result } => {
                let Some(form) = model
                    .event_form
                    .as_mut()
                    .filter(|f| f.is_loading && f.id.as_ref() == Some(&id))
                else {
                    tracing::debug!(%id, "event detail for a closed screen");
                    return;
                };

                match result {
                    Ok(node) => form.apply_detail(node),
                    Err(error) => {
                        tracing::warn!(%id, code = error.code(), "event detail failed");
                        model.notices.report(&error);
                        model.event_form = None;
                        model.navigator.navigate(Route::Events);
                    }
                }
                caps.render.render();
            }

            Event::EventFieldChanged { field, value } => {
                if let Some(form) = model.event_form.as_mut() {
                    if form.set_field(field, value) {
                        caps.render.render();
                    }
                }
            }

            Event::DatePickerOpened => {
                if let Some(form) = model.event_form.as_mut() {
                    form.open_date_picker();
                    caps.render.render();
                }
            }

            Event::DatePickerDismissed => {
                if let Some(form) = model.event_form.as_mut() {
                    form.dismiss_date_picker();
                    caps.render.render();
                }
            }

            Event::EventDatePicked { date } => {
                if let Some(form) = model.event_form.as_mut() {
                    form.pick_date(date);
                    caps.render.render();
                }
            }

            Event::ParticipantLimitIncreased => {
                if let Some(form) = model.event_form.as_mut() {
                    form.increase_limit();
                    caps.render.render();
                }
            }

            Event::ParticipantLimitDecreased => {
                if let Some(form) = model.event_form.as_mut() {
                    form.decrease_limit();
                    caps.render.render();
                }
            }

            Event::EditModeRequested => {
                if let Some(form) = model.event_form.as_mut() {
                    if form.request_edit() {
                        caps.render.render();
                    }
                }
            }

            Event::EventSubmitted => {
                let Some(form) = model.event_form.as_mut() else {
                    return;
                };
                match form.submit() {
                    Ok(mutation) => Self::send_event_mutation(model, caps, mutation),
                    Err(e) => model.notices.report(&AppError::from(e)),
                }
                caps.render.render();
            }

            Event::AttendRequested => {
                Self::request_attendance(model, caps, EventMutationKind::Attend);
                caps.render.render();
            }

            Event::CantGoRequested => {
                Self::request_attendance(model, caps, EventMutationKind::CantGo);
                caps.render.render();
            }

            Event::EventMutationCompleted { kind, result } => {
                let Some(form) = model.event_form.as_mut() else {
                    return;
                };
                let succeeded = complete_mutation(
                    form,
                    kind,
                    result,
                    &mut model.navigator,
                    &mut model.notices,
                );
                if succeeded {
                    tracing::info!(?kind, "event mutation applied");
                    model.event_form = None;
                    model.focus.clear();
                    model.page_cache.clear();
                    Self::refetch_events(model, caps, &FilterOverride::default());
                }
                caps.render.render();
            }

            Event::LocationPickerOpened => {
                if let Some(form) = model.event_form.as_mut().filter(|f| f.is_editable()) {
                    form.picker.open();
                    caps.render.render();
                }
            }

            Event::LocationPickerClosed => {
                if let Some(form) = model.event_form.as_mut() {
                    form.picker.close();
                    caps.render.render();
                }
            }

            Event::PickerFieldChanged { field, value } => {
                if let Some(form) = model.event_form.as_mut() {
                    form.picker.set(field, value);
                    caps.render.render();
                }
            }

            Event::LocationSearchRequested => {
                let Some(form) = model.event_form.as_mut() else {
                    return;
                };
                match form.picker.begin_search(&model.config.geocoding_endpoint) {
                    None => return,
                    Some(Ok(url)) => {
                        tracing::debug!(%url, "geocode lookup");
                        caps.http
                            .get(url.as_str())
                            .expect_json::<GeocodeResponse>()
                            .send(|result| Event::GeocodeCompleted {
                                result: result
                                    .map(|mut response| response.take_body().unwrap_or_default())
                                    .map_err(|e| {
                                        AppError::new(ErrorKind::Network, "geocode lookup failed")
                                            .with_internal(e.to_string())
                                    }),
                            });
                    }
                    Some(Err(e)) => model.notices.report(&AppError::from(e)),
                }
                caps.render.render();
            }

            Event::GeocodeCompleted { result } => {
                let Some(form) = model.event_form.as_mut() else {
                    return;
                };
                match form.picker.finish(result) {
                    Ok(location) => form.set_location(location),
                    Err(error) => model.notices.report(&error),
                }
                caps.render.render();
            }

            Event::ScheduleModalOpened => {
                if let Some(form) = model.event_form.as_mut() {
                    form.open_schedule();
                    model.focus.clear();
                    caps.render.render();
                }
            }

            Event::ScheduleModalClosed => {
                if let Some(form) = model.event_form.as_mut() {
                    form.close_schedule();
                    model.focus.clear();
                    caps.render.render();
                }
            }

            Event::ScheduleFieldChanged { field, value } => {
                if let Some(form) = model.event_form.as_mut() {
                    form.set_schedule_field(field, value);
                    caps.render.render();
                }
            }

            Event::ScheduleItemConfirmed => {
                let Some(form) = model.event_form.as_mut() else {
                    return;
                };
                match form.confirm_schedule() {
                    Ok(()) => model.focus.clear(),
                    Err(e) => model.notices.report(&AppError::from(e)),
                }
                caps.render.render();
            }

            Event::NoticeDismissed { id } => {
                if model.notices.dismiss(id) {
                    caps.render.render();
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}
