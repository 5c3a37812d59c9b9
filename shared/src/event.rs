use serde::{Deserialize, Serialize};

use crate::capabilities::{GeolocationResult, PermissionStatus};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::event_form::{EventField, EventMutationKind};
use crate::fetch::{EventsPage, FetchStamp};
use crate::filters::FilterModalKind;
use crate::focus::ScheduleField;
use crate::geocoding::{GeocodeResponse, PickerField};
use crate::graphql::{EventDetailNode, MutationPayload};
use crate::model::EventId;
use crate::session::{AuthFlow, LoginField, RegisterField};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle & session
    AppStarted {
        #[serde(default)]
        config: Option<AppConfig>,
    },
    LogoutRequested,
    #[serde(skip)]
    SessionTokenLoaded { token: Option<Vec<u8>> },
    #[serde(skip)]
    SessionTokenStored { ok: bool },
    #[serde(skip)]
    SessionTokenCleared { ok: bool },

    // Navigation
    OpenLogin,
    OpenRegister,
    NavigateBack,
    OpenEventAdd,
    OpenEventDetail { id: EventId },

    // Auth forms
    LoginFieldChanged { field: LoginField, value: String },
    LoginSubmitted,
    RegisterFieldChanged { field: RegisterField, value: String },
    RegisterSubmitted,
    #[serde(skip)]
    AuthCompleted {
        flow: AuthFlow,
        result: Result<MutationPayload, AppError>,
    },

    // Keyboard / focus
    FieldFocused { field: ScheduleField },
    KeyboardShown,
    KeyboardHidden,

    // Location
    #[serde(skip)]
    LocationPermissionChecked { mount_id: u64, status: PermissionStatus },
    #[serde(skip)]
    LocationPermissionAnswered { mount_id: u64, status: PermissionStatus },
    #[serde(skip)]
    PositionReceived {
        mount_id: u64,
        result: GeolocationResult,
    },

    // Event list
    SearchToggled,
    SearchChanged { text: String },
    RefreshRequested,
    EndReached { last_visible_index: usize },
    LoadMoreRequested,
    #[serde(skip)]
    EventsFetched {
        stamp: FetchStamp,
        cache_key: String,
        result: Result<EventsPage, AppError>,
    },

    // Filter modals
    FilterModalOpened { kind: FilterModalKind },
    DistanceConfirmed { km: u32 },
    DateConfirmed { days: Option<u32> },
    FilterModalDismissed { kind: FilterModalKind },

    // Event detail / form
    #[serde(skip)]
    EventDetailFetched {
        id: EventId,
        result: Result<EventDetailNode, AppError>,
    },
    EventFieldChanged { field: EventField, value: String },
    DatePickerOpened,
    DatePickerDismissed,
    EventDatePicked { date: String },
    ParticipantLimitIncreased,
    ParticipantLimitDecreased,
    EditModeRequested,
    EventSubmitted,
    AttendRequested,
    CantGoRequested,
    #[serde(skip)]
    EventMutationCompleted {
        kind: EventMutationKind,
        result: Result<MutationPayload, AppError>,
    },

    // Location picker
    LocationPickerOpened,
    LocationPickerClosed,
    PickerFieldChanged { field: PickerField, value: String },
    LocationSearchRequested,
    #[serde(skip)]
    GeocodeCompleted {
        result: Result<GeocodeResponse, AppError>,
    },

    // Schedule modal
    ScheduleModalOpened,
    ScheduleModalClosed,
    ScheduleFieldChanged { field: ScheduleField, value: String },
    ScheduleItemConfirmed,

    // Notices
    NoticeDismissed { id: u64 },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted { .. } => "app_started",
            Self::LogoutRequested => "logout_requested",
            Self::SessionTokenLoaded { .. } => "session_token_loaded",
            Self::SessionTokenStored { .. } => "session_token_stored",
            Self::SessionTokenCleared { .. } => "session_token_cleared",
            Self::OpenLogin => "open_login",
            Self::OpenRegister => "open_register",
            Self::NavigateBack => "navigate_back",
            Self::OpenEventAdd => "open_event_add",
            Self::OpenEventDetail { .. } => "open_event_detail",
            Self::LoginFieldChanged { .. } => "login_field_changed",
            Self::LoginSubmitted => "login_submitted",
            Self::RegisterFieldChanged { .. } => "register_field_changed",
            Self::RegisterSubmitted => "register_submitted",
            Self::AuthCompleted { .. } => "auth_completed",
            Self::FieldFocused { .. } => "field_focused",
            Self::KeyboardShown => "keyboard_shown",
            Self::KeyboardHidden => "keyboard_hidden",
            Self::LocationPermissionChecked { .. } => "location_permission_checked",
            Self::LocationPermissionAnswered { .. } => "location_permission_answered",
            Self::PositionReceived { .. } => "position_received",
            Self::SearchToggled => "search_toggled",
            Self::SearchChanged { .. } => "search_changed",
            Self::RefreshRequested => "refresh_requested",
            Self::EndReached { .. } => "end_reached",
            Self::LoadMoreRequested => "load_more_requested",
            Self::EventsFetched { .. } => "events_fetched",
            Self::FilterModalOpened { .. } => "filter_modal_opened",
            Self::DistanceConfirmed { .. } => "distance_confirmed",
            Self::DateConfirmed { .. } => "date_confirmed",
            Self::FilterModalDismissed { .. } => "filter_modal_dismissed",
            Self::EventDetailFetched { .. } => "event_detail_fetched",
            Self::EventFieldChanged { .. } => "event_field_changed",
            Self::DatePickerOpened => "date_picker_opened",
            Self::DatePickerDismissed => "date_picker_dismissed",
            Self::EventDatePicked { .. } => "event_date_picked",
            Self::ParticipantLimitIncreased => "participant_limit_increased",
            Self::ParticipantLimitDecreased => "participant_limit_decreased",
            Self::EditModeRequested => "edit_mode_requested",
            Self::EventSubmitted => "event_submitted",
            Self::AttendRequested => "attend_requested",
            Self::CantGoRequested => "cant_go_requested",
            Self::EventMutationCompleted { .. } => "event_mutation_completed",
            Self::LocationPickerOpened => "location_picker_opened",
            Self::LocationPickerClosed => "location_picker_closed",
            Self::PickerFieldChanged { .. } => "picker_field_changed",
            Self::LocationSearchRequested => "location_search_requested",
            Self::GeocodeCompleted { .. } => "geocode_completed",
            Self::ScheduleModalOpened => "schedule_modal_opened",
            Self::ScheduleModalClosed => "schedule_modal_closed",
            Self::ScheduleFieldChanged { .. } => "schedule_field_changed",
            Self::ScheduleItemConfirmed => "schedule_item_confirmed",
            Self::NoticeDismissed { .. } => "notice_dismissed",
        }
    }

    /// Capability completions are not user actions; everything the shell
    /// forwards from a gesture or keystroke is.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::AppStarted { .. }
                | Self::SessionTokenLoaded { .. }
                | Self::SessionTokenStored { .. }
                | Self::SessionTokenCleared { .. }
                | Self::AuthCompleted { .. }
                | Self::KeyboardShown
                | Self::KeyboardHidden
                | Self::LocationPermissionChecked { .. }
                | Self::LocationPermissionAnswered { .. }
                | Self::PositionReceived { .. }
                | Self::EventsFetched { .. }
                | Self::EventDetailFetched { .. }
                | Self::EventMutationCompleted { .. }
                | Self::GeocodeCompleted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_are_not_user_initiated() {
        assert!(!Event::SessionTokenLoaded { token: None }.is_user_initiated());
        assert!(!Event::KeyboardShown.is_user_initiated());
        assert!(Event::RefreshRequested.is_user_initiated());
        assert!(Event::DistanceConfirmed { km: 50 }.is_user_initiated());
    }

    #[test]
    fn shell_events_deserialize_from_json() {
        let event: Event =
            serde_json::from_str(r#"{"EndReached":{"last_visible_index":8}}"#).unwrap();
        assert_eq!(event, Event::EndReached { last_visible_index: 8 });
        assert_eq!(event.name(), "end_reached");
    }

    #[test]
    fn app_started_config_is_optional() {
        let event: Event = serde_json::from_str(r#"{"AppStarted":{}}"#).unwrap();
        assert_eq!(event, Event::AppStarted { config: None });
    }
}
