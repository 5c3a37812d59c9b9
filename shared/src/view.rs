use serde::{Deserialize, Serialize};

use crate::event_form::{EventForm, EventMutationKind, FormMode, ScheduleItem};
use crate::filters::FilterModalKind;
use crate::focus::{FieldVisibility, FocusState};
use crate::list::{self, EventListView};
use crate::model::{EventsScreen, LocationPermission, Model};
use crate::navigation::{Navigate, Route};
use crate::notice::Notice;
use crate::session::{LoginForm, RegisterForm};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ViewModel {
    pub screen: ScreenView,
    pub notice: Option<Notice>,
    pub can_go_back: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ScreenView {
    Launch,
    Auth,
    Login(LoginView),
    Register(RegisterView),
    Events(EventsView),
    EventForm(EventFormView),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LoginView {
    pub email: String,
    pub is_submitting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegisterView {
    pub name: String,
    pub email: String,
    pub is_submitting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventsView {
    pub list: EventListView,
    pub search_visible: bool,
    pub search_text: String,
    pub distance_km: u32,
    pub date_window_days: Option<u32>,
    pub distance_modal_open: bool,
    pub date_modal_open: bool,
    pub location_denied: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScheduleModalView {
    pub time: String,
    pub title: String,
    pub talker: String,
    pub visibility: FieldVisibility,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LocationPickerView {
    pub zip_code: String,
    pub number: String,
    pub is_loading: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AttendActionView {
    pub kind: EventMutationKind,
    pub prompt: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventFormView {
    pub mode: FormMode,
    pub is_loading: bool,
    pub is_submitting: bool,
    pub title: String,
    pub description: String,
    pub date_label: String,
    pub location_label: Option<String>,
    pub participant_limit: u32,
    pub participant_label: String,
    pub can_edit_fields: bool,
    pub can_adjust_limit: bool,
    pub can_request_edit: bool,
    pub schedule_button_label: Option<String>,
    pub schedule: Vec<ScheduleItem>,
    pub attendee_names: Vec<String>,
    pub attend_action: Option<AttendActionView>,
    pub date_picker_open: bool,
    pub schedule_modal: Option<ScheduleModalView>,
    pub location_picker: Option<LocationPickerView>,
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    let screen = match model.navigator.current() {
        Route::Launch => ScreenView::Launch,
        Route::Auth => ScreenView::Auth,
        Route::Login => ScreenView::Login(login_view(&model.login)),
        Route::Register => ScreenView::Register(register_view(&model.register)),
        Route::Events => model
            .events_screen
            .as_ref()
            .map_or(ScreenView::Launch, |screen| {
                ScreenView::Events(events_view(screen, model.location_permission))
            }),
        Route::EventAdd | Route::EventDetails { .. } => model
            .event_form
            .as_ref()
            .map_or(ScreenView::Launch, |form| {
                ScreenView::EventForm(event_form_view(form, &model.focus))
            }),
    };

    ViewModel {
        screen,
        notice: model.notices.current().cloned(),
        can_go_back: model.navigator.can_go_back(),
    }
}

fn login_view(form: &LoginForm) -> LoginView {
    LoginView {
        email: form.email.clone(),
        is_submitting: form.is_submitting,
    }
}

fn register_view(form: &RegisterForm) -> RegisterView {
    RegisterView {
        name: form.name.clone(),
        email: form.email.clone(),
        is_submitting: form.is_submitting,
    }
}

fn events_view(screen: &EventsScreen, permission: LocationPermission) -> EventsView {
    let filters = screen.effective_filters();
    EventsView {
        list: list::present(&screen.coordinator),
        search_visible: screen.search_visible,
        search_text: screen.search_text.clone(),
        distance_km: filters.distance_radius,
        date_window_days: filters.date_window_days,
        distance_modal_open: screen.modals.is_open(FilterModalKind::Distance),
        date_modal_open: screen.modals.is_open(FilterModalKind::Date),
        location_denied: permission == LocationPermission::Denied,
    }
}

fn participant_label(limit: u32) -> String {
    if limit > 1 {
        format!("{limit} Participants")
    } else {
        format!("{limit} Participant")
    }
}

fn event_form_view(form: &EventForm, focus: &FocusState) -> EventFormView {
    let attend_action = form.attendance_action().map(|kind| AttendActionView {
        kind,
        prompt: match kind {
            EventMutationKind::CantGo => "Do you want to cancel your attend?",
            _ => "Will you attend this event?",
        }
        .to_string(),
    });

    let schedule_button_label = form.can_manage_schedule().then(|| {
        if form.mode == FormMode::Edit {
            "Edit".to_string()
        } else {
            "Add".to_string()
        }
    });

    EventFormView {
        mode: form.mode,
        is_loading: form.is_loading,
        is_submitting: form.is_submitting,
        title: form.title.clone(),
        description: form.description.clone(),
        date_label: form
            .date
            .as_deref()
            .and_then(list::format_event_date)
            .unwrap_or_else(|| "Choose a Date".to_string()),
        location_label: form.location_label().map(str::to_string),
        participant_limit: form.participant_limit,
        participant_label: participant_label(form.participant_limit),
        can_edit_fields: form.is_editable(),
        can_adjust_limit: form.can_adjust_limit(),
        can_request_edit: form.mode == FormMode::Detail && form.is_owner && !form.is_loading,
        schedule_button_label,
        schedule: form.schedule.clone(),
        attendee_names: form.attendees.iter().map(|a| a.name.clone()).collect(),
        attend_action,
        date_picker_open: form.date_picker_open,
        schedule_modal: form.schedule_draft.as_ref().map(|draft| ScheduleModalView {
            time: draft.time.clone(),
            title: draft.title.clone(),
            talker: draft.talker.clone(),
            visibility: focus.visibility(!draft.time.is_empty()),
        }),
        location_picker: form.picker.is_open.then(|| LocationPickerView {
            zip_code: form.picker.zip_code.clone(),
            number: form.picker.number.clone(),
            is_loading: form.picker.is_loading,
        }),
    }
}
