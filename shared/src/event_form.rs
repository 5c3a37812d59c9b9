//! Event detail screen: viewing, creating and editing an event, plus the
//! attend / can't-go actions.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};
use crate::focus::ScheduleField;
use crate::geocoding::{LocationPicker, ResolvedLocation};
use crate::graphql::{
    AttendanceInput, EventDetailNode, EventInput, EventLocationInput, MutationKind,
    MutationPayload,
};
use crate::model::{Attendee, EventId};
use crate::navigation::{Navigate, Route};
use crate::notice::Notify;
use crate::session::FormError;
use crate::{MIN_PARTICIPANT_LIMIT, UNEXPECTED_ERROR_MESSAGE};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub talker: String,
}

impl ScheduleItem {
    pub fn set(&mut self, field: ScheduleField, value: String) {
        match field {
            ScheduleField::Time => self.time = value,
            ScheduleField::Title => self.title = value,
            ScheduleField::Talker => self.talker = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormMode {
    Detail,
    Edit,
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventField {
    Title,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventMutationKind {
    Add,
    Edit,
    Attend,
    CantGo,
}

impl From<EventMutationKind> for MutationKind {
    fn from(kind: EventMutationKind) -> Self {
        match kind {
            EventMutationKind::Add => Self::EventAdd,
            EventMutationKind::Edit => Self::EventEdit,
            EventMutationKind::Attend => Self::AttendToEvent,
            EventMutationKind::CantGo => Self::CantGoToEvent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventMutation {
    Add(EventInput),
    Edit(EventInput),
    Attend(AttendanceInput),
    CantGo(AttendanceInput),
}

impl EventMutation {
    #[must_use]
    pub const fn kind(&self) -> EventMutationKind {
        match self {
            Self::Add(_) => EventMutationKind::Add,
            Self::Edit(_) => EventMutationKind::Edit,
            Self::Attend(_) => EventMutationKind::Attend,
            Self::CantGo(_) => EventMutationKind::CantGo,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    pub id: Option<EventId>,
    pub mode: FormMode,
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    /// Street as last reported by the server.
    pub street: Option<String>,
    /// Location picked in this session; replaces `street` on save.
    pub location: Option<ResolvedLocation>,
    pub participant_limit: u32,
    pub schedule: Vec<ScheduleItem>,
    pub attendees: Vec<Attendee>,
    pub is_owner: bool,
    pub is_attending: bool,
    pub is_loading: bool,
    pub is_submitting: bool,
    pub date_picker_open: bool,
    pub schedule_draft: Option<ScheduleItem>,
    pub picker: LocationPicker,
}

impl EventForm {
    fn blank(id: Option<EventId>, mode: FormMode) -> Self {
        Self {
            id,
            mode,
            title: String::new(),
            description: String::new(),
            date: None,
            street: None,
            location: None,
            participant_limit: MIN_PARTICIPANT_LIMIT,
            schedule: Vec::new(),
            attendees: Vec::new(),
            is_owner: false,
            is_attending: false,
            is_loading: false,
            is_submitting: false,
            date_picker_open: false,
            schedule_draft: None,
            picker: LocationPicker::default(),
        }
    }

    #[must_use]
    pub fn create() -> Self {
        Self::blank(None, FormMode::Create)
    }

    /// Detail screen for an existing event, waiting on its query.
    #[must_use]
    pub fn for_event(id: EventId) -> Self {
        Self {
            is_loading: true,
            ..Self::blank(Some(id), FormMode::Detail)
        }
    }

    pub fn apply_detail(&mut self, node: EventDetailNode) {
        self.title = node.title;
        self.description = node.description;
        self.date = node.date;
        self.street = node.location.and_then(|l| l.street);
        self.participant_limit = node
            .public_limit
            .unwrap_or(MIN_PARTICIPANT_LIMIT)
            .max(MIN_PARTICIPANT_LIMIT);
        self.schedule = node.schedule;
        self.attendees = node.public_list;
        self.is_owner = node.is_owner;
        self.is_attending = node.is_event_attended;
        self.is_loading = false;
    }

    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self.mode, FormMode::Edit | FormMode::Create)
    }

    #[must_use]
    pub const fn can_adjust_limit(&self) -> bool {
        self.is_editable() && !self.is_submitting
    }

    #[must_use]
    pub const fn can_manage_schedule(&self) -> bool {
        self.is_owner || matches!(self.mode, FormMode::Create)
    }

    /// Attend / can't-go is offered to non-owners viewing a loaded event.
    #[must_use]
    pub const fn attendance_action(&self) -> Option<EventMutationKind> {
        if self.is_owner || self.is_loading || !matches!(self.mode, FormMode::Detail) {
            return None;
        }
        Some(if self.is_attending {
            EventMutationKind::CantGo
        } else {
            EventMutationKind::Attend
        })
    }

    #[must_use]
    pub fn location_label(&self) -> Option<&str> {
        self.location
            .as_ref()
            .map(|l| l.address.as_str())
            .or(self.street.as_deref())
    }

    pub fn set_field(&mut self, field: EventField, value: String) -> bool {
        if !self.is_editable() {
            return false;
        }
        match field {
            EventField::Title => self.title = value,
            EventField::Description => self.description = value,
        }
        true
    }

    pub fn open_date_picker(&mut self) {
        self.date_picker_open = self.is_editable();
    }

    pub fn dismiss_date_picker(&mut self) {
        self.date_picker_open = false;
    }

    pub fn pick_date(&mut self, date: String) {
        if self.is_editable() {
            self.date = Some(date);
        }
        self.date_picker_open = false;
    }

    pub fn increase_limit(&mut self) {
        if self.can_adjust_limit() {
            self.participant_limit = self.participant_limit.saturating_add(1);
        }
    }

    pub fn decrease_limit(&mut self) {
        if self.can_adjust_limit() && self.participant_limit > MIN_PARTICIPANT_LIMIT {
            self.participant_limit -= 1;
        }
    }

    pub fn request_edit(&mut self) -> bool {
        if self.mode == FormMode::Detail && self.is_owner && !self.is_loading {
            self.mode = FormMode::Edit;
            true
        } else {
            false
        }
    }

    pub fn set_location(&mut self, location: ResolvedLocation) {
        if self.is_editable() {
            self.location = Some(location);
        }
    }

    pub fn open_schedule(&mut self) {
        if self.can_manage_schedule() {
            self.schedule_draft = Some(ScheduleItem::default());
        }
    }

    pub fn close_schedule(&mut self) {
        self.schedule_draft = None;
    }

    pub fn set_schedule_field(&mut self, field: ScheduleField, value: String) {
        if let Some(draft) = &mut self.schedule_draft {
            draft.set(field, value);
        }
    }

    pub fn confirm_schedule(&mut self) -> Result<(), FormError> {
        let Some(draft) = self.schedule_draft.as_ref() else {
            return Err(FormError::NotEditable);
        };
        if draft.title.trim().is_empty() {
            return Err(FormError::MissingFields);
        }
        if let Some(item) = self.schedule_draft.take() {
            self.schedule.push(item);
        }
        Ok(())
    }

    pub fn submit(&mut self) -> Result<EventMutation, FormError> {
        if self.is_submitting {
            return Err(FormError::AlreadySubmitting);
        }
        if !self.is_editable() {
            return Err(FormError::NotEditable);
        }
        if self.title.trim().is_empty() {
            return Err(FormError::MissingTitle);
        }

        let input = EventInput {
            id: self.id.clone(),
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            date: self.date.clone(),
            location: self.location.as_ref().map(|l| EventLocationInput {
                coordinates: l.coordinates.as_lng_lat(),
                street: l.address.clone(),
                cep: l.zip_code.clone(),
                number: l.number.clone(),
            }),
            public_limit: self.participant_limit,
            schedule: self.schedule.clone(),
        };
        self.is_submitting = true;

        Ok(match self.mode {
            FormMode::Create => EventMutation::Add(input),
            _ => EventMutation::Edit(input),
        })
    }

    /// Attend or can't-go, whichever is currently offered.
    pub fn toggle_attendance(&mut self, requested: EventMutationKind) -> Option<EventMutation> {
        if self.is_submitting || self.attendance_action() != Some(requested) {
            return None;
        }
        let input = AttendanceInput {
            event_id: self.id.clone()?,
        };
        self.is_submitting = true;
        match requested {
            EventMutationKind::Attend => Some(EventMutation::Attend(input)),
            EventMutationKind::CantGo => Some(EventMutation::CantGo(input)),
            EventMutationKind::Add | EventMutationKind::Edit => None,
        }
    }
}

/// Resolves a mutation response. A server `error` is shown verbatim and
/// the form stays editable; a failed request gets the generic message.
/// Returns true when the mutation went through and the app went back to
/// the events list.
pub fn complete_mutation(
    form: &mut EventForm,
    kind: EventMutationKind,
    result: Result<MutationPayload, AppError>,
    navigator: &mut impl Navigate,
    notify: &mut impl Notify,
) -> bool {
    form.is_submitting = false;

    match result {
        Ok(payload) => match payload.error.filter(|m| !m.is_empty()) {
            Some(message) => {
                tracing::info!(?kind, "mutation rejected by server");
                notify.report(&AppError::new(ErrorKind::Rejected, message));
                false
            }
            None => {
                navigator.navigate(Route::Events);
                true
            }
        },
        Err(error) => {
            tracing::warn!(?kind, code = error.code(), error = %error, "mutation request failed");
            notify.error(UNEXPECTED_ERROR_MESSAGE);
            false
        }
    }
}
