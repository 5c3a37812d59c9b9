//! GraphQL documents, variables and response decoding for the events API,
//! plus the LRU page cache behind cache-or-network fetches.

use lru::LruCache;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::event_form::ScheduleItem;
use crate::fetch::{EventsPage, FetchRequest};
use crate::model::{Attendee, EventId, EventSummary};

pub const EVENTS_QUERY: &str = r"query EventsScreenRefetchQuery(
  $count: Int
  $cursor: String
  $search: String
  $coordinates: [Float]
  $distance: Int
  $days: Int
) {
  events(first: $count, after: $cursor, search: $search, coordinates: $coordinates, distance: $distance, days: $days) {
    edges {
      node {
        id
        title
        date
        location { street }
        publicList { name }
        schedule { time title talker }
        isOwner
        isEventAttended
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}";

pub const EVENT_DETAIL_QUERY: &str = r"query EventDetailQuery($id: ID) {
  event(id: $id) {
    title
    description
    date
    location { street }
    isOwner
    schedule { time title talker }
    publicList { name }
    isEventAttended
    publicLimit
  }
}";

pub const LOGIN_MUTATION: &str = r"mutation LoginEmailMutation($input: LoginEmailInput!) {
  LoginEmail(input: $input) { token error }
}";

pub const REGISTER_MUTATION: &str = r"mutation RegisterEmailMutation($input: RegisterEmailInput!) {
  RegisterEmail(input: $input) { token error }
}";

pub const EVENT_ADD_MUTATION: &str = r"mutation EventAddMutation($input: EventAddInput!) {
  EventAdd(input: $input) { error event { title } }
}";

pub const EVENT_EDIT_MUTATION: &str = r"mutation EventEditMutation($input: EventEditInput!) {
  EventEdit(input: $input) { error event { title } }
}";

pub const ATTEND_MUTATION: &str = r"mutation AttendToEventMutation($input: AttendToEventInput!) {
  AttendToEvent(input: $input) { error }
}";

pub const CANT_GO_MUTATION: &str = r"mutation CantGoToEventMutation($input: CantGoToEventInput!) {
  CantGoToEvent(input: $input) { error }
}";

// --- Errors ---

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphqlError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server returned errors: {0}")]
    Server(String),

    #[error("response carried no data for {0}")]
    MissingData(&'static str),

    #[error("{0}")]
    Encode(String),
}

impl From<GraphqlError> for AppError {
    fn from(e: GraphqlError) -> Self {
        let kind = match &e {
            GraphqlError::Transport(_) => ErrorKind::Network,
            GraphqlError::Server(_) => ErrorKind::Internal,
            GraphqlError::MissingData(_) | GraphqlError::Encode(_) => ErrorKind::Deserialization,
        };
        AppError::new(kind, e.to_string())
    }
}

// --- Envelope ---

#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GraphqlErrorMessage {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputVariables<I> {
    pub input: I,
}

pub fn encode_request<V: Serialize>(query: &str, variables: V) -> Result<String, GraphqlError> {
    serde_json::to_string(&GraphqlRequest { query, variables })
        .map_err(|e| GraphqlError::Encode(e.to_string()))
}

/// Unwraps a transport result carrying a GraphQL envelope. A non-empty
/// `errors` list wins over partial `data`.
pub fn decode_response<T>(
    operation: &'static str,
    result: Result<Option<GraphqlResponse<T>>, String>,
) -> Result<T, GraphqlError> {
    let response = result
        .map_err(GraphqlError::Transport)?
        .ok_or(GraphqlError::MissingData(operation))?;

    if !response.errors.is_empty() {
        let joined = response
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(GraphqlError::Server(joined));
    }
    response.data.ok_or(GraphqlError::MissingData(operation))
}

// The server serialises some booleans as strings ("true").
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Bool(b)) => b,
        Some(Raw::Text(s)) => s.eq_ignore_ascii_case("true"),
        None => false,
    })
}

// --- Events connection ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsVariables {
    pub count: u32,
    pub cursor: Option<String>,
    pub search: String,
    pub coordinates: [f64; 2],
    pub distance: u32,
    pub days: Option<u32>,
}

impl From<&FetchRequest> for EventsVariables {
    fn from(req: &FetchRequest) -> Self {
        Self {
            count: req.count,
            cursor: req.cursor.clone(),
            search: req.filters.search.clone(),
            coordinates: req.filters.coordinates.as_lng_lat(),
            distance: req.filters.distance_radius,
            days: req.filters.date_window_days,
        }
    }
}

impl EventsVariables {
    /// Stable key for the page cache; identical variables share an entry.
    #[must_use]
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsData {
    pub events: Connection<EventNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<N>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<N> {
    pub node: N,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LocationNode {
    #[serde(default)]
    pub street: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    pub id: EventId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<LocationNode>,
    #[serde(default)]
    pub public_list: Vec<Attendee>,
    #[serde(default)]
    pub schedule: Vec<ScheduleItem>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_owner: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_event_attended: bool,
}

/// List address: the street up to its first `-`.
#[must_use]
pub fn list_address(street: &str) -> String {
    street.split('-').next().unwrap_or_default().trim().to_string()
}

impl From<EventNode> for EventSummary {
    fn from(node: EventNode) -> Self {
        let address = node
            .location
            .and_then(|l| l.street)
            .map(|s| list_address(&s))
            .unwrap_or_default();
        Self {
            id: node.id,
            title: node.title,
            address,
            date: node.date.unwrap_or_default(),
            attendees: node.public_list,
            is_owner: node.is_owner,
            is_attending: node.is_event_attended,
        }
    }
}

impl EventsData {
    #[must_use]
    pub fn into_page(self) -> EventsPage {
        let Connection { edges, page_info } = self.events;
        EventsPage {
            items: edges.into_iter().map(|e| e.node.into()).collect(),
            end_cursor: page_info.end_cursor,
            has_next_page: page_info.has_next_page,
        }
    }
}

// --- Event detail ---

#[derive(Debug, Clone, Serialize)]
pub struct EventDetailVariables {
    pub id: EventId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDetailData {
    pub event: Option<EventDetailNode>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailNode {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<LocationNode>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_owner: bool,
    #[serde(default)]
    pub schedule: Vec<ScheduleItem>,
    #[serde(default)]
    pub public_list: Vec<Attendee>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_event_attended: bool,
    #[serde(default)]
    pub public_limit: Option<u32>,
}

// --- Mutations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    LoginEmail,
    RegisterEmail,
    EventAdd,
    EventEdit,
    AttendToEvent,
    CantGoToEvent,
}

impl MutationKind {
    /// Root field of the mutation's response payload.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::LoginEmail => "LoginEmail",
            Self::RegisterEmail => "RegisterEmail",
            Self::EventAdd => "EventAdd",
            Self::EventEdit => "EventEdit",
            Self::AttendToEvent => "AttendToEvent",
            Self::CantGoToEvent => "CantGoToEvent",
        }
    }

    #[must_use]
    pub const fn document(self) -> &'static str {
        match self {
            Self::LoginEmail => LOGIN_MUTATION,
            Self::RegisterEmail => REGISTER_MUTATION,
            Self::EventAdd => EVENT_ADD_MUTATION,
            Self::EventEdit => EVENT_EDIT_MUTATION,
            Self::AttendToEvent => ATTEND_MUTATION,
            Self::CantGoToEvent => CANT_GO_MUTATION,
        }
    }
}

/// Common shape of every mutation payload: an optional server-side
/// rejection message and, for the auth mutations, a session token.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MutationPayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl fmt::Debug for MutationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationPayload")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("error", &self.error)
            .finish()
    }
}

pub type MutationData = HashMap<String, Option<MutationPayload>>;

pub fn take_payload(kind: MutationKind, mut data: MutationData) -> Result<MutationPayload, GraphqlError> {
    data.remove(kind.field())
        .flatten()
        .ok_or(GraphqlError::MissingData(kind.field()))
}

#[derive(Clone, Serialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLocationInput {
    pub coordinates: [f64; 2],
    pub street: String,
    pub cep: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<EventLocationInput>,
    pub public_limit: u32,
    pub schedule: Vec<ScheduleItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceInput {
    pub event_id: EventId,
}

// --- Page cache ---

pub struct PageCache {
    pages: LruCache<String, EventsPage>,
}

impl PageCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            pages: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<EventsPage> {
        self.pages.get(key).cloned()
    }

    pub fn put(&mut self, key: String, page: EventsPage) {
        self.pages.put(key, page);
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl fmt::Debug for PageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCache")
            .field("len", &self.pages.len())
            .field("cap", &self.pages.cap())
            .finish()
    }
}
