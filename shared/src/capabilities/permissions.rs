use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    AccessFineLocation,
}

/// Explanation the platform shows before the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rationale {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum PermissionOperation {
    Check {
        permission: PermissionKind,
    },
    Request {
        permission: PermissionKind,
        rationale: Rationale,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl Operation for PermissionOperation {
    type Output = PermissionStatus;
}

#[derive(crux_core::macros::Capability)]
pub struct Permissions<Ev> {
    context: CapabilityContext<PermissionOperation, Ev>,
}

impl<Ev> Permissions<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<PermissionOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn check<F>(&self, permission: PermissionKind, make_event: F)
    where
        F: FnOnce(PermissionStatus) -> Ev + Send + 'static,
    {
        self.dispatch(PermissionOperation::Check { permission }, make_event);
    }

    pub fn request<F>(&self, permission: PermissionKind, rationale: Rationale, make_event: F)
    where
        F: FnOnce(PermissionStatus) -> Ev + Send + 'static,
    {
        self.dispatch(
            PermissionOperation::Request {
                permission,
                rationale,
            },
            make_event,
        );
    }

    fn dispatch<F>(&self, operation: PermissionOperation, make_event: F)
    where
        F: FnOnce(PermissionStatus) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let status = context.request_from_shell(operation).await;
            context.update_app(make_event(status));
        });
    }
}
