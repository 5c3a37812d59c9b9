use serde::{Deserialize, Serialize};

use crate::model::EventId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Shown until the persisted session token has been read.
    Launch,
    Auth,
    Login,
    Register,
    Events,
    EventAdd,
    EventDetails { id: EventId },
}

impl Route {
    #[must_use]
    pub const fn requires_session(&self) -> bool {
        matches!(self, Self::Events | Self::EventAdd | Self::EventDetails { .. })
    }
}

/// Screen-stack navigation handed to the handlers that move between
/// screens.
pub trait Navigate {
    fn current(&self) -> &Route;

    /// Pushes `route`, or pops back to it when it is already on the stack.
    fn navigate(&mut self, route: Route);

    /// Pops one screen. Returns false at the root.
    fn go_back(&mut self) -> bool;

    /// Replaces the whole stack, used when switching between the
    /// signed-in and signed-out stacks.
    fn reset(&mut self, root: Route);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    stack: Vec<Route>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Launch)
    }
}

impl Navigator {
    #[must_use]
    pub fn new(root: Route) -> Self {
        Self { stack: vec![root] }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.stack.len() > 1
    }
}

impl Navigate for Navigator {
    fn current(&self) -> &Route {
        // The stack is never empty: every mutation keeps the root.
        &self.stack[self.stack.len() - 1]
    }

    fn navigate(&mut self, route: Route) {
        match self.stack.iter().position(|r| *r == route) {
            Some(index) => self.stack.truncate(index + 1),
            None => self.stack.push(route),
        }
    }

    fn go_back(&mut self) -> bool {
        if self.can_go_back() {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    fn reset(&mut self, root: Route) {
        self.stack.clear();
        self.stack.push(root);
    }
}
