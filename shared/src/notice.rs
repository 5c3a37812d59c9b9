use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Sink for the dismissible modal messages shown over any screen.
pub trait Notify {
    fn notify(&mut self, kind: NoticeKind, message: String);

    fn error(&mut self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notify(NoticeKind::Error, message.into());
    }

    fn success(&mut self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notify(NoticeKind::Success, message.into());
    }

    fn info(&mut self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notify(NoticeKind::Info, message.into());
    }

    fn report(&mut self, error: &AppError)
    where
        Self: Sized,
    {
        self.notify(NoticeKind::Error, error.user_facing_message());
    }
}

/// FIFO of pending notices; the shell shows the front one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notices {
    next_id: u64,
    queue: VecDeque<Notice>,
}

impl Notices {
    #[must_use]
    pub fn current(&self) -> Option<&Notice> {
        self.queue.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|n| n.id != id);
        self.queue.len() != before
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Notify for Notices {
    fn notify(&mut self, kind: NoticeKind, message: String) {
        // Collapse repeats of the notice already on screen.
        if self
            .queue
            .back()
            .is_some_and(|n| n.kind == kind && n.message == message)
        {
            return;
        }
        self.next_id += 1;
        self.queue.push_back(Notice {
            id: self.next_id,
            kind,
            message,
        });
    }
}
