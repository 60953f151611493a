//! Fire-and-forget user notifications.

use crate::libs::messages::Message;
use crate::{msg_error, msg_info, msg_success, msg_warning};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: Message);
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Prints through the console message macros.
#[derive(Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: Level, message: Message) {
        match level {
            Level::Info => msg_info!(message),
            Level::Success => msg_success!(message),
            Level::Warning => msg_warning!(message),
            Level::Error => msg_error!(message),
        }
    }
}

/// Records notifications for later inspection.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<(Level, Message)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Level, Message)> {
        self.sent.lock().clone()
    }

    pub fn take(&self) -> Vec<(Level, Message)> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: Level, message: Message) {
        self.sent.lock().push((level, message));
    }
}
