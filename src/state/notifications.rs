use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::types::{Flash, FlashKind};

pub const SCHEDULES_FLASH_KEY: &str = "schedules";
pub const SHELL_FLASH_KEY: &str = "shell";

const TOAST_TTL: Duration = Duration::from_secs(5);
const MAX_TOASTS: usize = 3;

/// Inline messages, grouped by the view that owns them.
#[derive(Debug, Default)]
pub struct FlashStore {
    flashes: Vec<Flash>,
}

impl FlashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, kind: FlashKind, message: impl Into<String>) {
        self.flashes.push(Flash {
            key: key.to_string(),
            kind,
            message: message.into(),
        });
    }

    pub fn add_error(&mut self, key: &str, message: impl Into<String>) {
        self.add(key, FlashKind::Error, message);
    }

    pub fn clear(&mut self, key: &str) {
        self.flashes.retain(|f| f.key != key);
    }

    pub fn by_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Flash> + 'a {
        self.flashes.iter().filter(move |f| f.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.flashes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: FlashKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Short-lived notifications drawn over whatever screen is active.
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.push_at(kind, message, Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(FlashKind::Error, message);
    }

    fn push_at(&mut self, kind: FlashKind, message: impl Into<String>, now: Instant) {
        if self.toasts.len() == MAX_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            kind,
            message: message.into(),
            expires_at: now + TOAST_TTL,
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
