//! # Plexus Notification Port
//!
//! Short user-facing notices ("Speed enabled", "[Speed] Set to defaults!").
//! Delivery is best-effort: a failing provider is logged and skipped, and a
//! notification can never abort the state transition that produced it.
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::kernel::error::panic_message;

/// Number of recent notifications the bridge keeps around
const HISTORY_LIMIT: usize = 64;

/// The notification port consumed by modules
pub trait Notifier: Send + Sync {
    /// Fire-and-forget
    fn notify(&self, text: &str);
}

/// A notification as handed to providers
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub text: String,
    pub timestamp: SystemTime,
}

impl NotificationMessage {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Renders notifications somewhere (console, chat overlay, ...)
pub trait NotificationProvider: Send {
    fn name(&self) -> &str;

    fn deliver(&mut self, message: &NotificationMessage) -> Result<(), String>;
}

/// Prints notifications to stdout
#[derive(Debug, Default)]
pub struct ConsoleProvider;

impl ConsoleProvider {
    pub fn new() -> Self {
        Self
    }

    fn format_time(time: SystemTime) -> String {
        if let Ok(duration) = time.duration_since(UNIX_EPOCH) {
            let secs = duration.as_secs();
            format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
        } else {
            String::from("00:00:00")
        }
    }
}

impl NotificationProvider for ConsoleProvider {
    fn name(&self) -> &str {
        "console"
    }

    fn deliver(&mut self, message: &NotificationMessage) -> Result<(), String> {
        println!("[{}] {}", Self::format_time(message.timestamp), message.text);
        Ok(())
    }
}

/// Keeps every notification text; handy for headless hosts and tests
#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded texts, usable after the provider is moved
    pub fn handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.messages.clone()
    }
}

impl NotificationProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn deliver(&mut self, message: &NotificationMessage) -> Result<(), String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.text.clone());
        Ok(())
    }
}

/// Fans notifications out to every registered provider
pub struct NotificationBridge {
    providers: Mutex<Vec<Box<dyn NotificationProvider>>>,
    history: Mutex<VecDeque<NotificationMessage>>,
    enabled: AtomicBool,
}

impl NotificationBridge {
    /// Create a bridge with no providers
    pub fn new() -> Self {
        Self {
            providers: Mutex::new(Vec::new()),
            history: Mutex::new(VecDeque::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Register a provider
    pub fn add_provider(&self, provider: Box<dyn NotificationProvider>) {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(provider);
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Muted bridges drop notifications without recording them
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// The most recent notifications, oldest first
    pub fn recent(&self) -> Vec<NotificationMessage> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn send(&self, message: NotificationMessage) {
        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            if history.len() == HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back(message.clone());
        }

        let mut providers = self.providers.lock().unwrap_or_else(PoisonError::into_inner);
        for provider in providers.iter_mut() {
            match panic::catch_unwind(AssertUnwindSafe(|| provider.deliver(&message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Notification provider '{}' failed: {}", provider.name(), e),
                Err(payload) => log::warn!(
                    "Notification provider '{}' panicked: {}",
                    provider.name(),
                    panic_message(&*payload)
                ),
            }
        }
    }
}

impl Default for NotificationBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBridge")
            .field("providers", &self.provider_names())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Notifier for NotificationBridge {
    fn notify(&self, text: &str) {
        if !self.is_enabled() {
            return;
        }
        self.send(NotificationMessage::new(text));
    }
}

#[cfg(test)]
mod tests;
