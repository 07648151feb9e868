// Monitor callback hub
//
// Fans directory-monitor lifecycle events out to any number of subscribers
// without the project context knowing who they are.

use crate::models::{FileChangeEvent, FileTree, MonitorError, MonitorHandle};

pub type RegisteredCallback = Box<dyn FnMut(MonitorHandle, &FileTree)>;
pub type ErrorCallback = Box<dyn FnMut(&MonitorError)>;
pub type FilesChangedCallback = Box<dyn FnMut(&[FileChangeEvent])>;
pub type UnregisteredCallback = Box<dyn FnMut(MonitorHandle)>;

/// Kinds of monitor events a subscriber can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEventKind {
    Registered,
    RegistrationError,
    MonitoringError,
    FilesChanged,
    Unregistered,
}

/// A partial set of monitor handlers; absent handlers are simply not subscribed.
///
/// # Example
/// ```ignore
/// let callbacks = MonitorCallbacks::new()
///     .on_files_changed(|changes| println!("{} changes", changes.len()));
/// context.register_file_monitor_callbacks(callbacks);
/// ```
#[derive(Default)]
pub struct MonitorCallbacks {
    pub on_registered: Option<RegisteredCallback>,
    pub on_registration_error: Option<ErrorCallback>,
    pub on_monitoring_error: Option<ErrorCallback>,
    pub on_files_changed: Option<FilesChangedCallback>,
    pub on_unregistered: Option<UnregisteredCallback>,
}

impl MonitorCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_registered(mut self, f: impl FnMut(MonitorHandle, &FileTree) + 'static) -> Self {
        self.on_registered = Some(Box::new(f));
        self
    }

    pub fn on_registration_error(mut self, f: impl FnMut(&MonitorError) + 'static) -> Self {
        self.on_registration_error = Some(Box::new(f));
        self
    }

    pub fn on_monitoring_error(mut self, f: impl FnMut(&MonitorError) + 'static) -> Self {
        self.on_monitoring_error = Some(Box::new(f));
        self
    }

    pub fn on_files_changed(mut self, f: impl FnMut(&[FileChangeEvent]) + 'static) -> Self {
        self.on_files_changed = Some(Box::new(f));
        self
    }

    pub fn on_unregistered(mut self, f: impl FnMut(MonitorHandle) + 'static) -> Self {
        self.on_unregistered = Some(Box::new(f));
        self
    }
}

/// Multicast registry of monitor subscribers.
///
/// Subscriptions live as long as the hub; there is no unsubscribe. Every
/// notification is delivered to each subscriber of that kind in subscription
/// order. Events are never filtered, coalesced or replayed to late subscribers.
#[derive(Default)]
pub struct MonitorCallbackHub {
    registered: Vec<RegisteredCallback>,
    registration_error: Vec<ErrorCallback>,
    monitoring_error: Vec<ErrorCallback>,
    files_changed: Vec<FilesChangedCallback>,
    unregistered: Vec<UnregisteredCallback>,
}

impl MonitorCallbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every handler present in `callbacks` to its kind's subscriber list.
    pub fn subscribe(&mut self, callbacks: MonitorCallbacks) {
        let MonitorCallbacks {
            on_registered,
            on_registration_error,
            on_monitoring_error,
            on_files_changed,
            on_unregistered,
        } = callbacks;

        self.registered.extend(on_registered);
        self.registration_error.extend(on_registration_error);
        self.monitoring_error.extend(on_monitoring_error);
        self.files_changed.extend(on_files_changed);
        self.unregistered.extend(on_unregistered);
    }

    pub fn subscriber_count(&self, kind: MonitorEventKind) -> usize {
        match kind {
            MonitorEventKind::Registered => self.registered.len(),
            MonitorEventKind::RegistrationError => self.registration_error.len(),
            MonitorEventKind::MonitoringError => self.monitoring_error.len(),
            MonitorEventKind::FilesChanged => self.files_changed.len(),
            MonitorEventKind::Unregistered => self.unregistered.len(),
        }
    }

    pub fn notify_registered(&mut self, handle: MonitorHandle, files: &FileTree) {
        for callback in &mut self.registered {
            callback(handle, files);
        }
    }

    pub fn notify_registration_error(&mut self, error: &MonitorError) {
        for callback in &mut self.registration_error {
            callback(error);
        }
    }

    pub fn notify_monitoring_error(&mut self, error: &MonitorError) {
        for callback in &mut self.monitoring_error {
            callback(error);
        }
    }

    pub fn notify_files_changed(&mut self, changes: &[FileChangeEvent]) {
        for callback in &mut self.files_changed {
            callback(changes);
        }
    }

    pub fn notify_unregistered(&mut self, handle: MonitorHandle) {
        for callback in &mut self.unregistered {
            callback(handle);
        }
    }
}
