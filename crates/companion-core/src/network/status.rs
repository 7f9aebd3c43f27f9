//! Connectivity status and its user-facing banner.

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Device connectivity as seen by the app.
///
/// The monitor's probes only ever produce `Online` or `Offline`; `Connecting`
/// is set by composing code, e.g. while a manual reconnect is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    Online = 0,
    Offline = 1,
    Connecting = 2,
}

impl ConnectivityStatus {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            ConnectivityStatus::Online
        } else {
            ConnectivityStatus::Offline
        }
    }
}

impl std::fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectivityStatus::Online => write!(f, "online"),
            ConnectivityStatus::Offline => write!(f, "offline"),
            ConnectivityStatus::Connecting => write!(f, "connecting"),
        }
    }
}

/// Lock-free cell holding the current status.
pub(crate) struct AtomicConnectivityStatus(AtomicU8);

impl AtomicConnectivityStatus {
    pub(crate) fn new(status: ConnectivityStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub(crate) fn load(&self) -> ConnectivityStatus {
        match self.0.load(Ordering::SeqCst) {
            0 => ConnectivityStatus::Online,
            1 => ConnectivityStatus::Offline,
            _ => ConnectivityStatus::Connecting,
        }
    }

    /// Store `status`, returning the previous value.
    pub(crate) fn swap(&self, status: ConnectivityStatus) -> ConnectivityStatus {
        match self.0.swap(status as u8, Ordering::SeqCst) {
            0 => ConnectivityStatus::Online,
            1 => ConnectivityStatus::Offline,
            _ => ConnectivityStatus::Connecting,
        }
    }
}

/// Content of the low-priority connectivity bar shown while not online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBanner {
    pub title: &'static str,
    pub detail: &'static str,
    /// Whether the bar offers a manual "retry" action.
    pub show_retry: bool,
}

impl StatusBanner {
    /// Banner for `status`, or `None` when nothing should be shown.
    pub fn for_status(status: ConnectivityStatus) -> Option<Self> {
        match status {
            ConnectivityStatus::Online => None,
            ConnectivityStatus::Offline => Some(Self {
                title: "No connection",
                detail: "Trying to reconnect...",
                show_retry: true,
            }),
            ConnectivityStatus::Connecting => Some(Self {
                title: "Connecting...",
                detail: "Please wait...",
                show_retry: false,
            }),
        }
    }
}
