//! Local and push notification plumbing.
//!
//! # Responsibility
//! - Define the notifier seam used when tasks are created.
//! - Decode push payloads into displayable notifications.
//! - Choose which window a notification click should bring forward.
//!
//! # Invariants
//! - Notifications are only shown when permission is `Granted`.
//! - A push payload always yields a notification; undecodable payloads fall
//!   back to the default title with the raw text as body.

use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Title used for push messages without one.
pub const DEFAULT_PUSH_TITLE: &str = "TodoZen Reminder";
/// Title of the notification shown after a task is added.
pub const TASK_ADDED_TITLE: &str = "Task Added!";
/// Path opened when a click finds no open window.
pub const ROOT_PATH: &str = "/";

/// User decision about notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Not asked yet.
    Default,
    Granted,
    Denied,
}

impl NotificationPermission {
    /// Parses `default|granted|denied`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: Option<String>,
    /// Replaces an earlier notification with the same tag.
    pub tag: Option<String>,
}

impl Notification {
    /// Notification announcing a newly added task.
    pub fn task_added(description: &str) -> Self {
        Self {
            title: TASK_ADDED_TITLE.to_string(),
            body: Some(description.to_string()),
            tag: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    PermissionDenied,
    Backend(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission not granted"),
            Self::Backend(message) => write!(f, "notification backend error: {message}"),
        }
    }
}

impl Error for NotifyError {}

/// Notification display backend.
pub trait Notifier {
    fn permission(&self) -> NotificationPermission;
    fn show(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Shows `notification` only when permission is granted.
///
/// Returns `Ok(false)` when skipped for lack of permission.
pub fn notify_if_permitted<N: Notifier + ?Sized>(
    notifier: &N,
    notification: &Notification,
) -> Result<bool, NotifyError> {
    if notifier.permission() != NotificationPermission::Granted {
        return Ok(false);
    }
    notifier.show(notification)?;
    Ok(true)
}

/// Notifier that records notifications in the log.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    permission: NotificationPermission,
}

impl LogNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self { permission }
    }
}

impl Notifier for LogNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.permission != NotificationPermission::Granted {
            return Err(NotifyError::PermissionDenied);
        }
        // Body may contain task text; log only its presence.
        info!(
            "event=notification_show module=notify status=ok title={:?} has_body={} tagged={}",
            notification.title,
            notification.body.is_some(),
            notification.tag.is_some()
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    tag: Option<String>,
}

/// Decodes a server push payload.
///
/// JSON objects provide `title`, `body` and `tag`. Anything else becomes a
/// notification with [`DEFAULT_PUSH_TITLE`] and the payload text as body.
pub fn push_notification(payload: &[u8]) -> Notification {
    match serde_json::from_slice::<PushPayload>(payload) {
        Ok(data) => Notification {
            title: data
                .title
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| DEFAULT_PUSH_TITLE.to_string()),
            body: data.body,
            tag: data.tag,
        },
        Err(_) => {
            let text = String::from_utf8_lossy(payload).into_owned();
            Notification {
                title: DEFAULT_PUSH_TITLE.to_string(),
                body: Some(text).filter(|text| !text.is_empty()),
                tag: None,
            }
        }
    }
}

/// An open application window, as seen when a notification is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: String,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// Bring this existing window forward.
    Focus(String),
    /// Open a new window at this path.
    Open(String),
}

/// Picks the window a notification click should act on.
///
/// Prefers the last focused window, then the first window, else opens
/// [`ROOT_PATH`].
pub fn click_target(windows: &[ClientWindow]) -> ClickTarget {
    let Some(first) = windows.first() else {
        return ClickTarget::Open(ROOT_PATH.to_string());
    };
    let chosen = windows
        .iter()
        .rev()
        .find(|window| window.focused)
        .unwrap_or(first);
    ClickTarget::Focus(chosen.id.clone())
}
