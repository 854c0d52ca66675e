use runtime::{Event, EventBus, Frame};
use streaming::{FetchError, LoadError};
use tracing::{info, warn};

use crate::api::ApiError;

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";
pub const TRANSPORT_ERROR_MESSAGE: &str = "Could not load data from the server. Please try again.";

/// A failure, reduced to what the user is told about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The server explained the problem; shown verbatim.
    Api { detail: String },
    /// Network, payload or decode trouble; the raw message is only logged.
    Transport { message: String },
    Unknown,
}

impl From<&ApiError> for Failure {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Api { detail, .. } => Failure::Api {
                detail: detail.clone(),
            },
            ApiError::Status { .. } => Failure::Unknown,
            ApiError::Transport { message } | ApiError::Decode { message } => Failure::Transport {
                message: message.clone(),
            },
        }
    }
}

impl From<&LoadError> for Failure {
    fn from(err: &LoadError) -> Self {
        match err {
            LoadError::Fetch(FetchError::Api { detail, .. }) => Failure::Api {
                detail: detail.clone(),
            },
            LoadError::Fetch(FetchError::Status { .. }) => Failure::Unknown,
            LoadError::Fetch(FetchError::Transport { message }) => Failure::Transport {
                message: message.clone(),
            },
            LoadError::Decode(e) => Failure::Transport {
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub failure: Failure,
}

impl Notification {
    pub fn for_failure(failure: Failure) -> Self {
        let message = match &failure {
            Failure::Api { detail } => detail.clone(),
            Failure::Transport { .. } => TRANSPORT_ERROR_MESSAGE.to_string(),
            Failure::Unknown => UNKNOWN_ERROR_MESSAGE.to_string(),
        };
        Self { message, failure }
    }
}

/// Turns failures into user-visible notifications.
///
/// One `report` is one notification; nothing is merged or dropped.
#[derive(Debug, Default)]
pub struct ErrorBridge {
    bus: EventBus<Notification>,
}

impl ErrorBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, frame: Option<Frame>, failure: impl Into<Failure>) {
        let failure = failure.into();
        match &failure {
            Failure::Transport { message } => warn!(error = %message, "transport failure"),
            Failure::Api { detail } => info!(detail = %detail, "API rejected request"),
            Failure::Unknown => warn!("unclassified failure"),
        }
        self.bus.emit(frame, Notification::for_failure(failure));
    }

    pub fn pending(&self) -> &[Event<Notification>] {
        self.bus.events()
    }

    pub fn drain(&mut self) -> Vec<Event<Notification>> {
        self.bus.drain()
    }
}
