use std::cell::{Cell, RefCell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Undetermined,
    Denied,
    Granted,
}

impl From<Option<bool>> for PermissionStatus {
    fn from(access: Option<bool>) -> Self {
        match access {
            None => PermissionStatus::Undetermined,
            Some(false) => PermissionStatus::Denied,
            Some(true) => PermissionStatus::Granted,
        }
    }
}

pub type AccessCallback = Box<dyn FnOnce(bool)>;

pub trait PermissionProvider {
    fn current_status(&self) -> PermissionStatus;

    /// Ask for microphone access. `callback` runs later with the answer.
    fn request_access(&self, callback: AccessCallback);
}

/// What the record gesture may do right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Requested,
    SettingsPrompt,
}

/// Check microphone access before recording.
///
/// An undetermined status issues a request and stops there: granting access
/// does not start a recording, the user has to press record again.
pub fn check(provider: &dyn PermissionProvider) -> GateDecision {
    match provider.current_status() {
        PermissionStatus::Granted => GateDecision::Proceed,
        PermissionStatus::Denied => {
            tracing::info!("Microphone access denied, offering settings");
            GateDecision::SettingsPrompt
        }
        PermissionStatus::Undetermined => {
            tracing::info!("Requesting microphone access");
            provider.request_access(Box::new(|granted| {
                if granted {
                    tracing::info!("Microphone access granted, press record again to start");
                } else {
                    tracing::warn!("Microphone access request declined");
                }
            }));
            GateDecision::Requested
        }
    }
}

/// Consent kept in the user's configuration and answered at the terminal.
///
/// `request_access` only marks a question as pending; the screen resolves it
/// from the user's next answer.
pub struct ConsentPermission {
    status: Cell<PermissionStatus>,
    pending: RefCell<Option<AccessCallback>>,
}

impl ConsentPermission {
    pub fn new(access: Option<bool>) -> Self {
        Self {
            status: Cell::new(access.into()),
            pending: RefCell::new(None),
        }
    }

    /// Pick up a consent value edited outside the app
    pub fn reload(&self, access: Option<bool>) {
        self.status.set(access.into());
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Answer the pending request. Returns false when nothing was pending.
    pub fn resolve(&self, granted: bool) -> bool {
        let Some(callback) = self.pending.borrow_mut().take() else {
            return false;
        };
        self.status.set(if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        });
        callback(granted);
        true
    }
}

impl PermissionProvider for ConsentPermission {
    fn current_status(&self) -> PermissionStatus {
        self.status.get()
    }

    fn request_access(&self, callback: AccessCallback) {
        if self.pending.borrow_mut().replace(callback).is_some() {
            tracing::debug!("Replacing an unanswered microphone request");
        }
    }
}
