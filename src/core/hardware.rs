use std::fmt;

use serde::{Serialize, Serializer};

use super::dispatcher::Dispatcher;

/// A passphrase on its way to the device-access service.
///
/// Never printed: `Debug` and serialization are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

impl Serialize for Passphrase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// The service that watches for the device and talks to its encryption layer.
///
/// Implementations never block: results are posted back through the
/// dispatcher as [`DeviceSignal`](super::device::DeviceSignal) events.
pub trait DeviceAccess {
    /// Called once when the session starts. Typically posts the first probe result.
    fn start(&mut self, dispatcher: &mut Dispatcher);

    /// Begin an unlock attempt. The outcome must arrive later as
    /// `UnlockSucceeded` or `UnlockFailed`.
    fn request_unlock(&mut self, passphrase: &Passphrase, dispatcher: &mut Dispatcher);
}
