pub mod button;
pub mod device;
pub mod dispatcher;
pub mod events;
pub mod export;
pub mod hardware;
pub mod models;
pub mod session;
pub mod wizard;

pub use button::{ButtonEvent, PushButtonState, VisualCategory};
pub use device::{Device, DeviceSignal, DeviceState};
pub use dispatcher::{Clock, Dispatcher, ManualClock, SystemClock};
pub use events::{Event, Notification, NotificationLog, Outbox, Subscriber, SubscriptionId};
pub use export::{ExportBackend, ExportOperation, ExportOutcome, ExportStatus};
pub use hardware::{DeviceAccess, Passphrase};
pub use models::SessionSnapshot;
pub use session::{Session, SessionOptions};
pub use wizard::{Preconditions, WizardFlow, WizardStep};
