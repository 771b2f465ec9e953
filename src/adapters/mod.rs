use crate::config::AppConfig;
use crate::core::dispatcher::Clock;
use crate::core::session::Session;

mod simulated;

pub use simulated::{SimulatedDevice, SimulatedExport, SimulatorAction};

/// Build a session wired to the simulated collaborators described by `config`.
pub fn simulated_session(config: &AppConfig, clock: Box<dyn Clock>) -> Session {
    Session::new(
        clock,
        Box::new(SimulatedDevice::new(&config.simulation)),
        Box::new(SimulatedExport::new(&config.simulation)),
        config.session_options(),
    )
}
