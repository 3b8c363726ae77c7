mod controller;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod status;
mod types;


pub use controller::{SimulationController, SimulationControllerBuilder};
pub use status::{StatusBoard, StatusFields};
pub use types::{ComponentState, SimulationStats};
