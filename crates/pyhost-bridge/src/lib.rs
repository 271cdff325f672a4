//! Host-facing lifecycle bridge
//!
//! The host loads this bridge as a global plug-in and drives it through
//! `HostComponent`: one Register, any number of ignored process
//! notifications, one UnRegister. The bridge sequences those calls
//! against the interpreter `Session` and turns every script-side failure
//! into text on the host's display sink. No host call ever fails.

mod bridge;
mod engine;
mod options;
pub mod repair;

pub use bridge::{BridgeState, LifecycleBridge};
pub use engine::{HostComponent, HostEngine, HostStatus};
pub use options::BridgeOptions;
