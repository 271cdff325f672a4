//! Interpreter session management for the pyhost bridge
//!
//! Everything that touches the embedded interpreter's process-wide state
//! lives here:
//! 1. Starting and finalizing the runtime exactly once
//! 2. Importing, reloading and releasing the startup module
//! 3. Running one-shot source snippets as throwaway modules
//! 4. Draining the interpreter's pending error as plain text
//!
//! Script-level failures never cross this crate as panics; they come back
//! as `Err` values and the rendered text stays in the interpreter until
//! `Session::extract_last_error` drains it.

pub mod errors;
mod interpreter;
mod python;
mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use errors::{CallFailed, SessionError};
pub use interpreter::Interpreter;
pub use python::{render_error, PythonInterpreter, PythonSettings};
pub use session::{Session, SessionPhase};
