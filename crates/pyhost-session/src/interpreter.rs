use crate::errors::CallFailed;

/// The capabilities a session consumes from an embedded interpreter.
///
/// Failing calls return `CallFailed` and keep the rendered exception as
/// the pending error, replacing an older one; `take_error` drains it.
/// The pending error must survive between calls made from different
/// threads, as long as the calls are serialized.
/// Implementations must never unwind on a script-level failure.
pub trait Interpreter {
    /// Handle to a module object owned by the interpreter
    type Module;

    fn initialize(&mut self);

    /// Tear down the runtime. All module handles must be released first.
    fn finalize(&mut self);

    fn import_module(&mut self, name: &str) -> Result<Self::Module, CallFailed>;

    /// Re-execute a module in place, keeping its identity
    fn reload_module(&mut self, module: &Self::Module) -> Result<Self::Module, CallFailed>;

    /// Compile `source` and execute it as a module registered under `name`
    fn execute_as_module(&mut self, source: &str, name: &str) -> Result<Self::Module, CallFailed>;

    /// Fetch and clear the pending error as text, if there is one
    fn take_error(&mut self) -> Option<String>;

    /// Remove `name` from the module registry. Returns whether it was there.
    fn remove_module(&mut self, name: &str) -> bool;

    fn has_module(&mut self, name: &str) -> bool;

    /// Drop a module handle while the runtime is still alive
    fn release_module(&mut self, module: Self::Module) {
        drop(module);
    }
}
