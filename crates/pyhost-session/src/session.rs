use crate::errors::SessionError;
use crate::interpreter::Interpreter;
use pyhost_logger as logger;

/// Where the session is in its one-shot lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Fresh,
    Running,
    Finalized,
}

struct StartupModule<M> {
    name: String,
    handle: M,
}

/// Owns the embedded interpreter for the life of a host session.
///
/// `start` and `stop` pair 1:1; the runtime cannot be restarted once
/// finalized. Dropping a running session stops it.
pub struct Session<I: Interpreter> {
    interpreter: I,
    phase: SessionPhase,
    startup: Option<StartupModule<I::Module>>,
}

impl<I: Interpreter> Session<I> {
    pub fn new(interpreter: I) -> Self {
        Self {
            interpreter,
            phase: SessionPhase::Fresh,
            startup: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    pub fn start(&mut self) {
        if self.phase != SessionPhase::Fresh {
            logger::warn(&format!(
                "Ignoring interpreter start in phase {:?}",
                self.phase
            ));
            return;
        }
        logger::step("Starting embedded interpreter");
        self.interpreter.initialize();
        self.phase = SessionPhase::Running;
    }

    pub fn import_module(&mut self, name: &str) -> Result<I::Module, SessionError> {
        self.ensure_running()?;
        logger::debug(&format!("Importing module: {}", name));
        self.interpreter
            .import_module(name)
            .map_err(|_| SessionError::Import {
                module: name.to_string(),
            })
    }

    pub fn reload_module(&mut self, module: &I::Module) -> Result<I::Module, SessionError> {
        self.ensure_running()?;
        self.interpreter
            .reload_module(module)
            .map_err(|_| SessionError::Reload)
    }

    /// Drain the pending interpreter error as text
    pub fn extract_last_error(&mut self) -> Option<String> {
        if !self.is_active() {
            return None;
        }
        self.interpreter.take_error()
    }

    /// Run `source` as a throwaway module named `name`.
    ///
    /// On success the module stays registered under `name`; the caller
    /// must take it out again with `remove_module`.
    pub fn execute_as_ephemeral_module(
        &mut self,
        source: &str,
        name: &str,
    ) -> Result<I::Module, SessionError> {
        self.ensure_running()?;
        logger::debug(&format!("Executing source as module: {}", name));
        self.interpreter
            .execute_as_module(source, name)
            .map_err(|_| SessionError::Execute {
                module: name.to_string(),
            })
    }

    pub fn remove_module(&mut self, name: &str) -> bool {
        self.is_active() && self.interpreter.remove_module(name)
    }

    pub fn has_module(&mut self, name: &str) -> bool {
        self.is_active() && self.interpreter.has_module(name)
    }

    pub fn release_module(&mut self, module: I::Module) {
        if self.is_active() {
            self.interpreter.release_module(module);
        } else {
            // Without a runtime there is nothing left to decrement.
            std::mem::forget(module);
        }
    }

    /// Import the startup module and keep a reference to it
    pub fn load_startup(&mut self, name: &str) -> Result<(), SessionError> {
        let handle = self.import_module(name)?;
        if let Some(previous) = self.startup.take() {
            self.interpreter.release_module(previous.handle);
        }
        self.startup = Some(StartupModule {
            name: name.to_string(),
            handle,
        });
        Ok(())
    }

    /// Re-import the startup module in place
    pub fn reload_startup(&mut self) -> Result<(), SessionError> {
        self.ensure_running()?;
        let startup = self.startup.as_mut().ok_or(SessionError::NoStartupModule)?;
        logger::debug(&format!("Reloading module: {}", startup.name));
        let handle = self
            .interpreter
            .reload_module(&startup.handle)
            .map_err(|_| SessionError::Reload)?;
        let previous = std::mem::replace(&mut startup.handle, handle);
        self.interpreter.release_module(previous);
        Ok(())
    }

    pub fn has_startup(&self) -> bool {
        self.startup.is_some()
    }

    pub fn startup_module_name(&self) -> Option<&str> {
        self.startup.as_ref().map(|s| s.name.as_str())
    }

    /// Release the startup module and finalize the runtime
    pub fn stop(&mut self) {
        if self.phase != SessionPhase::Running {
            logger::debug(&format!(
                "Ignoring interpreter stop in phase {:?}",
                self.phase
            ));
            return;
        }
        if let Some(startup) = self.startup.take() {
            self.interpreter.release_module(startup.handle);
        }
        logger::step("Finalizing embedded interpreter");
        self.interpreter.finalize();
        self.phase = SessionPhase::Finalized;
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SessionError::NotStarted)
        }
    }
}

impl<I: Interpreter> Drop for Session<I> {
    fn drop(&mut self) {
        self.stop();
    }
}
