//! In-memory interpreter for exercising session and bridge logic
//! without an embedded runtime.

use crate::errors::CallFailed;
use crate::interpreter::Interpreter;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// One recorded interpreter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize,
    Finalize,
    Import(String),
    Reload(String),
    Execute(String),
    TakeError,
    Remove(String),
    Release(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeModule {
    pub name: String,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<Call>,
    registry: BTreeSet<String>,
    pending: Option<String>,
    failing_imports: BTreeMap<String, Option<String>>,
    failing_execution: Option<Option<String>>,
}

/// Cloning shares state, so a test can keep a handle after moving one
/// clone into a session.
#[derive(Debug, Clone, Default)]
pub struct FakeInterpreter {
    state: Rc<RefCell<FakeState>>,
}

impl FakeInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make imports (and reloads) of `name` raise. `None` models a failure
    /// that leaves no pending error.
    pub fn fail_import(self, name: &str, error: Option<&str>) -> Self {
        self.state
            .borrow_mut()
            .failing_imports
            .insert(name.to_string(), error.map(str::to_string));
        self
    }

    /// Make every `execute_as_module` raise
    pub fn fail_execution(self, error: Option<&str>) -> Self {
        self.state.borrow_mut().failing_execution = Some(error.map(str::to_string));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state.borrow().calls.iter().filter(|c| *c == call).count()
    }

    /// Names currently in the module registry
    pub fn loaded(&self) -> BTreeSet<String> {
        self.state.borrow().registry.clone()
    }

    pub fn pending_error(&self) -> Option<String> {
        self.state.borrow().pending.clone()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn raise(&self, error: Option<String>) -> CallFailed {
        self.state.borrow_mut().pending = error;
        CallFailed
    }

    fn load(&self, name: &str) -> Result<FakeModule, CallFailed> {
        let failure = self.state.borrow().failing_imports.get(name).cloned();
        if let Some(error) = failure {
            return Err(self.raise(error));
        }
        self.state.borrow_mut().registry.insert(name.to_string());
        Ok(FakeModule {
            name: name.to_string(),
        })
    }
}

impl Interpreter for FakeInterpreter {
    type Module = FakeModule;

    fn initialize(&mut self) {
        self.record(Call::Initialize);
    }

    fn finalize(&mut self) {
        self.record(Call::Finalize);
        self.state.borrow_mut().registry.clear();
    }

    fn import_module(&mut self, name: &str) -> Result<FakeModule, CallFailed> {
        self.record(Call::Import(name.to_string()));
        self.load(name)
    }

    fn reload_module(&mut self, module: &FakeModule) -> Result<FakeModule, CallFailed> {
        self.record(Call::Reload(module.name.clone()));
        self.load(&module.name)
    }

    fn execute_as_module(&mut self, _source: &str, name: &str) -> Result<FakeModule, CallFailed> {
        self.record(Call::Execute(name.to_string()));
        let failure = self.state.borrow().failing_execution.clone();
        if let Some(error) = failure {
            return Err(self.raise(error));
        }
        self.state.borrow_mut().registry.insert(name.to_string());
        Ok(FakeModule {
            name: name.to_string(),
        })
    }

    fn take_error(&mut self) -> Option<String> {
        self.record(Call::TakeError);
        self.state.borrow_mut().pending.take()
    }

    fn remove_module(&mut self, name: &str) -> bool {
        self.record(Call::Remove(name.to_string()));
        self.state.borrow_mut().registry.remove(name)
    }

    fn has_module(&mut self, name: &str) -> bool {
        self.state.borrow().registry.contains(name)
    }

    fn release_module(&mut self, module: FakeModule) {
        self.record(Call::Release(module.name));
    }
}
