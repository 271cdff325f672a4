//! pyo3-backed interpreter
//!
//! ## Error indicator
//!
//! pyo3 hands failures back as `PyErr` values. To keep the session's
//! "fail, then drain" contract, every failing call renders its `PyErr`
//! while still attached and parks the text on the interpreter before
//! returning `CallFailed`. `take_error` drains that text. Each
//! `Python::attach` on a thread other than the initializing one gets a
//! throwaway thread state, so the raw error indicator cannot carry an
//! exception from one call to the next.

use crate::errors::CallFailed;
use crate::interpreter::Interpreter;
use pyhost_config::Config;
use pyhost_logger as logger;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyModule, PyTracebackMethods};
use std::env;
use std::ffi::CString;
use std::path::PathBuf;
use std::time::Instant;

/// Environment the interpreter is started with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PythonSettings {
    /// Exported as `PYTHONHOME` before initialization
    pub python_home: Option<PathBuf>,
    /// Prepended to `PYTHONPATH` before initialization
    pub python_path: Vec<PathBuf>,
}

impl PythonSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            python_home: config.get_python_home(),
            python_path: config.get_python_path(),
        }
    }
}

/// The process-wide embedded Python runtime
#[derive(Debug, Default)]
pub struct PythonInterpreter {
    settings: PythonSettings,
    pending: Option<String>,
}

impl PythonInterpreter {
    pub fn new(settings: PythonSettings) -> Self {
        Self {
            settings,
            pending: None,
        }
    }

    pub fn settings(&self) -> &PythonSettings {
        &self.settings
    }

    fn configure_environment(&self) {
        if let Some(ref home) = self.settings.python_home {
            env::set_var("PYTHONHOME", home);
            logger::debug(&format!("Set PYTHONHOME={}", home.display()));
        }

        if self.settings.python_path.is_empty() {
            return;
        }
        let mut paths = self.settings.python_path.clone();
        if let Some(existing) = env::var_os("PYTHONPATH") {
            if !existing.is_empty() {
                paths.extend(env::split_paths(&existing));
            }
        }
        match env::join_paths(paths) {
            Ok(joined) => {
                env::set_var("PYTHONPATH", &joined);
                logger::debug(&format!("Set PYTHONPATH={}", joined.to_string_lossy()));
            }
            Err(e) => logger::warn(&format!("Ignoring python-path: {}", e)),
        }
    }
}

impl Interpreter for PythonInterpreter {
    type Module = Py<PyModule>;

    fn initialize(&mut self) {
        self.configure_environment();

        let start = Instant::now();
        pyo3::Python::initialize();
        logger::debug(&format!(
            "pyo3::Python::initialize took: {:?}",
            start.elapsed()
        ));
    }

    fn finalize(&mut self) {
        // SAFETY: Py_IsInitialized may be called at any time.
        if unsafe { pyo3::ffi::Py_IsInitialized() } == 0 {
            logger::debug("Interpreter already finalized");
            return;
        }

        // SAFETY: the session calls this once, from the thread that owns the
        // runtime, after every module handle has been released. pyo3 leaves
        // the GIL released after initialization, so it is re-acquired here;
        // it is never released again because the runtime is gone.
        let status = unsafe {
            pyo3::ffi::PyGILState_Ensure();
            pyo3::ffi::Py_FinalizeEx()
        };
        if status != 0 {
            logger::debug(&format!("Py_FinalizeEx reported status {}", status));
        }
    }

    fn import_module(&mut self, name: &str) -> Result<Self::Module, CallFailed> {
        Python::attach(|py| {
            let imported = PyModule::import(py, name).map(Bound::unbind);
            self.settle(py, imported)
        })
    }

    fn reload_module(&mut self, module: &Self::Module) -> Result<Self::Module, CallFailed> {
        Python::attach(|py| {
            let reloaded = PyModule::import(py, "importlib")
                .and_then(|importlib| importlib.call_method1("reload", (module.bind(py),)))
                // importlib.reload re-executes in place and returns the same object
                .map(|_| module.clone_ref(py));
            self.settle(py, reloaded)
        })
    }

    fn execute_as_module(&mut self, source: &str, name: &str) -> Result<Self::Module, CallFailed> {
        Python::attach(|py| {
            let executed = compile_module(py, source, name);
            self.settle(py, executed)
        })
    }

    fn take_error(&mut self) -> Option<String> {
        Python::attach(|py| {
            let stray = PyErr::take(py);
            self.pending
                .take()
                .or_else(|| stray.map(|err| render_error(py, &err)))
        })
    }

    fn remove_module(&mut self, name: &str) -> bool {
        Python::attach(|py| match remove_from_sys_modules(py, name) {
            Ok(removed) => removed,
            Err(err) => {
                logger::debug(&format!(
                    "Failed to remove '{}' from sys.modules: {}",
                    name, err
                ));
                false
            }
        })
    }

    fn has_module(&mut self, name: &str) -> bool {
        Python::attach(|py| {
            sys_modules(py)
                .and_then(|modules| modules.contains(name))
                .unwrap_or(false)
        })
    }

    fn release_module(&mut self, module: Self::Module) {
        Python::attach(|_py| drop(module));
    }
}

/// Render a Python exception as the text a user would see at a prompt:
/// the formatted traceback (when there is one) followed by
/// `ExceptionType: message`.
pub fn render_error(py: Python<'_>, err: &PyErr) -> String {
    let mut text = String::new();
    if let Some(traceback) = err.traceback(py) {
        match traceback.format() {
            Ok(formatted) => text.push_str(&formatted),
            Err(e) => logger::debug(&format!("Failed to format traceback: {}", e)),
        }
    }
    text.push_str(&err.to_string());
    text
}

impl PythonInterpreter {
    /// Park the rendered exception of a failed call, replacing any older one.
    fn settle<T>(&mut self, py: Python<'_>, result: PyResult<T>) -> Result<T, CallFailed> {
        result.map_err(|err| {
            self.pending = Some(render_error(py, &err));
            CallFailed
        })
    }
}

fn compile_module(py: Python<'_>, source: &str, name: &str) -> PyResult<Py<PyModule>> {
    let code = to_cstring(source, "module source")?;
    let file_name = to_cstring(&format!("<{}>", name), "file name")?;
    let module_name = to_cstring(name, "module name")?;

    PyModule::from_code(
        py,
        code.as_c_str(),
        file_name.as_c_str(),
        module_name.as_c_str(),
    )
    .map(Bound::unbind)
}

fn to_cstring(value: &str, what: &str) -> PyResult<CString> {
    CString::new(value)
        .map_err(|e| PyValueError::new_err(format!("{} contains a NUL byte: {}", what, e)))
}

fn sys_modules(py: Python<'_>) -> PyResult<Bound<'_, PyAny>> {
    PyModule::import(py, "sys")?.getattr("modules")
}

fn remove_from_sys_modules(py: Python<'_>, name: &str) -> PyResult<bool> {
    let modules = sys_modules(py)?;
    if modules.contains(name)? {
        modules.del_item(name)?;
        Ok(true)
    } else {
        Ok(false)
    }
}
