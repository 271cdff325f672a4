//! End-to-end lifecycle against the embedded Python runtime.
//!
//! The runtime can only be finalized once per process, so this file holds
//! a single test that walks the whole Register/UnRegister cycle.

use pyhost_bridge::{BridgeOptions, BridgeState, HostComponent, HostEngine, LifecycleBridge};
use pyhost_session::{PythonInterpreter, PythonSettings, SessionPhase};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

#[derive(Clone, Default)]
struct RecordingEngine {
    displayed: Rc<RefCell<Vec<String>>>,
    connected: Rc<RefCell<bool>>,
}

impl HostEngine for RecordingEngine {
    type Handle = &'static str;

    fn connect(&mut self, _handle: &&'static str) -> bool {
        *self.connected.borrow_mut() = true;
        true
    }

    fn disconnect(&mut self) {
        *self.connected.borrow_mut() = false;
    }

    fn display_text(&self, text: &str, _is_error: bool) {
        self.displayed.borrow_mut().push(text.to_string());
    }
}

#[test]
fn test_register_reload_unregister_with_python() {
    let scripts = tempfile::tempdir().unwrap();
    fs::write(
        scripts.path().join("pyhost_e2e_startup.py"),
        "import sys\nsys.pyhost_e2e_loads = getattr(sys, 'pyhost_e2e_loads', 0) + 1\n",
    )
    .unwrap();

    let interpreter = PythonInterpreter::new(PythonSettings {
        python_home: None,
        python_path: vec![scripts.path().to_path_buf()],
    });
    let options = BridgeOptions {
        startup_module: "pyhost_e2e_startup".to_string(),
        repair_search_path: false,
        ..BridgeOptions::default()
    };
    let engine = RecordingEngine::default();
    let mut bridge = LifecycleBridge::new(engine.clone(), interpreter, options);

    assert!(bridge.register("engine").is_success());
    assert_eq!(bridge.state(), BridgeState::Active);
    assert!(*engine.connected.borrow());
    assert!(bridge.session().has_startup());
    assert!(engine.displayed.borrow().is_empty(), "{:?}", engine.displayed.borrow());

    assert!(bridge.reload());
    assert!(bridge.reload());
    assert!(engine.displayed.borrow().is_empty());

    assert!(bridge.unregister().is_success());
    assert_eq!(bridge.state(), BridgeState::Unregistered);
    assert_eq!(bridge.session().phase(), SessionPhase::Finalized);
    assert!(!*engine.connected.borrow());
    assert!(engine.displayed.borrow().is_empty());
}
