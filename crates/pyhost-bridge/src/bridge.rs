use crate::engine::{HostComponent, HostEngine, HostStatus};
use crate::options::BridgeOptions;
use crate::repair;
use pyhost_logger as logger;
use pyhost_session::{Interpreter, Session, SessionError, SessionPhase};

/// Host-visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unregistered,
    Registering,
    Active,
    Unregistering,
}

/// Global plug-in that ties the host's component lifecycle to one
/// embedded interpreter session.
///
/// A bridge registers at most once: after UnRegister the interpreter is
/// finalized and cannot be started again in this process.
pub struct LifecycleBridge<E: HostEngine, I: Interpreter> {
    engine: E,
    session: Session<I>,
    options: BridgeOptions,
    state: BridgeState,
    engine_handle: Option<E::Handle>,
    connected: bool,
    initializing: bool,
}

impl<E: HostEngine, I: Interpreter> LifecycleBridge<E, I> {
    pub fn new(engine: E, interpreter: I, options: BridgeOptions) -> Self {
        Self {
            engine,
            session: Session::new(interpreter),
            options,
            state: BridgeState::Unregistered,
            engine_handle: None,
            connected: false,
            initializing: false,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Whether Register reached the host engine. An `Active` bridge that
    /// is not connected is alive but does nothing.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True only while the startup module is being imported
    pub fn is_initializing(&self) -> bool {
        self.initializing
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_handle(&self) -> Option<&E::Handle> {
        self.engine_handle.as_ref()
    }

    pub fn session(&self) -> &Session<I> {
        &self.session
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Re-import the startup module without touching the engine
    /// connection. Meant for iterating on scripts during development.
    pub fn reload(&mut self) -> bool {
        if self.state != BridgeState::Active {
            logger::warn(&format!("Cannot reload in state {:?}", self.state));
            return false;
        }

        match self.session.reload_startup() {
            Ok(()) => {
                logger::info(&format!(
                    "Reloaded module '{}'",
                    self.options.startup_module
                ));
                true
            }
            Err(SessionError::NoStartupModule) => {
                logger::warn("No startup module is loaded; nothing to reload");
                false
            }
            Err(e) => {
                logger::debug(&format!("Reload failed: {}", e));
                let header = format!(
                    "An exception occurred reloading '{}' module:",
                    self.options.startup_module
                );
                let detail = self.session.extract_last_error();
                self.report(&header, detail.as_deref());
                false
            }
        }
    }

    fn connect_engine(&mut self, handle: E::Handle) -> bool {
        self.connected = self.engine.connect(&handle);
        self.engine_handle = Some(handle);
        self.connected
    }

    fn load_startup_module(&mut self) {
        let name = self.options.startup_module.clone();

        self.initializing = true;
        self.engine.set_initializing(true);
        let result = self.session.load_startup(&name);
        self.engine.set_initializing(false);
        self.initializing = false;

        match result {
            Ok(()) => logger::debug(&format!("Loaded startup module '{}'", name)),
            Err(e) => {
                logger::debug(&format!("{}", e));
                let header = format!("An exception occurred loading '{}' module:", name);
                let detail = self.session.extract_last_error();
                self.report(&header, detail.as_deref());
            }
        }
    }

    fn repair_search_path(&mut self) {
        let outcome =
            repair::add_core_to_search_path(&mut self.session, &self.options.search_path_key);
        // Register proceeds either way; only the text is surfaced.
        if let Some(detail) = outcome.diagnostic {
            self.report(
                "An exception occurred during search path repair:",
                Some(&detail),
            );
        }
    }

    /// Forward a diagnostic to the display sink and the log file
    fn report(&self, header: &str, detail: Option<&str>) {
        logger::script(header);
        self.engine.display_text(&format!("{}\n", header), true);
        if let Some(text) = detail {
            logger::script(text);
            self.engine.display_text(text, true);
            self.engine.display_text("\n", false);
        }
    }
}

impl<E: HostEngine, I: Interpreter> HostComponent for LifecycleBridge<E, I> {
    type Handle = E::Handle;

    fn register(&mut self, handle: E::Handle) -> HostStatus {
        if self.state != BridgeState::Unregistered || self.session.phase() != SessionPhase::Fresh {
            logger::warn(&format!(
                "Ignoring Register: bridge is {:?}, interpreter is {:?}",
                self.state,
                self.session.phase()
            ));
            return HostStatus::Success;
        }

        self.state = BridgeState::Registering;
        self.session.start();

        if !self.connect_engine(handle) {
            logger::error("Failed to connect to the host engine");
            self.report("Failed to connect to the host engine", None);
            self.state = BridgeState::Active;
            return HostStatus::Success;
        }

        if self.options.repair_search_path {
            self.repair_search_path();
        }

        self.load_startup_module();

        self.state = BridgeState::Active;
        logger::debug("Register completed");
        HostStatus::Success
    }

    fn unregister(&mut self) -> HostStatus {
        if self.state != BridgeState::Active {
            logger::debug(&format!("Ignoring UnRegister in state {:?}", self.state));
            return HostStatus::Success;
        }

        self.state = BridgeState::Unregistering;
        if self.connected {
            self.engine.disconnect();
            self.connected = false;
        }
        self.engine_handle = None;
        self.session.stop();
        self.state = BridgeState::Unregistered;
        logger::debug("UnRegister completed");
        HostStatus::Success
    }

    fn add_process(
        &mut self,
        process_id: u32,
        module_name: &str,
        _registry_key: &str,
        _locale_id: u32,
    ) -> HostStatus {
        // Global client: per-application notifications carry nothing for us.
        logger::step(&format!(
            "AddProcess {} ({}) ignored",
            process_id, module_name
        ));
        HostStatus::Success
    }

    fn end_process(&mut self, process_id: u32) -> HostStatus {
        logger::step(&format!("EndProcess {} ignored", process_id));
        HostStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::REPAIR_MODULE_NAME;
    use pyhost_session::testing::{Call, FakeInterpreter};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct EngineLog {
        connects: Vec<u64>,
        disconnects: usize,
        displayed: Vec<(String, bool)>,
        initializing: Vec<bool>,
    }

    #[derive(Clone)]
    struct FakeEngine {
        accept: bool,
        log: Rc<RefCell<EngineLog>>,
    }

    impl FakeEngine {
        fn new(accept: bool) -> Self {
            Self {
                accept,
                log: Rc::default(),
            }
        }

        fn displayed_text(&self) -> String {
            self.log
                .borrow()
                .displayed
                .iter()
                .map(|(text, _)| text.as_str())
                .collect()
        }
    }

    impl HostEngine for FakeEngine {
        type Handle = u64;

        fn connect(&mut self, handle: &u64) -> bool {
            self.log.borrow_mut().connects.push(*handle);
            self.accept
        }

        fn disconnect(&mut self) {
            self.log.borrow_mut().disconnects += 1;
        }

        fn display_text(&self, text: &str, is_error: bool) {
            self.log
                .borrow_mut()
                .displayed
                .push((text.to_string(), is_error));
        }

        fn set_initializing(&mut self, initializing: bool) {
            self.log.borrow_mut().initializing.push(initializing);
        }
    }

    fn bridge(
        engine: &FakeEngine,
        interpreter: &FakeInterpreter,
    ) -> LifecycleBridge<FakeEngine, FakeInterpreter> {
        LifecycleBridge::new(engine.clone(), interpreter.clone(), BridgeOptions::default())
    }

    #[test]
    fn test_clean_register() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        let mut bridge = bridge(&engine, &interpreter);

        assert!(bridge.register(7).is_success());
        assert_eq!(bridge.state(), BridgeState::Active);
        assert!(bridge.is_connected());
        assert!(!bridge.is_initializing());
        assert_eq!(bridge.engine_handle(), Some(&7));
        assert!(bridge.session().has_startup());

        let log = engine.log.borrow();
        assert_eq!(log.connects, vec![7]);
        assert!(log.displayed.is_empty());
        assert_eq!(log.initializing, vec![true, false]);
        assert_eq!(
            interpreter.calls(),
            vec![
                Call::Initialize,
                Call::Execute(REPAIR_MODULE_NAME.to_string()),
                Call::Remove(REPAIR_MODULE_NAME.to_string()),
                Call::Release(REPAIR_MODULE_NAME.to_string()),
                Call::Import("startup".to_string()),
            ]
        );
        assert!(!interpreter.loaded().contains(REPAIR_MODULE_NAME));
    }

    #[test]
    fn test_startup_import_error_is_displayed() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new().fail_import(
            "startup",
            Some("Traceback (most recent call last):\nSyntaxError: invalid syntax"),
        );
        let mut bridge = bridge(&engine, &interpreter);

        assert!(bridge.register(1).is_success());
        assert_eq!(bridge.state(), BridgeState::Active);
        assert!(bridge.is_connected());
        assert!(!bridge.session().has_startup());

        let text = engine.displayed_text();
        assert!(text.starts_with("An exception occurred loading 'startup' module:\n"));
        assert!(text.contains("SyntaxError: invalid syntax"));
        assert!(engine.log.borrow().displayed.iter().take(2).all(|(_, e)| *e));
        assert!(interpreter.pending_error().is_none());
    }

    #[test]
    fn test_startup_failure_without_text_still_reported() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new().fail_import("startup", None);
        let mut bridge = bridge(&engine, &interpreter);

        assert!(bridge.register(1).is_success());
        assert_eq!(
            engine.log.borrow().displayed,
            vec![(
                "An exception occurred loading 'startup' module:\n".to_string(),
                true
            )]
        );
    }

    #[test]
    fn test_missing_registry_key_is_only_a_diagnostic() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new()
            .fail_execution(Some("FileNotFoundError: [WinError 2] The system cannot find the file specified"));
        let mut bridge = bridge(&engine, &interpreter);

        assert!(bridge.register(1).is_success());
        assert_eq!(bridge.state(), BridgeState::Active);
        assert!(bridge.session().has_startup());

        let text = engine.displayed_text();
        assert!(text.starts_with("An exception occurred during search path repair:\n"));
        assert!(text.contains("FileNotFoundError"));
        assert!(!text.contains("loading 'startup'"));
    }

    #[test]
    fn test_connect_failure_leaves_active_but_idle() {
        let engine = FakeEngine::new(false);
        let interpreter = FakeInterpreter::new();
        let mut bridge = bridge(&engine, &interpreter);

        assert!(bridge.register(3).is_success());
        assert_eq!(bridge.state(), BridgeState::Active);
        assert!(!bridge.is_connected());
        assert!(!bridge.session().has_startup());
        assert_eq!(interpreter.calls(), vec![Call::Initialize]);
        assert_eq!(
            engine.log.borrow().displayed,
            vec![("Failed to connect to the host engine\n".to_string(), true)]
        );

        assert!(bridge.unregister().is_success());
        assert_eq!(engine.log.borrow().disconnects, 0);
        assert_eq!(interpreter.count(&Call::Finalize), 1);
    }

    #[test]
    fn test_repair_can_be_disabled() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        let options = BridgeOptions {
            repair_search_path: false,
            ..BridgeOptions::default()
        };
        let mut bridge = LifecycleBridge::new(engine.clone(), interpreter.clone(), options);

        bridge.register(1);
        assert_eq!(
            interpreter.calls(),
            vec![Call::Initialize, Call::Import("startup".to_string())]
        );
    }

    #[test]
    fn test_unregister_tears_down_in_order() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        let mut bridge = bridge(&engine, &interpreter);
        bridge.register(1);

        assert!(bridge.unregister().is_success());
        assert_eq!(bridge.state(), BridgeState::Unregistered);
        assert!(!bridge.is_connected());
        assert!(bridge.engine_handle().is_none());
        assert_eq!(bridge.session().phase(), SessionPhase::Finalized);
        assert_eq!(engine.log.borrow().disconnects, 1);
        assert!(engine.log.borrow().displayed.is_empty());

        let calls = interpreter.calls();
        assert_eq!(
            &calls[calls.len() - 2..],
            &[Call::Release("startup".to_string()), Call::Finalize]
        );
    }

    #[test]
    fn test_stop_pairs_with_start_across_any_sequence() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        let mut bridge = bridge(&engine, &interpreter);

        assert!(bridge.unregister().is_success());
        bridge.register(1);
        bridge.register(2);
        bridge.unregister();
        bridge.unregister();
        bridge.register(3);
        drop(bridge);

        assert_eq!(interpreter.count(&Call::Initialize), 1);
        assert_eq!(interpreter.count(&Call::Finalize), 1);
        assert_eq!(engine.log.borrow().connects, vec![1]);
        assert_eq!(engine.log.borrow().disconnects, 1);
    }

    #[test]
    fn test_drop_without_unregister_finalizes() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        {
            let mut bridge = bridge(&engine, &interpreter);
            bridge.register(1);
        }
        assert_eq!(interpreter.count(&Call::Finalize), 1);
    }

    #[test]
    fn test_process_notifications_are_noops() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        let mut bridge = bridge(&engine, &interpreter);

        assert!(bridge.add_process(10, "notepad.exe", "", 1033).is_success());
        bridge.register(1);
        let calls_before = interpreter.calls();

        for pid in 0..5 {
            assert!(bridge
                .add_process(pid, "notepad.exe", r"Software\App", 1033)
                .is_success());
            assert!(bridge.end_process(pid).is_success());
        }

        assert_eq!(bridge.state(), BridgeState::Active);
        assert_eq!(interpreter.calls(), calls_before);
        assert!(engine.log.borrow().displayed.is_empty());
        assert_eq!(engine.log.borrow().disconnects, 0);
    }

    #[test]
    fn test_reload_reimports_in_place() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        let mut bridge = bridge(&engine, &interpreter);

        assert!(!bridge.reload());
        bridge.register(1);
        assert!(bridge.reload());
        assert!(bridge.reload());

        assert_eq!(interpreter.count(&Call::Reload("startup".to_string())), 2);
        assert!(bridge.session().has_startup());
        assert_eq!(engine.log.borrow().connects, vec![1]);
        assert_eq!(engine.log.borrow().disconnects, 0);
    }

    #[test]
    fn test_reload_without_startup_module() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new().fail_import("startup", Some("ImportError: x"));
        let mut bridge = bridge(&engine, &interpreter);
        bridge.register(1);

        assert!(!bridge.reload());
        assert_eq!(interpreter.count(&Call::Reload("startup".to_string())), 0);
    }

    #[test]
    fn test_reload_failure_is_displayed_and_keeps_module() {
        let engine = FakeEngine::new(true);
        let interpreter = FakeInterpreter::new();
        let mut bridge = bridge(&engine, &interpreter);
        bridge.register(1);

        let _ = interpreter
            .clone()
            .fail_import("startup", Some("NameError: name 'x' is not defined"));
        assert!(!bridge.reload());

        let text = engine.displayed_text();
        assert!(text.starts_with("An exception occurred reloading 'startup' module:\n"));
        assert!(text.contains("NameError: name 'x' is not defined"));
        assert!(bridge.session().has_startup());
        assert_eq!(bridge.state(), BridgeState::Active);
    }
}
