//! Terminal stand-in for the host engine

use colored::Colorize;
use pyhost_bridge::HostEngine;
use pyhost_logger as logger;
use std::io::Write;

/// Engine that "connects" to a named console and prints display text.
///
/// An empty engine name refuses the connection, which is handy for
/// watching how the bridge behaves when Register cannot reach its host.
#[derive(Debug, Default)]
pub struct ConsoleEngine {
    connected_to: Option<String>,
    initializing: bool,
}

impl ConsoleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected_to(&self) -> Option<&str> {
        self.connected_to.as_deref()
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing
    }
}

impl HostEngine for ConsoleEngine {
    type Handle = String;

    fn connect(&mut self, handle: &String) -> bool {
        if handle.trim().is_empty() {
            logger::debug("Console engine refused an empty engine name");
            return false;
        }
        logger::debug(&format!("Console engine connected to '{}'", handle));
        self.connected_to = Some(handle.clone());
        true
    }

    fn disconnect(&mut self) {
        if let Some(name) = self.connected_to.take() {
            logger::debug(&format!("Console engine disconnected from '{}'", name));
        }
    }

    fn display_text(&self, text: &str, is_error: bool) {
        let mut stdout = std::io::stdout().lock();
        let _ = if is_error {
            write!(stdout, "{}", text.red())
        } else {
            write!(stdout, "{}", text)
        };
        let _ = stdout.flush();
    }

    fn set_initializing(&mut self, initializing: bool) {
        self.initializing = initializing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_disconnect() {
        let mut engine = ConsoleEngine::new();
        assert!(!engine.connect(&"  ".to_string()));
        assert!(engine.connected_to().is_none());

        assert!(engine.connect(&"console".to_string()));
        assert_eq!(engine.connected_to(), Some("console"));

        engine.disconnect();
        assert!(engine.connected_to().is_none());
    }

    #[test]
    fn test_initializing_flag() {
        let mut engine = ConsoleEngine::new();
        engine.set_initializing(true);
        assert!(engine.is_initializing());
        engine.set_initializing(false);
        assert!(!engine.is_initializing());
    }
}
