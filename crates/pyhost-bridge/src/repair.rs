//! One-shot search-path repair run during Register
//!
//! Python installs are supposed to pick up extra `PythonPath` registry
//! entries when the interpreter builds `sys.path`, but embedded runtimes
//! often do not. The snippet below reads the bridge's entry for the
//! running interpreter version and appends it to `sys.path` by hand.
//! Any failure (no `winreg`, missing key, access denied, bad value) is a
//! diagnostic, never an error.

use pyhost_logger as logger;
use pyhost_session::{Interpreter, Session};

/// Name the snippet runs under; removed from `sys.modules` afterwards
pub const REPAIR_MODULE_NAME: &str = "_pyhost_search_path";

/// Outcome of one repair attempt, scoped to a single Register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub succeeded: bool,
    pub diagnostic: Option<String>,
}

/// Build the repair snippet for the registry subkey `search_path_key`
pub fn repair_snippet(search_path_key: &str) -> String {
    let escaped = search_path_key.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"import sys
import winreg

hive = winreg.HKEY_LOCAL_MACHINE
key = "Software\\Python\\PythonCore\\" + sys.winver + "\\PythonPath\\{key}"
flags = winreg.KEY_READ | winreg.KEY_WOW64_32KEY
search_key = winreg.OpenKeyEx(hive, key, access=flags)
try:
    core_path = winreg.QueryValue(search_key, "")
    if not isinstance(core_path, str) or not core_path:
        raise ValueError("empty search path in registry key " + key)
    sys.path.append(core_path)
finally:
    winreg.CloseKey(search_key)
"#,
        key = escaped
    )
}

/// Run the repair snippet as an ephemeral module.
///
/// On success the module entry is dropped from the registry right away.
/// On failure the pending error is drained into the outcome so nothing
/// is left for a later failure to be confused with.
pub fn add_core_to_search_path<I: Interpreter>(
    session: &mut Session<I>,
    search_path_key: &str,
) -> RepairOutcome {
    let source = repair_snippet(search_path_key);
    match session.execute_as_ephemeral_module(&source, REPAIR_MODULE_NAME) {
        Ok(module) => {
            if !session.remove_module(REPAIR_MODULE_NAME) {
                logger::debug(&format!(
                    "{} was not in the module registry after running",
                    REPAIR_MODULE_NAME
                ));
            }
            session.release_module(module);
            logger::debug("Search path repair succeeded");
            RepairOutcome {
                succeeded: true,
                diagnostic: None,
            }
        }
        Err(e) => {
            logger::debug(&format!("Search path repair failed: {}", e));
            RepairOutcome {
                succeeded: false,
                diagnostic: session.extract_last_error(),
            }
        }
    }
}
