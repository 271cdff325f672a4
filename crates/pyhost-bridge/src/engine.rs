/// Result of every host-facing call.
///
/// The host has no recovery path for a failed lifecycle call, so the
/// bridge only ever answers `Success`; problems go to the display sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Success,
}

impl HostStatus {
    pub fn is_success(self) -> bool {
        matches!(self, HostStatus::Success)
    }
}

/// What the bridge consumes from the host's engine
pub trait HostEngine {
    /// Opaque reference supplied by the host at Register
    type Handle;

    fn connect(&mut self, handle: &Self::Handle) -> bool;

    fn disconnect(&mut self);

    /// Show `text` to the user; `is_error` marks it as an error annotation
    fn display_text(&self, text: &str, is_error: bool);

    /// Told while the startup module is being imported
    fn set_initializing(&mut self, _initializing: bool) {}
}

/// The plug-in contract the host drives
pub trait HostComponent {
    type Handle;

    fn register(&mut self, handle: Self::Handle) -> HostStatus;

    fn unregister(&mut self) -> HostStatus;

    fn add_process(
        &mut self,
        process_id: u32,
        module_name: &str,
        registry_key: &str,
        locale_id: u32,
    ) -> HostStatus;

    fn end_process(&mut self, process_id: u32) -> HostStatus;
}
