use crate::discovery::RunningApplicationCheck;

use log::trace;
use sysinfo::{Process, ProcessesToUpdate, System};

/// Scans the process table for the peer application by name.
#[derive(Debug, Clone)]
pub struct SysinfoRunningCheck {
    process_name: String,
}

impl SysinfoRunningCheck {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }
}

impl RunningApplicationCheck for SysinfoRunningCheck {
    fn is_running(&self) -> bool {
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        trace!("Scanning {} processes", sys.processes().len());

        let found = sys
            .processes()
            .values()
            .any(|p| matches_name(p, &self.process_name));

        trace!("Peer process '{}' running: {found}", self.process_name);
        found
    }
}

pub(crate) fn matches_name(process: &Process, name: &str) -> bool {
    if process.name().to_string_lossy() == name {
        return true;
    }

    process
        .exe()
        .and_then(|exe| exe.file_name())
        .is_some_and(|file_name| file_name.to_string_lossy() == name)
}
