use sysinfo::{Pid, ProcessesToUpdate, System};

/// Samples the resident memory of the current process.
pub struct MemoryProbe {
    system: System,
    pid: Option<Pid>,
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Resident memory in bytes, or 0 when the platform cannot report it.
    pub fn sample(&mut self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system.process(pid).map_or(0, |process| process.memory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sample_reports_current_process() {
        let mut probe = MemoryProbe::new();
        assert!(probe.pid.is_some());
        assert!(probe.sample() > 0);
        assert!(probe.sample() > 0);
    }
}
