//! Process-memory reporting
//!
//! The original symptom under investigation is unbounded memory growth while
//! draining frames, so the drain loop periodically samples and logs the
//! process's resident set. Sampling reads `/proc/self/status` and is only
//! meaningful on Linux; elsewhere the fields stay `None`.

use tracing::info;

/// A point-in-time sample of process memory usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryReport {
    /// Resident set size in bytes
    pub rss_bytes: Option<u64>,
    /// Virtual memory size in bytes
    pub vm_size_bytes: Option<u64>,
}

impl MemoryReport {
    /// Sample the current process
    pub fn sample() -> Self {
        #[cfg(target_os = "linux")]
        {
            match std::fs::read_to_string("/proc/self/status") {
                Ok(status) => parse_status(&status),
                Err(_) => Self::default(),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            Self::default()
        }
    }

    /// Emit the sample as a diagnostic log line
    pub fn log(&self) {
        match self.rss_bytes {
            Some(rss) => info!(
                rss_mib = rss / (1024 * 1024),
                vm_size_mib = self.vm_size_bytes.map(|v| v / (1024 * 1024)),
                "process memory report"
            ),
            None => info!("process memory report unavailable on this platform"),
        }
    }
}

/// Parse the `VmRSS`/`VmSize` lines of a `/proc/<pid>/status` blob
fn parse_status(status: &str) -> MemoryReport {
    let mut report = MemoryReport::default();
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            report.rss_bytes = parse_kib(rest);
        } else if let Some(rest) = line.strip_prefix("VmSize:") {
            report.vm_size_bytes = parse_kib(rest);
        }
    }
    report
}

fn parse_kib(rest: &str) -> Option<u64> {
    rest.trim()
        .strip_suffix("kB")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|kib| kib * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_extracts_rss_and_size() {
        let status = "Name:\troomprobe\nVmSize:\t  123456 kB\nVmRSS:\t    4096 kB\nThreads:\t8\n";
        let report = parse_status(status);
        assert_eq!(report.rss_bytes, Some(4096 * 1024));
        assert_eq!(report.vm_size_bytes, Some(123456 * 1024));
    }

    #[test]
    fn test_parse_status_tolerates_missing_lines() {
        let report = parse_status("Name:\troomprobe\n");
        assert_eq!(report, MemoryReport::default());
    }
}
