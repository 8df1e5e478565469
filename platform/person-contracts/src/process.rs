//! Process provenance
//!
//! The original system derived producer/consumer identity from
//! process-wide statics. Here it is an explicit value constructed once in
//! `main` and passed by reference to whatever needs it.

/// Identity and environment of the running process.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    /// Service name (e.g. "person-api", "person-worker")
    pub service: String,
    /// Service version
    pub version: String,
    /// Host identity, used as the consumer identity in provenance rows
    pub host: String,
    /// Kernel/platform description
    pub kernel: String,
    /// Runtime description
    pub framework: String,
}

impl ProcessInfo {
    /// Capture provenance for the current process.
    ///
    /// Callers pass their own `env!("CARGO_PKG_NAME")` /
    /// `env!("CARGO_PKG_VERSION")` so the values describe the binary, not
    /// this library.
    pub fn capture(service: &str, version: &str) -> Self {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());

        Self {
            service: service.to_string(),
            version: version.to_string(),
            host,
            kernel: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            framework: "rust/tokio".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_fills_every_field() {
        let info = ProcessInfo::capture("person-worker", "1.2.3");

        assert_eq!(info.service, "person-worker");
        assert_eq!(info.version, "1.2.3");
        assert!(!info.host.is_empty());
        assert!(!info.kernel.is_empty());
        assert!(!info.framework.is_empty());
    }
}
