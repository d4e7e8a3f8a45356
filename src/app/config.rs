//! Application configuration
//!
//! Settings that shape the process rather than a consensus run.

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Explicit log filter, taking precedence over `verbose`
    pub log_filter: Option<String>,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            log_filter: None,
        }
    }

    /// Use `filter` instead of the verbosity-derived level
    pub fn with_log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> String {
        if let Some(filter) = &self.log_filter {
            return filter.clone();
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,tokio=debug",
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(AppConfig::new(0).log_level(), "info");
        assert_eq!(AppConfig::new(1).log_level(), "debug");
        assert_eq!(AppConfig::new(2).log_level(), "trace");
        assert_eq!(AppConfig::new(5).log_level(), "trace,tokio=debug");
    }

    #[test]
    fn test_filter_overrides_verbosity() {
        let config = AppConfig::new(2).with_log_filter(Some("mask_consensus=warn".into()));
        assert_eq!(config.log_level(), "mask_consensus=warn");

        let blank = AppConfig::new(1).with_log_filter(Some("  ".into()));
        assert_eq!(blank.log_level(), "debug");
    }
}
