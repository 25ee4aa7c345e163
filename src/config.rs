/// Resolves the open question in `spec.md` §9 ("development-only date validation") as an
/// explicit, inspectable value rather than a silent `cfg!` check buried in the time parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeValidationMode {
    /// Reject any date string that isn't exactly `YYYY-MM-DD` (four digits, dash, two
    /// digits, dash, two digits) before attempting to parse it.
    Strict,
    /// Accept any `-`-separated triple of integers, trimming surrounding whitespace.
    Forgiving,
}

/// In-memory configuration for a [`crate::data_layer::DataLayer`]. No file or wire format
/// backs this record — `spec.md` §6 is explicit that this layer has neither.
#[derive(Clone, Copy, Debug)]
pub struct ChartCoreConfig {
    pub time_validation: TimeValidationMode,
}

impl ChartCoreConfig {
    pub fn new(time_validation: TimeValidationMode) -> Self {
        Self { time_validation }
    }
}

impl Default for ChartCoreConfig {
    /// Strict under `debug_assertions`, forgiving otherwise. A host that wants strict
    /// validation in a release build (e.g. to validate data at an ingestion boundary) can
    /// still construct the config explicitly.
    fn default() -> Self {
        let time_validation = if cfg!(debug_assertions) {
            TimeValidationMode::Strict
        } else {
            TimeValidationMode::Forgiving
        };
        Self { time_validation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_matches_build_profile() {
        let config = ChartCoreConfig::default();
        if cfg!(debug_assertions) {
            assert_eq!(config.time_validation, TimeValidationMode::Strict);
        } else {
            assert_eq!(config.time_validation, TimeValidationMode::Forgiving);
        }
    }
}
