use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_iterations() -> u32 {
    200
}
const fn default_tol_gap_abs() -> f64 {
    1e-8
}
const fn default_tol_gap_rel() -> f64 {
    1e-8
}
const fn default_tol_feas() -> f64 {
    1e-8
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

/// QP backend configuration shared by every priority level's solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Maximum iterations per QP solve (default: 200).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Absolute duality gap tolerance (default: 1e-8).
    #[serde(default = "default_tol_gap_abs")]
    pub tol_gap_abs: f64,

    /// Relative duality gap tolerance (default: 1e-8).
    #[serde(default = "default_tol_gap_rel")]
    pub tol_gap_rel: f64,

    /// Feasibility tolerance (default: 1e-8). Frozen priority rows are
    /// satisfied to this tolerance.
    #[serde(default = "default_tol_feas")]
    pub tol_feas: f64,

    /// Enable backend iteration logging.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tol_gap_abs: default_tol_gap_abs(),
            tol_gap_rel: default_tol_gap_rel(),
            tol_feas: default_tol_feas(),
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroMaxIterations);
        }
        for (field, value) in [
            ("tol_gap_abs", self.tol_gap_abs),
            ("tol_gap_rel", self.tol_gap_rel),
            ("tol_feas", self.tol_feas),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::InvalidTolerance { field, value });
            }
        }
        Ok(())
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.max_iterations, 200);
        assert!((cfg.tol_gap_abs - 1e-8).abs() < f64::EPSILON);
        assert!((cfg.tol_gap_rel - 1e-8).abs() < f64::EPSILON);
        assert!((cfg.tol_feas - 1e-8).abs() < f64::EPSILON);
        assert!(!cfg.verbose);
    }

    #[test]
    fn validate_ok() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_max_iterations() {
        let cfg = SolverConfig {
            max_iterations: 0,
            ..SolverConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroMaxIterations));
    }

    #[test]
    fn validate_negative_tolerance() {
        let cfg = SolverConfig {
            tol_feas: -1e-8,
            ..SolverConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidTolerance {
                field: "tol_feas",
                ..
            }
        ));
    }

    #[test]
    fn toml_deserialization() {
        let toml_str = r"
            max_iterations = 50
            tol_gap_abs = 1e-6
            tol_gap_rel = 1e-6
            tol_feas = 1e-7
            verbose = true
        ";
        let cfg: SolverConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.max_iterations, 50);
        assert!((cfg.tol_feas - 1e-7).abs() < f64::EPSILON);
        assert!(cfg.verbose);
    }

    #[test]
    fn toml_defaults_applied() {
        let cfg: SolverConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, SolverConfig::default());
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = std::env::temp_dir().join("taskpri_test_solver_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("solver.toml");
        std::fs::write(
            &path,
            r"
            max_iterations = 120
            tol_feas = 1e-9
        ",
        )
        .unwrap();

        let cfg = SolverConfig::from_file(&path).unwrap();
        assert_eq!(cfg.max_iterations, 120);
        assert!((cfg.tol_feas - 1e-9).abs() < f64::EPSILON);

        // Cleanup
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_invalid_rejected() {
        let dir = std::env::temp_dir().join("taskpri_test_solver_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "max_iterations = 0").unwrap();

        assert!(SolverConfig::from_file(&path).is_err());

        // Cleanup
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_not_found() {
        assert!(SolverConfig::from_file("/nonexistent/solver.toml").is_err());
    }
}
