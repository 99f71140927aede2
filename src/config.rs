use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::wizard::steps::{FlagPatch, StepDefinition};

/// Flag overrides applied on one kind of move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransitionPolicy {
    /// Overrides for the step being left
    pub current_step: FlagPatch,

    /// Overrides for the step being entered
    #[serde(alias = "nextStep", alias = "prevStep")]
    pub destination_step: FlagPatch,
}

impl TransitionPolicy {
    pub fn new(current_step: FlagPatch, destination_step: FlagPatch) -> Self {
        Self {
            current_step,
            destination_step,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoToStepValidation {
    /// Forward jumps require the destination's `canAccess` flag
    pub can_access: bool,
}

impl Default for GoToStepValidation {
    fn default() -> Self {
        Self { can_access: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Validations {
    pub go_to_step: GoToStepValidation,
}

/// Navigation transition policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationConfig {
    pub validations: Validations,
    pub next: TransitionPolicy,
    pub prev: TransitionPolicy,
    pub go_to_step: TransitionPolicy,

    /// Persist every committed state to durable storage
    pub save_local_storage: bool,
}

impl NavigationConfig {
    /// Shallow merge: every field present in `update` replaces the live one
    pub fn merge(&mut self, update: NavigationConfigUpdate) {
        if let Some(validations) = update.validations {
            self.validations = validations;
        }
        if let Some(next) = update.next {
            self.next = next;
        }
        if let Some(prev) = update.prev {
            self.prev = prev;
        }
        if let Some(go_to_step) = update.go_to_step {
            self.go_to_step = go_to_step;
        }
        if let Some(save) = update.save_local_storage {
            self.save_local_storage = save;
        }
    }

    /// Whether forward jumps are checked against `canAccess`
    pub fn validates_access(&self) -> bool {
        self.validations.go_to_step.can_access
    }
}

/// Partial navigation config for `update_config`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Validations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<TransitionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<TransitionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_to_step: Option<TransitionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_local_storage: Option<bool>,
}

impl NavigationConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_local_storage(mut self, enabled: bool) -> Self {
        self.save_local_storage = Some(enabled);
        self
    }

    pub fn validate_access(mut self, enabled: bool) -> Self {
        self.validations = Some(Validations {
            go_to_step: GoToStepValidation {
                can_access: enabled,
            },
        });
        self
    }

    pub fn next(mut self, policy: TransitionPolicy) -> Self {
        self.next = Some(policy);
        self
    }

    pub fn prev(mut self, policy: TransitionPolicy) -> Self {
        self.prev = Some(policy);
        self
    }

    pub fn go_to_step(mut self, policy: TransitionPolicy) -> Self {
        self.go_to_step = Some(policy);
        self
    }
}

/// Setup file: step definitions plus the navigation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepperConfig {
    #[serde(default)]
    pub steps: Vec<StepDefinition>,

    #[serde(flatten)]
    pub navigation: NavigationConfig,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                StepDefinition::new("Account").accessible(),
                StepDefinition::new("Profile"),
                StepDefinition::new("Preferences").optional(),
                StepDefinition::new("Review"),
            ],
            navigation: NavigationConfig {
                save_local_storage: true,
                ..NavigationConfig::default()
            },
        }
    }
}

impl StepperConfig {
    /// Load configuration from `path`, creating a default file if missing
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let config = Self::load(path)?;
            tracing::info!("Loaded stepper config from: {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::info!("Created default stepper config at: {}", path.display());
            Ok(config)
        }
    }

    /// Load configuration from `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let config: StepperConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |e: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: e,
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_failed(Box::new(e)))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(Box::new(e)))?;
        fs::write(path, json).map_err(|e| save_failed(Box::new(e)))?;

        Ok(())
    }

    /// Reject configs the stepper cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::Invalid("at least one step is required".to_string()));
        }

        if let Some(step) = self.steps.iter().find(|s| s.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "step names must not be empty (got {:?})",
                step.name
            )));
        }

        Ok(())
    }

    /// Get the default config file path in the platform config directory
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("stepper-state").join("stepper.json"))
            .ok_or(ConfigError::NoConfigDirectory)
    }
}
