/// Wizard step definitions
///
/// Per-step flags, the setup-time step definitions and the partial flag
/// updates applied by the action layer and the transition policies.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StepperError;

/// Flags of a single step
///
/// The name is fixed at creation; only the four boolean flags change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFlags {
    name: String,
    #[serde(default)]
    pub can_access: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub is_completed: bool,
}

impl StepFlags {
    /// Create a step with every flag cleared
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            can_access: false,
            can_edit: false,
            is_optional: false,
            is_completed: false,
        }
    }

    /// Get step name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Step definition supplied once at setup
///
/// Unknown fields (titles, descriptions, anything the presentation layer
/// carries along) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            can_access: None,
            can_edit: None,
            is_optional: None,
            is_completed: None,
        }
    }

    pub fn accessible(mut self) -> Self {
        self.can_access = Some(true);
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = Some(true);
        self
    }

    /// Build the initial flags, unspecified flags default to false
    pub fn to_flags(&self) -> StepFlags {
        StepFlags {
            name: self.name.clone(),
            can_access: self.can_access.unwrap_or(false),
            can_edit: self.can_edit.unwrap_or(false),
            is_optional: self.is_optional.unwrap_or(false),
            is_completed: self.is_completed.unwrap_or(false),
        }
    }
}

/// Partial flag update
///
/// `None` leaves the flag unchanged. Deserializing from JSON rejects any key
/// outside the four flag names, `name` included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct FlagPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_edit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl FlagPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_access(mut self, value: bool) -> Self {
        self.can_access = Some(value);
        self
    }

    pub fn can_edit(mut self, value: bool) -> Self {
        self.can_edit = Some(value);
        self
    }

    pub fn is_optional(mut self, value: bool) -> Self {
        self.is_optional = Some(value);
        self
    }

    pub fn is_completed(mut self, value: bool) -> Self {
        self.is_completed = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse a patch from dynamic JSON, validating every key
    pub fn from_value(value: &Value) -> Result<Self, StepperError> {
        let Some(map) = value.as_object() else {
            return Err(StepperError::InvalidField {
                field: value.to_string(),
            });
        };

        let mut patch = Self::default();
        for (key, raw) in map {
            let slot = match key.as_str() {
                "canAccess" => &mut patch.can_access,
                "canEdit" => &mut patch.can_edit,
                "isOptional" => &mut patch.is_optional,
                "isCompleted" => &mut patch.is_completed,
                _ => return Err(StepperError::InvalidField { field: key.clone() }),
            };

            *slot = match raw {
                Value::Null => None,
                Value::Bool(b) => Some(*b),
                _ => {
                    return Err(StepperError::InvalidField {
                        field: format!("{key}={raw}"),
                    })
                }
            };
        }

        Ok(patch)
    }

    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: FlagPatch) -> FlagPatch {
        FlagPatch {
            can_access: self.can_access.or(fallback.can_access),
            can_edit: self.can_edit.or(fallback.can_edit),
            is_optional: self.is_optional.or(fallback.is_optional),
            is_completed: self.is_completed.or(fallback.is_completed),
        }
    }

    /// Shallow per-field override of `flags`
    pub fn apply(&self, flags: &StepFlags) -> StepFlags {
        StepFlags {
            name: flags.name.clone(),
            can_access: self.can_access.unwrap_or(flags.can_access),
            can_edit: self.can_edit.unwrap_or(flags.can_edit),
            is_optional: self.is_optional.unwrap_or(flags.is_optional),
            is_completed: self.is_completed.unwrap_or(flags.is_completed),
        }
    }
}

impl TryFrom<Value> for FlagPatch {
    type Error = StepperError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

/// Flag update addressed to one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdate {
    pub step_index: usize,
    pub data: FlagPatch,
}

impl StepUpdate {
    pub fn new(step_index: usize, data: FlagPatch) -> Self {
        Self { step_index, data }
    }
}

/// Read-only view of the current step for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStep {
    #[serde(flatten)]
    pub flags: StepFlags,
    pub index: usize,
    pub is_first_step: bool,
    pub is_last_step: bool,
}
