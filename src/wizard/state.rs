/// Wizard state
///
/// The aggregate owned by the state store: totals and progress, the ordered
/// step flags, the caller's payload and the error log.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::steps::StepFlags;

/// User payload shared across steps
///
/// Updates are always a shallow merge of a patch into the current value.
pub trait Payload:
    Clone + Default + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Partial value merged by [`Payload::merge`]
    type Patch: std::fmt::Debug + Send + 'static;

    /// Shallow merge: top-level entries of `patch` replace entries of `self`
    fn merge(&mut self, patch: Self::Patch);
}

/// Default payload: a JSON object
pub type JsonPayload = Map<String, Value>;

impl Payload for JsonPayload {
    type Patch = Map<String, Value>;

    fn merge(&mut self, patch: Self::Patch) {
        for (key, value) in patch {
            self.insert(key, value);
        }
    }
}

/// Totals and derived progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralInfo {
    pub total_steps: usize,
    pub current_progress: f64,
    pub completed_progress: f64,
    pub can_access_progress: f64,
}

impl GeneralInfo {
    /// Fresh totals for `total_steps` steps, all progress zero
    pub fn reset(total_steps: usize) -> Self {
        Self {
            total_steps,
            ..Self::default()
        }
    }

    /// Recompute every progress value from the step sequence
    ///
    /// `position` is the numerator of the positional progress.
    pub fn recompute(steps: &[StepFlags], position: usize) -> Self {
        let total = steps.len();
        let completed = steps.iter().filter(|s| s.is_completed).count();
        let accessible = steps.iter().filter(|s| s.can_access).count();

        Self {
            total_steps: total,
            current_progress: ratio(position, total),
            completed_progress: ratio(completed, total),
            can_access_progress: ratio(accessible, total),
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64).min(1.0)
}

/// Entry of the error log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepError {
    pub step_index: usize,
    pub message: String,
}

/// Complete stepper state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(serialize = "P: Serialize", deserialize = "P: DeserializeOwned + Default")
)]
pub struct StepperState<P = JsonPayload> {
    #[serde(default)]
    pub general_info: GeneralInfo,
    #[serde(default)]
    pub steps: Vec<StepFlags>,
    #[serde(default)]
    pub general_state: P,
    #[serde(default)]
    pub errors: Vec<StepError>,
}

impl<P: Default> StepperState<P> {
    /// Empty state, before `set_steps_info`
    pub fn new() -> Self {
        Self {
            general_info: GeneralInfo::default(),
            steps: Vec::new(),
            general_state: P::default(),
            errors: Vec::new(),
        }
    }
}

impl<P: Default> Default for StepperState<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> StepperState<P> {
    /// Get total number of steps
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Check whether an identical error is already logged
    pub fn has_error(&self, step_index: usize, message: &str) -> bool {
        self.errors
            .iter()
            .any(|e| e.step_index == step_index && e.message == message)
    }

    /// Number of completed steps
    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps(flags: &[(bool, bool)]) -> Vec<StepFlags> {
        flags
            .iter()
            .enumerate()
            .map(|(i, (access, completed))| {
                let mut step = StepFlags::new(format!("step-{i}"));
                step.can_access = *access;
                step.is_completed = *completed;
                step
            })
            .collect()
    }

    #[test]
    fn test_new_state_is_empty() {
        let state: StepperState = StepperState::new();
        assert_eq!(state.total_steps(), 0);
        assert_eq!(state.general_info, GeneralInfo::default());
        assert!(state.general_state.is_empty());
        assert!(state.errors.is_empty());
    }

    #[test]
    fn test_progress_calculation() {
        let steps = steps(&[(true, true), (true, false), (false, false), (false, false)]);
        let info = GeneralInfo::recompute(&steps, 1);

        assert_eq!(info.total_steps, 4);
        assert_eq!(info.current_progress, 0.25);
        assert_eq!(info.completed_progress, 0.25);
        assert_eq!(info.can_access_progress, 0.5);
    }

    #[test]
    fn test_progress_with_no_steps() {
        let info = GeneralInfo::recompute(&[], 3);
        assert_eq!(info, GeneralInfo::default());
    }

    #[test]
    fn test_json_payload_merge_is_shallow() {
        let mut payload: JsonPayload = serde_json::from_value(json!({
            "user": { "name": "Ada", "email": "ada@example.com" },
            "plan": "free"
        }))
        .unwrap();

        let patch: JsonPayload = serde_json::from_value(json!({
            "user": { "name": "Grace" }
        }))
        .unwrap();
        payload.merge(patch);

        // Nested objects are replaced, not merged
        assert_eq!(payload["user"], json!({ "name": "Grace" }));
        assert_eq!(payload["plan"], "free");
    }

    #[test]
    fn test_has_error() {
        let mut state: StepperState = StepperState::new();
        state.errors.push(StepError {
            step_index: 0,
            message: "locked".to_string(),
        });

        assert!(state.has_error(0, "locked"));
        assert!(!state.has_error(1, "locked"));
        assert!(!state.has_error(0, "other"));
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let mut state: StepperState = StepperState::new();
        state.steps = steps(&[(true, false)]);
        state.general_info = GeneralInfo::recompute(&state.steps, 0);

        let value = serde_json::to_value(&state).unwrap();
        assert!(value.get("generalInfo").is_some());
        assert!(value.get("generalState").is_some());
        assert_eq!(value["generalInfo"]["totalSteps"], 1);
        assert_eq!(value["steps"][0]["canAccess"], true);
    }
}
