//! Action codes and the field changes each one performs.

use crate::errors::{ActionFailure, BatchError};
use crate::selector::Selector;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// A worklist action code, parsed once per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Hand the request to another agent
    Delegate,
    ChangeClassification,
    ChangeGroup,
    ChangeLocation,
    ChangeDate,
    /// Move to another group and agent in one edit
    ChangeDelegate,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Delegate,
        Action::ChangeClassification,
        Action::ChangeGroup,
        Action::ChangeLocation,
        Action::ChangeDate,
        Action::ChangeDelegate,
    ];

    /// Parse a worklist action code. Case and surrounding blanks are ignored.
    pub fn parse(code: &str) -> Result<Action, ActionFailure> {
        let normalized = code.trim().to_lowercase();
        let action = match normalized.as_str() {
            "delegar" | "delegate" => Action::Delegate,
            "mudar class" | "mudar classificação" | "mudar classificacao"
            | "change classification" => Action::ChangeClassification,
            "mudar grupo" | "change group" => Action::ChangeGroup,
            "mudar local" | "change location" => Action::ChangeLocation,
            "mudar data" | "change date" => Action::ChangeDate,
            "mudar delegado" | "change delegate" => Action::ChangeDelegate,
            _ => return Err(ActionFailure::UnsupportedAction(code.trim().to_string())),
        };
        Ok(action)
    }

    /// Key used for this action in `ACTION_SPECS`.
    pub fn key(&self) -> &'static str {
        match self {
            Action::Delegate => "delegate",
            Action::ChangeClassification => "change_classification",
            Action::ChangeGroup => "change_group",
            Action::ChangeLocation => "change_location",
            Action::ChangeDate => "change_date",
            Action::ChangeDelegate => "change_delegate",
        }
    }

    fn from_key(key: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.key() == key)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a field on the edit surface takes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Type-ahead dropdown: open, type, confirm top match
    Dropdown,
    /// Plain input: clear and type
    TextField,
}

/// One field an action changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Dropdown opener or the input itself
    pub target: Selector,
    /// Key into the mapping table
    pub field_type: String,
    pub kind: ActionKind,
    /// 1-based `ModN` column the value comes from
    pub modifier: usize,
}

impl FieldSpec {
    fn new(target: &str, field_type: &str, kind: ActionKind, modifier: usize) -> Self {
        Self {
            target: Selector::from(target),
            field_type: field_type.to_string(),
            kind,
            modifier,
        }
    }
}

/// The fields an action changes, in the order they are filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub fields: Vec<FieldSpec>,
}

/// Field override as written under `ACTION_SPECS` in the config.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldOverride {
    pub target: String,
    pub field_type: String,
    #[serde(default = "default_kind")]
    pub kind: ActionKind,
    #[serde(default = "default_modifier")]
    pub modifier: usize,
}

fn default_kind() -> ActionKind {
    ActionKind::Dropdown
}

fn default_modifier() -> usize {
    1
}

pub type SpecOverride = Vec<FieldOverride>;

/// Action -> fields table. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct ActionSpecs {
    specs: HashMap<Action, ActionSpec>,
}

impl Default for ActionSpecs {
    fn default() -> Self {
        use ActionKind::*;
        let group = || FieldSpec::new("button[data-id='grupoEditar']", "GRUPO", Dropdown, 1);
        let agent = |slot| {
            FieldSpec::new("button[data-id='agent_nameEditar']", "AGENTE", Dropdown, slot)
        };

        let specs = HashMap::from([
            (Action::Delegate, vec![agent(1)]),
            (
                Action::ChangeClassification,
                vec![FieldSpec::new(
                    "button[data-id^='editar_preenchimentoPadrao']",
                    "CLASSIFICACAO",
                    Dropdown,
                    1,
                )],
            ),
            (Action::ChangeGroup, vec![group()]),
            (
                Action::ChangeLocation,
                vec![FieldSpec::new("button[data-id='localEditar']", "LOCAL", Dropdown, 1)],
            ),
            (
                Action::ChangeDate,
                vec![FieldSpec::new("input[name='dataEditar']", "DATA", TextField, 1)],
            ),
            (Action::ChangeDelegate, vec![group(), agent(2)]),
        ])
        .into_iter()
        .map(|(action, fields)| (action, ActionSpec { fields }))
        .collect();

        Self { specs }
    }
}

impl ActionSpecs {
    /// Built-in table with per-action replacements from the config applied.
    pub fn with_overrides(overrides: HashMap<String, SpecOverride>) -> Result<Self, BatchError> {
        let mut table = Self::default();
        for (key, fields) in overrides {
            let action = Action::from_key(&key).ok_or_else(|| {
                BatchError::Configuration(format!("ACTION_SPECS: unknown action '{key}'"))
            })?;
            if fields.is_empty() {
                return Err(BatchError::Configuration(format!(
                    "ACTION_SPECS.{key} must list at least one field"
                )));
            }
            let mut specs = Vec::with_capacity(fields.len());
            for field in fields {
                let target = Selector::from(field.target.as_str());
                if let Selector::Invalid(reason) = &target {
                    return Err(BatchError::Configuration(format!(
                        "ACTION_SPECS.{key}: {reason}"
                    )));
                }
                if field.modifier == 0 {
                    return Err(BatchError::Configuration(format!(
                        "ACTION_SPECS.{key}: modifier columns are numbered from 1"
                    )));
                }
                specs.push(FieldSpec {
                    target,
                    field_type: field.field_type,
                    kind: field.kind,
                    modifier: field.modifier,
                });
            }
            table.specs.insert(action, ActionSpec { fields: specs });
        }
        Ok(table)
    }

    pub fn get(&self, action: Action) -> Option<&ActionSpec> {
        self.specs.get(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_and_space_insensitive() {
        assert_eq!(Action::parse("  Delegar ").unwrap(), Action::Delegate);
        assert_eq!(
            Action::parse("MUDAR CLASS").unwrap(),
            Action::ChangeClassification
        );
        assert_eq!(Action::parse("mudar grupo").unwrap(), Action::ChangeGroup);
        assert_eq!(Action::parse("change date").unwrap(), Action::ChangeDate);
    }

    #[test]
    fn test_unknown_action_is_explicit() {
        match Action::parse("cancelar") {
            Err(ActionFailure::UnsupportedAction(code)) => assert_eq!(code, "cancelar"),
            other => panic!("expected UnsupportedAction, got {other:?}"),
        }
        assert!(Action::parse("").is_err());
    }

    #[test]
    fn test_every_action_has_a_default_spec() {
        let specs = ActionSpecs::default();
        for action in Action::ALL {
            let spec = specs.get(action).unwrap();
            assert!(!spec.fields.is_empty(), "{action} has no fields");
        }
        let delegate = &specs.get(Action::ChangeDelegate).unwrap().fields;
        assert_eq!(delegate[0].field_type, "GRUPO");
        assert_eq!(delegate[1].field_type, "AGENTE");
        assert_eq!(delegate[1].modifier, 2);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let overrides: HashMap<String, SpecOverride> = serde_json::from_str(
            r##"{ "change_date": [
                { "target": "#novaData", "field_type": "DATA", "kind": "text_field" }
            ] }"##,
        )
        .unwrap();
        let specs = ActionSpecs::with_overrides(overrides).unwrap();
        let field = &specs.get(Action::ChangeDate).unwrap().fields[0];
        assert_eq!(field.target, Selector::Id("novaData".into()));
        assert_eq!(field.kind, ActionKind::TextField);
        assert_eq!(field.modifier, 1);
    }

    #[test]
    fn test_overrides_reject_unknown_actions() {
        let overrides: HashMap<String, SpecOverride> =
            serde_json::from_str(r##"{ "cancel": [ { "target": "#x", "field_type": "X" } ] }"##)
                .unwrap();
        assert!(ActionSpecs::with_overrides(overrides).is_err());
    }
}
