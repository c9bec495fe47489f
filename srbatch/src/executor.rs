//! Opens a record's edit surface and applies one action to it.

use crate::action::{Action, ActionKind, FieldSpec};
use crate::config::Config;
use crate::errors::{ActionExecutionError, ActionFailure, AutomationError};
use crate::interaction::Interactor;
use crate::session::Session;
use crate::worklist::{RowStatus, WorklistRow};
use tracing::{debug, instrument};

/// A field change with its value already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange<'a> {
    pub field: &'a FieldSpec,
    pub value: String,
}

pub struct ActionExecutor<'a> {
    interactor: &'a Interactor,
    config: &'a Config,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(interactor: &'a Interactor, config: &'a Config) -> Self {
        Self { interactor, config }
    }

    /// Parse the row's action and resolve every value it needs.
    ///
    /// Touches no browser state, so an unsupported action fails before any
    /// navigation happens.
    pub fn plan(
        &self,
        row: &WorklistRow,
    ) -> Result<(Action, Vec<FieldChange<'a>>), ActionFailure> {
        let action = Action::parse(&row.action)?;
        let spec = self
            .config
            .actions
            .get(action)
            .ok_or_else(|| ActionFailure::UnsupportedAction(row.action.clone()))?;
        let changes = spec
            .fields
            .iter()
            .map(|field| FieldChange {
                field,
                value: self
                    .config
                    .mappings
                    .resolve(row.modifier(field.modifier), &field.field_type),
            })
            .collect();
        Ok((action, changes))
    }

    /// Apply the row's action to its record and wait for the portal to confirm.
    #[instrument(skip(self, session, row), fields(record = %row.id, action = %row.action))]
    pub async fn apply_action(
        &self,
        session: &Session,
        row: &WorklistRow,
    ) -> Result<RowStatus, ActionExecutionError> {
        let record_id = row.id.as_str();
        let fail = |step: &'static str| {
            move |source: AutomationError| {
                ActionExecutionError::new(record_id, ActionFailure::Step { step, source })
            }
        };

        let (action, changes) = self
            .plan(row)
            .map_err(|e| ActionExecutionError::new(record_id, e))?;
        let timeouts = self.interactor.timeouts();
        let selectors = &self.config.selectors;

        session
            .driver()
            .navigate(&self.config.record_url(record_id))
            .await
            .map_err(fail("open record"))?;
        self.interactor
            .wait_for_stabilized(timeouts.spinner_probe, timeouts.long)
            .await
            .map_err(fail("page load"))?;

        let edit = self
            .interactor
            .locator(selectors.edit_button.as_str())
            .wait_clickable(Some(timeouts.short))
            .await
            .map_err(fail("edit button"))?;
        self.interactor
            .robust_click(&edit)
            .await
            .map_err(fail("edit button"))?;

        let surface = self
            .interactor
            .locator(selectors.edit_surface.as_str())
            .wait_visible(Some(timeouts.short))
            .await
            .map_err(fail("edit surface"))?;

        for change in &changes {
            debug!(
                "{}: {} -> '{}'",
                action, change.field.field_type, change.value
            );
            let filled = match change.field.kind {
                ActionKind::Dropdown => {
                    self.interactor
                        .select_from_type_ahead(&change.field.target, &change.value)
                        .await
                }
                ActionKind::TextField => {
                    self.interactor
                        .fill_text_field(&change.field.target, &change.value)
                        .await
                }
            };
            filled.map_err(fail("fill field"))?;
        }

        let save = self
            .interactor
            .locator(selectors.save_button.as_str())
            .within(surface)
            .wait_clickable(Some(timeouts.short))
            .await
            .map_err(fail("save button"))?;
        // The save handler checks for a trusted event before raising its confirm().
        self.interactor
            .natural_click(&save)
            .await
            .map_err(fail("save button"))?;

        self.interactor
            .accept_dialog(timeouts.short)
            .await
            .map_err(fail("confirmation dialog"))?;

        self.interactor
            .locator(selectors.success_indicator.as_str())
            .wait_visible(Some(timeouts.long))
            .await
            .map_err(fail("success indicator"))?;

        Ok(RowStatus::Completed)
    }
}
