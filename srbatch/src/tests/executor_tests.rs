use super::fake::{config, FakePortal};
use super::{interactor, logged_in};
use crate::worklist::{Worklist, WorklistRow};
use crate::{ActionExecutor, ActionFailure, RowStatus, Selector};
use std::sync::Arc;

fn row(csv_line: &str) -> WorklistRow {
    let text = format!("ID,Ação,Mod1,Mod2\n{csv_line}\n");
    Worklist::from_csv(text.as_bytes(), b',').unwrap().rows()[0].clone()
}

#[tokio::test(start_paused = true)]
async fn test_delegate_resolves_agent_and_saves() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    let status = executor
        .apply_action(&session, &row("1001.0,Delegar, agent A ,"))
        .await
        .unwrap();

    assert_eq!(status, RowStatus::Completed);
    assert_eq!(
        portal.navigations().last().unwrap(),
        "https://portal.test/records/1001"
    );
    assert_eq!(
        portal.selections(),
        vec![("1001".to_string(), "Agente A".to_string())]
    );
    assert_eq!(portal.events().last().unwrap(), "accept");
}

#[tokio::test(start_paused = true)]
async fn test_unmapped_value_passes_through() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    executor
        .apply_action(&session, &row("42,mudar class,  Corretiva  ,"))
        .await
        .unwrap();
    assert_eq!(
        portal.selections(),
        vec![("42".to_string(), "Corretiva".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_change_delegate_fills_group_then_agent() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    executor
        .apply_action(&session, &row("7,mudar delegado,Manutenção,Agent A"))
        .await
        .unwrap();
    assert_eq!(
        portal.selections(),
        vec![
            ("7".to_string(), "Manutenção".to_string()),
            ("7".to_string(), "Agente A".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_change_date_types_into_text_field() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    executor
        .apply_action(&session, &row("8,mudar data,31/12/2026,"))
        .await
        .unwrap();
    assert_eq!(
        portal.selections(),
        vec![("8".to_string(), "31/12/2026".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_blank_modifier_keeps_current_value_but_still_saves() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    let status = executor
        .apply_action(&session, &row("9,delegar,,"))
        .await
        .unwrap();
    assert_eq!(status, RowStatus::Completed);
    assert!(portal.selections().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_action_fails_before_navigation() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);
    let navigations_before = portal.navigations().len();

    let err = executor
        .apply_action(&session, &row("10,cancelar,,"))
        .await
        .unwrap_err();
    assert_eq!(err.record_id, "10");
    assert!(matches!(err.source, ActionFailure::UnsupportedAction(ref code) if code == "cancelar"));
    assert_eq!(portal.navigations().len(), navigations_before);
}

#[tokio::test(start_paused = true)]
async fn test_missing_edit_button_names_the_step() {
    let config = config();
    let mut portal = FakePortal::new(&config);
    portal.broken_records.insert("11".to_string());
    let portal = Arc::new(portal);
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    let err = executor
        .apply_action(&session, &row("11,delegar,Agent A,"))
        .await
        .unwrap_err();
    assert!(
        matches!(err.source, ActionFailure::Step { step: "edit button", .. }),
        "unexpected failure: {err}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_confirmation_dialog_fails_the_row() {
    let config = config();
    let mut portal = FakePortal::new(&config);
    portal.no_confirmation = true;
    let portal = Arc::new(portal);
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    let err = executor
        .apply_action(&session, &row("12,delegar,Agent A,"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.source,
        ActionFailure::Step { step: "confirmation dialog", .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_save_is_clicked_inside_edit_surface() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let interactor = interactor(&portal, &config);
    let session = logged_in(&interactor, &config).await;
    let executor = ActionExecutor::new(&interactor, &config);

    executor
        .apply_action(&session, &row("31,delegar,Agent A,"))
        .await
        .unwrap();

    // The page also carries a lookalike save button outside the surface.
    let save = Selector::from(config.selectors.save_button.as_str());
    let events = portal.events();
    assert!(events.contains(&format!("click:{save}")), "{events:?}");
    assert!(!events.iter().any(|e| e.contains(":inert:")), "{events:?}");
}
