mod executor_tests;
mod orchestrator_tests;

use crate::driver::BrowserDriver;
use crate::{Config, Interactor, Session, SessionController};
use fake::FakePortal;
use std::sync::Arc;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

pub fn interactor(portal: &Arc<FakePortal>, config: &Config) -> Interactor {
    Interactor::new(
        portal.clone() as Arc<dyn BrowserDriver>,
        config.timeouts,
        config.selectors.loading_indicator.as_str(),
        config.selectors.dropdown_search.as_str(),
    )
}

pub async fn logged_in(interactor: &Interactor, config: &Config) -> Session {
    SessionController::new(interactor, &config.selectors)
        .login(&config.login)
        .await
        .expect("login against the fake portal")
}
