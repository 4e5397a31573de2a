//! C7 — thin wrapper owning one isolated page context and its primary
//! page. All driver operations are performed against the session's page
//! handle but are coordinated by the manager (C8).

use crate::driver::{Context, DriverError, Page};

pub struct BrowserSession {
    pub session_id: String,
    /// The client-facing session id events for this session are logged
    /// under, distinct from `session_id` (the manager's own key).
    pub client_id: String,
    pub created_at: f64,
    pub last_activity: f64,
    pub command_count: u64,
    context: Option<Box<dyn Context>>,
    page: Box<dyn Page>,
}

impl BrowserSession {
    pub fn new(
        session_id: String,
        client_id: String,
        now: f64,
        context: Box<dyn Context>,
        page: Box<dyn Page>,
    ) -> Self {
        Self {
            session_id,
            client_id,
            created_at: now,
            last_activity: now,
            command_count: 0,
            context: Some(context),
            page,
        }
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn update_activity(&mut self, now: f64) {
        self.last_activity = now;
        self.command_count += 1;
    }

    /// Releases the underlying context. Idempotent: a session that has
    /// already been closed returns `Ok(())` without touching the driver
    /// again.
    pub async fn close(&mut self) -> Result<(), DriverError> {
        match self.context.take() {
            Some(context) => context.close().await,
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_driver::MemoryDriver;
    use bsrv_protocol::WaitCondition;

    async fn make_session() -> BrowserSession {
        let driver = MemoryDriver::new();
        let browser = driver.launch(Default::default()).await.unwrap();
        let context = browser.new_context(Default::default()).await.unwrap();
        let page = context.new_page().await.unwrap();
        BrowserSession::new("s1".into(), "c1".into(), 0.0, context, page)
    }

    #[tokio::test]
    async fn update_activity_advances_state() {
        let mut session = make_session().await;
        session.update_activity(5.0);
        assert_eq!(session.last_activity, 5.0);
        assert_eq!(session.command_count, 1);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut session = make_session().await;
        assert!(session.close().await.is_ok());
        assert!(session.is_closed());
        assert!(session.close().await.is_ok());
    }

    #[tokio::test]
    async fn page_is_reachable_after_construction() {
        let session = make_session().await;
        let _ = session.page().url().await;
        let _ = WaitCondition::Load;
    }
}
