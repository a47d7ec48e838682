//! Consent and share prompts answered by the web UI.
//!
//! The host emits a request event; the UI shows its own dialog and reports
//! back through `answer_consent`. An unanswered prompt counts as a decline.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

pub const CONSENT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    pub id: Uuid,
    pub message: String,
}

/// Pending consent questions, keyed by request id.
#[derive(Clone)]
pub struct ConsentBroker {
    pending: Arc<Mutex<HashMap<Uuid, oneshot::Sender<bool>>>>,
    timeout: Duration,
}

impl Default for ConsentBroker {
    fn default() -> Self {
        Self::new(CONSENT_TIMEOUT)
    }
}

impl ConsentBroker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Registers a question and hands it to `notify`. Resolves to the answer,
    /// or `false` when `notify` fails or nobody answers in time.
    pub async fn ask<F>(&self, message: String, notify: F) -> bool
    where
        F: FnOnce(&ConsentRequest) -> bool,
    {
        let request = ConsentRequest {
            id: Uuid::new_v4(),
            message,
        };
        let (tx, rx) = oneshot::channel();
        self.lock().insert(request.id, tx);

        if !notify(&request) {
            self.lock().remove(&request.id);
            return false;
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(accepted)) => accepted,
            _ => {
                log::warn!("Consent request {} went unanswered", request.id);
                self.lock().remove(&request.id);
                false
            }
        }
    }

    /// Delivers an answer. False when the request is unknown or expired.
    pub fn resolve(&self, id: Uuid, accepted: bool) -> bool {
        match self.lock().remove(&id) {
            Some(tx) => tx.send(accepted).is_ok(),
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, oneshot::Sender<bool>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "desktop")]
pub use webview::{answer_consent, WebviewConsent, WebviewShareSheet};

#[cfg(feature = "desktop")]
mod webview {
    use std::future::Future;
    use std::pin::Pin;

    use tauri::{AppHandle, Emitter, State};
    use uuid::Uuid;

    use super::ConsentBroker;
    use crate::camera::capture::{CaptureError, ConsentPrompt, ShareRequest, ShareSheet};
    use crate::shell::layout::MAIN_WINDOW;
    use crate::AppState;

    pub const CONSENT_EVENT: &str = "consent-requested";
    pub const SHARE_EVENT: &str = "share-requested";

    pub struct WebviewConsent {
        app: AppHandle,
        broker: ConsentBroker,
    }

    impl WebviewConsent {
        pub fn new(app: AppHandle, broker: ConsentBroker) -> Self {
            Self { app, broker }
        }
    }

    impl ConsentPrompt for WebviewConsent {
        fn confirm(&self, message: String) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
            Box::pin(self.broker.ask(message, |request| {
                match self.app.emit_to(MAIN_WINDOW, CONSENT_EVENT, request) {
                    Ok(()) => true,
                    Err(err) => {
                        log::error!("Failed to ask for consent: {err}");
                        false
                    }
                }
            }))
        }
    }

    pub struct WebviewShareSheet {
        app: AppHandle,
    }

    impl WebviewShareSheet {
        pub fn new(app: AppHandle) -> Self {
            Self { app }
        }
    }

    impl ShareSheet for WebviewShareSheet {
        fn share(&self, request: &ShareRequest) -> Result<(), CaptureError> {
            self.app
                .emit_to(MAIN_WINDOW, SHARE_EVENT, request)
                .map_err(|e| CaptureError::Share(e.to_string()))
        }
    }

    #[tauri::command]
    pub fn answer_consent(
        state: State<'_, AppState>,
        id: Uuid,
        accepted: bool,
    ) -> Result<bool, String> {
        Ok(state.consent.resolve(id, accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answer_reaches_the_asker() {
        let broker = ConsentBroker::default();
        let responder = broker.clone();

        let accepted = broker
            .ask("archive?".into(), |request| {
                let id = request.id;
                tokio::spawn(async move { responder.resolve(id, true) });
                true
            })
            .await;

        assert!(accepted);
        assert_eq!(broker.pending(), 0);
    }

    #[tokio::test]
    async fn silence_and_failed_delivery_decline() {
        let broker = ConsentBroker::new(Duration::from_millis(20));
        assert!(!broker.ask("archive?".into(), |_| true).await);
        assert!(!broker.ask("archive?".into(), |_| false).await);
        assert_eq!(broker.pending(), 0);
    }

    #[test]
    fn unknown_answers_are_ignored() {
        let broker = ConsentBroker::default();
        assert!(!broker.resolve(Uuid::new_v4(), true));
    }
}
