use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use shared::{
    domain::{Article, ArticleDraft, ArticleId, Credentials},
    protocol::{ArticleResponse, ArticlesResponse, DeleteResponse, LoginResponse},
};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{error, info, warn};

pub mod collection;
pub mod error;
pub mod token_store;
pub mod transport;

pub use collection::ArticleCollection;
pub use error::{ControllerError, ServiceError};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::HttpArticleService;

pub const FAREWELL_MESSAGE: &str = "Goodbye!";

/// Remote side of the article API as consumed by [`SessionController`].
#[async_trait]
pub trait ArticleService: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, ServiceError>;
    async fn list_articles(&self, token: &str) -> Result<ArticlesResponse, ServiceError>;
    async fn create(
        &self,
        token: &str,
        article: &ArticleDraft,
    ) -> Result<ArticleResponse, ServiceError>;
    async fn update(
        &self,
        token: &str,
        article: &ArticleDraft,
        id: ArticleId,
    ) -> Result<ArticleResponse, ServiceError>;
    async fn delete(&self, token: &str, id: ArticleId) -> Result<DeleteResponse, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Articles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    LoadArticles,
    CreateArticle,
    UpdateArticle,
    DeleteArticle,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::LoadArticles => "load_articles",
            Operation::CreateArticle => "create_article",
            Operation::UpdateArticle => "update_article",
            Operation::DeleteArticle => "delete_article",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated session. Never holds an empty token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.is_empty()).then_some(Self { token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

/// Everything a view renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    pub session: Option<Session>,
    pub articles: ArticleCollection,
    pub editing: Option<ArticleId>,
    pub message: String,
    pub busy: bool,
    pub route: View,
}

impl ControllerState {
    fn restored(session: Option<Session>) -> Self {
        let route = if session.is_some() {
            View::Articles
        } else {
            View::Login
        };
        Self {
            session,
            articles: ArticleCollection::new(),
            editing: None,
            message: String::new(),
            busy: false,
            route,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn editing_article(&self) -> Option<&Article> {
        self.editing.and_then(|id| self.articles.get(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Navigate(View),
    StatusChanged(String),
    SessionCleared,
    OperationFailed {
        operation: Operation,
        message: String,
    },
}

/// Marks the controller busy for its lifetime; clears the flag on every exit
/// path, including cancellation of the owning future.
struct BusyGuard<'a> {
    state: &'a watch::Sender<ControllerState>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(state: &'a watch::Sender<ControllerState>) -> Self {
        state.send_modify(|s| {
            s.busy = true;
            s.message.clear();
        });
        Self { state }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.busy = false);
    }
}

pub struct SessionController {
    service: Arc<dyn ArticleService>,
    tokens: Arc<dyn TokenStore>,
    state: watch::Sender<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
    // One intent at a time; later intents wait their turn in issue order.
    op_gate: Mutex<()>,
}

impl SessionController {
    pub fn new(service: Arc<dyn ArticleService>, tokens: Arc<dyn TokenStore>) -> Arc<Self> {
        let session = match tokens.get() {
            Ok(token) => token.and_then(Session::new),
            Err(err) => {
                warn!(error = %err, "session: could not read stored token, starting logged out");
                None
            }
        };
        if session.is_some() {
            info!("session: restored stored token");
        }

        let (state, _) = watch::channel(ControllerState::restored(session));
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            service,
            tokens,
            state,
            events,
            op_gate: Mutex::new(()),
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn has_session(&self) -> bool {
        self.state.borrow().has_session()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    pub fn message(&self) -> String {
        self.state.borrow().message.clone()
    }

    pub fn articles(&self) -> ArticleCollection {
        self.state.borrow().articles.clone()
    }

    pub fn route(&self) -> View {
        self.state.borrow().route
    }

    pub fn editing_target(&self) -> Option<ArticleId> {
        self.state.borrow().editing
    }

    pub fn editing_article(&self) -> Option<Article> {
        self.state.borrow().editing_article().cloned()
    }

    pub fn set_editing_target(&self, id: ArticleId) -> Result<(), ControllerError> {
        let mut known = false;
        self.state.send_if_modified(|s| {
            known = s.articles.contains(id);
            if known && s.editing != Some(id) {
                s.editing = Some(id);
                return true;
            }
            false
        });
        if known {
            Ok(())
        } else {
            Err(ControllerError::UnknownArticle(id))
        }
    }

    pub fn clear_editing_target(&self) {
        self.state.send_if_modified(|s| s.editing.take().is_some());
    }

    pub fn go_to_login(&self) {
        self.navigate(View::Login);
    }

    pub fn go_to_articles(&self) {
        self.navigate(View::Articles);
    }

    fn navigate(&self, view: View) {
        self.state.send_modify(|s| s.route = view);
        let _ = self.events.send(ControllerEvent::Navigate(view));
    }

    fn set_message(&self, message: String) {
        self.state.send_modify(|s| s.message = message.clone());
        let _ = self.events.send(ControllerEvent::StatusChanged(message));
    }

    fn report_failure(&self, operation: Operation, err: &ControllerError) {
        error!(operation = %operation, error = %err, "articles: operation failed");
        let _ = self.events.send(ControllerEvent::OperationFailed {
            operation,
            message: err.to_string(),
        });
    }

    fn expire_session(&self, operation: Operation) {
        warn!(operation = %operation, "session: token rejected, returning to login");
        if let Err(err) = self.tokens.remove() {
            error!(error = %err, "session: failed to remove rejected token");
        }
        self.state.send_modify(|s| s.session = None);
        let _ = self.events.send(ControllerEvent::SessionCleared);
        self.navigate(View::Login);
    }

    /// An unreadable store counts as "no token"; the server's rejection then
    /// clears it through the normal auth-failure path.
    fn stored_token(&self, operation: Operation) -> String {
        match self.tokens.get() {
            Ok(token) => token.unwrap_or_default(),
            Err(err) => {
                warn!(operation = %operation, error = %err, "session: stored token unreadable");
                String::new()
            }
        }
    }

    /// Runs one authenticated service call with the stored token and applies
    /// the shared failure policy: auth failures end the session, everything
    /// else goes to the failure channel.
    async fn authenticated<T, F, Fut>(
        &self,
        operation: Operation,
        call: F,
    ) -> Result<T, ControllerError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let token = self.stored_token(operation);
        match call(token).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_auth_failure() => {
                self.expire_session(operation);
                Err(ControllerError::SessionExpired)
            }
            Err(err) => {
                let err = ControllerError::from(err);
                self.report_failure(operation, &err);
                Err(err)
            }
        }
    }

    pub async fn login(&self, credentials: Credentials) -> Result<(), ControllerError> {
        let _slot = self.op_gate.lock().await;
        self.state.send_modify(|s| s.editing = None);
        let _busy = BusyGuard::acquire(&self.state);
        info!(username = %credentials.username, "session: logging in");

        let response = match self.service.authenticate(&credentials).await {
            Ok(response) => response,
            Err(err) => {
                let err = ControllerError::from(err);
                self.report_failure(Operation::Login, &err);
                return Err(err);
            }
        };

        let Some(session) = Session::new(response.token) else {
            let err = ControllerError::from(ServiceError::Decode(
                "login response carried an empty token".to_string(),
            ));
            self.report_failure(Operation::Login, &err);
            return Err(err);
        };
        if let Err(source) = self.tokens.set(session.token()) {
            let err = ControllerError::TokenStore { source };
            self.report_failure(Operation::Login, &err);
            return Err(err);
        }

        self.state.send_modify(|s| s.session = Some(session));
        self.set_message(response.message);
        self.navigate(View::Articles);
        info!(username = %credentials.username, "session: logged in");
        Ok(())
    }

    /// Ends the session locally. No-op when nobody is logged in.
    pub fn logout(&self) -> Result<(), ControllerError> {
        let stored = match self.tokens.get() {
            Ok(token) => token.is_some(),
            Err(err) => {
                warn!(error = %err, "session: stored token unreadable, clearing it");
                true
            }
        };
        if !stored && !self.has_session() {
            return Ok(());
        }

        self.tokens
            .remove()
            .map_err(|source| ControllerError::TokenStore { source })?;
        self.state.send_modify(|s| s.session = None);
        self.set_message(FAREWELL_MESSAGE.to_string());
        self.navigate(View::Login);
        info!("session: logged out");
        Ok(())
    }

    pub async fn load_articles(&self) -> Result<(), ControllerError> {
        let _slot = self.op_gate.lock().await;
        let _busy = BusyGuard::acquire(&self.state);

        let service = Arc::clone(&self.service);
        let response = self
            .authenticated(Operation::LoadArticles, |token| async move {
                service.list_articles(&token).await
            })
            .await?;

        let count = response.articles.len();
        self.state.send_modify(|s| {
            s.articles = ArticleCollection::from_articles(response.articles);
            if s.editing.is_some_and(|id| !s.articles.contains(id)) {
                s.editing = None;
            }
        });
        self.set_message(response.message);
        info!(count, "articles: loaded");
        Ok(())
    }

    pub async fn create_article(&self, article: ArticleDraft) -> Result<(), ControllerError> {
        let _slot = self.op_gate.lock().await;
        let _busy = BusyGuard::acquire(&self.state);

        let service = Arc::clone(&self.service);
        let response = self
            .authenticated(Operation::CreateArticle, |token| async move {
                service.create(&token, &article).await
            })
            .await?;

        let id = response.article.article_id;
        self.state.send_modify(|s| {
            s.articles.upsert(response.article);
            s.editing = None;
        });
        self.set_message(response.message);
        info!(article_id = id.0, "articles: created");
        Ok(())
    }

    pub async fn update_article(
        &self,
        id: ArticleId,
        article: ArticleDraft,
    ) -> Result<(), ControllerError> {
        let _slot = self.op_gate.lock().await;
        let _busy = BusyGuard::acquire(&self.state);

        let service = Arc::clone(&self.service);
        let response = self
            .authenticated(Operation::UpdateArticle, |token| async move {
                service.update(&token, &article, id).await
            })
            .await?;

        self.state.send_modify(|s| {
            s.articles.replace(id, response.article);
            s.editing = None;
        });
        self.set_message(response.message);
        info!(article_id = id.0, "articles: updated");
        Ok(())
    }

    pub async fn delete_article(&self, id: ArticleId) -> Result<(), ControllerError> {
        let _slot = self.op_gate.lock().await;
        let _busy = BusyGuard::acquire(&self.state);

        let service = Arc::clone(&self.service);
        let response = self
            .authenticated(Operation::DeleteArticle, |token| async move {
                service.delete(&token, id).await
            })
            .await?;

        self.state.send_modify(|s| {
            s.articles.remove(id);
            if s.editing == Some(id) {
                s.editing = None;
            }
        });
        self.set_message(response.message);
        info!(article_id = id.0, "articles: deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
