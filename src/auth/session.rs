//! The authoritative GitHub session and its state machine.
//!
//! A [`SessionController`] reconciles three token sources into one
//! [`Session`]: the OAuth redirect, the persisted token, and token changes
//! made by other processes. Every observed signal or user operation
//! advances an epoch; a verification result is committed only when no newer
//! signal arrived while it ran, so a sign-out always beats a slower
//! sign-in.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::github::GitHubUser;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

use super::callback::OAuthCallback;
use super::credentials::{CredentialChange, CredentialStore};
use super::error::AuthError;
use super::exchange::TokenExchanger;
use super::token::AccessToken;
use super::verifier::{TokenVerifier, Verification};

const NOTICE_CAPACITY: usize = 16;

/// Why the session is authenticating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthReason {
    /// Restoring the persisted token at startup.
    Startup,
    /// Completing an OAuth redirect.
    OAuthCallback,
    /// Checking a token the user entered.
    ManualToken,
}

/// The current authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// No verified token.
    SignedOut,
    /// A token is being obtained or verified.
    Authenticating(AuthReason),
    /// A verified token and its owner.
    SignedIn {
        /// The verified token.
        token: AccessToken,
        /// The token's owner.
        user: GitHubUser,
    },
}

impl Session {
    /// Stable label used in logs and telemetry.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SignedOut => "signed_out",
            Self::Authenticating(_) => "authenticating",
            Self::SignedIn { .. } => "signed_in",
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&GitHubUser> {
        match self {
            Self::SignedIn { user, .. } => Some(user),
            _ => None,
        }
    }

    /// The verified token, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&AccessToken> {
        match self {
            Self::SignedIn { token, .. } => Some(token),
            _ => None,
        }
    }
}

/// Side-channel messages for the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// A sign-in prompt, if shown, can be dismissed.
    PromptDismissed,
    /// A user-visible error from a sign-in attempt.
    Error(String),
}

/// A token from another process that still needs verification.
#[derive(Debug)]
pub struct PendingVerification {
    epoch: u64,
    token: AccessToken,
}

/// Owns the session state and applies every transition.
pub struct SessionController {
    credentials: CredentialStore,
    verifier: Arc<dyn TokenVerifier>,
    exchanger: Arc<dyn TokenExchanger>,
    state: watch::Sender<Session>,
    notices: broadcast::Sender<SessionNotice>,
    epoch: Mutex<u64>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionController")
            .field("state", &self.state.borrow().label())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates a controller in `Authenticating(Startup)`.
    #[must_use]
    pub fn new(
        credentials: CredentialStore,
        verifier: Arc<dyn TokenVerifier>,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Self {
        let (state, _) = watch::channel(Session::Authenticating(AuthReason::Startup));
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            credentials,
            verifier,
            exchanger,
            state,
            notices,
            epoch: Mutex::new(0),
            telemetry: Arc::new(NoopTelemetrySink),
        }
    }

    /// Records session transitions to `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Subscribes to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Subscribes to notices.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Returns a snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Runs the startup check and returns the resulting session.
    ///
    /// With a callback the OAuth flow is completed; failures end signed out
    /// with an error notice. Without one the persisted token, if any, is
    /// verified; a rejected token is removed silently.
    pub async fn start(&self, callback: Option<OAuthCallback>) -> Session {
        match callback {
            Some(redirect) => {
                if let Err(error) = self.complete_oauth(&redirect).await {
                    tracing::debug!(%error, "OAuth callback did not sign in");
                }
            }
            None => self.restore().await,
        }
        self.current()
    }

    /// Exchanges the callback code, verifies and persists the token.
    ///
    /// # Errors
    ///
    /// Returns the exchange, verification or storage failure; the session
    /// ends signed out and an error notice is published. Returns
    /// [`AuthError::Superseded`] when a newer change won.
    pub async fn complete_oauth(&self, callback: &OAuthCallback) -> Result<GitHubUser, AuthError> {
        let epoch = self.begin();
        self.commit(epoch, Session::Authenticating(AuthReason::OAuthCallback))?;

        let outcome = self.exchange_and_verify(callback).await;
        let result = match outcome {
            Ok((token, user)) => self.commit_new_token(epoch, token, user),
            Err(error) => Err(error),
        };

        match &result {
            Ok(_) | Err(AuthError::Superseded) => {}
            Err(error) => {
                if self.commit(epoch, Session::SignedOut).is_ok() {
                    self.notify(SessionNotice::Error(error.to_string()));
                }
            }
        }
        result
    }

    /// Persists a user-supplied token, then verifies it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingToken`] for blank input,
    /// [`AuthError::TokenRejected`] when GitHub refuses the token (which is
    /// then removed again), [`AuthError::Storage`] when it cannot be saved,
    /// or [`AuthError::Superseded`] when a newer change won.
    pub async fn sign_in_with_token(&self, raw_token: &str) -> Result<GitHubUser, AuthError> {
        let token = AccessToken::new(raw_token)?;
        self.credentials.save(&token)?;
        let epoch = self.begin();
        self.commit(epoch, Session::Authenticating(AuthReason::ManualToken))?;

        match self.verifier.verify(&token).await {
            Verification::Verified(user) => {
                self.commit(
                    epoch,
                    Session::SignedIn {
                        token,
                        user: user.clone(),
                    },
                )?;
                self.notify(SessionNotice::PromptDismissed);
                Ok(user)
            }
            Verification::Rejected { reason } => {
                tracing::debug!(%reason, "entered token rejected");
                self.commit_rejection(epoch)?;
                Err(AuthError::TokenRejected)
            }
        }
    }

    /// Removes the persisted token and signs out unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the token file cannot be
    /// removed. The session is signed out either way.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        let cleared = self.credentials.clear();
        self.publish(Session::SignedOut);
        drop(epoch);
        cleared.map_err(AuthError::from)
    }

    /// Records a token change made elsewhere.
    ///
    /// `Cleared` is applied immediately. `Stored` returns the verification
    /// still to be run with [`Self::verify_observed`].
    pub fn observe(&self, change: CredentialChange) -> Option<PendingVerification> {
        match change {
            CredentialChange::Cleared => {
                tracing::debug!("token cleared elsewhere");
                let mut epoch = self.lock_epoch();
                *epoch += 1;
                self.publish(Session::SignedOut);
                drop(epoch);
                None
            }
            CredentialChange::Stored(token) => {
                tracing::debug!("token stored elsewhere");
                Some(PendingVerification {
                    epoch: self.begin(),
                    token,
                })
            }
        }
    }

    /// Verifies a token observed with [`Self::observe`] and commits the
    /// result unless a newer change arrived meanwhile.
    ///
    /// A rejected token is removed from storage, which signs out every
    /// participant.
    pub async fn verify_observed(&self, pending: PendingVerification) {
        let PendingVerification { epoch, token } = pending;
        let committed = match self.verifier.verify(&token).await {
            Verification::Verified(user) => self
                .commit(epoch, Session::SignedIn { token, user })
                .inspect(|()| self.notify(SessionNotice::PromptDismissed)),
            Verification::Rejected { reason } => {
                tracing::debug!(%reason, "token from another process rejected");
                self.commit_rejection(epoch)
            }
        };
        if let Err(error) = committed {
            tracing::debug!(%error, "discarded stale verification");
        }
    }

    /// Follows token changes from other processes until storage closes.
    ///
    /// Removals are applied in order as they arrive; verification of new
    /// tokens runs in separate tasks so a later removal never waits behind
    /// a slow verification.
    #[must_use]
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut changes = self.credentials.subscribe();
        tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                if let Some(pending) = controller.observe(change) {
                    let worker = Arc::clone(&controller);
                    tokio::spawn(async move { worker.verify_observed(pending).await });
                }
            }
        })
    }

    async fn restore(&self) {
        let epoch = self.begin();
        let stored = match self.credentials.load() {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(%error, "could not read the saved token");
                None
            }
        };
        let Some(token) = stored else {
            drop(self.commit(epoch, Session::SignedOut));
            return;
        };

        let committed = match self.verifier.verify(&token).await {
            Verification::Verified(user) => self.commit(epoch, Session::SignedIn { token, user }),
            Verification::Rejected { reason } => {
                tracing::debug!(%reason, "saved token rejected");
                self.commit_rejection(epoch)
            }
        };
        if let Err(error) = committed {
            tracing::debug!(%error, "startup verification superseded");
        }
    }

    async fn exchange_and_verify(
        &self,
        callback: &OAuthCallback,
    ) -> Result<(AccessToken, GitHubUser), AuthError> {
        let token = self.exchanger.exchange(callback.code()).await?;
        match self.verifier.verify(&token).await {
            Verification::Verified(user) => Ok((token, user)),
            Verification::Rejected { reason } => {
                tracing::debug!(%reason, "exchanged token rejected");
                Err(AuthError::TokenRejected)
            }
        }
    }

    fn begin(&self) -> u64 {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        *epoch
    }

    fn commit(&self, epoch: u64, session: Session) -> Result<(), AuthError> {
        let current = self.lock_epoch();
        if *current != epoch {
            return Err(AuthError::Superseded);
        }
        self.publish(session);
        drop(current);
        Ok(())
    }

    fn commit_new_token(
        &self,
        epoch: u64,
        token: AccessToken,
        user: GitHubUser,
    ) -> Result<GitHubUser, AuthError> {
        let current = self.lock_epoch();
        if *current != epoch {
            return Err(AuthError::Superseded);
        }
        self.credentials.save(&token)?;
        self.publish(Session::SignedIn {
            token,
            user: user.clone(),
        });
        drop(current);
        Ok(user)
    }

    fn commit_rejection(&self, epoch: u64) -> Result<(), AuthError> {
        let current = self.lock_epoch();
        if *current != epoch {
            return Err(AuthError::Superseded);
        }
        if let Err(error) = self.credentials.clear() {
            tracing::warn!(%error, "could not remove rejected token");
        }
        self.publish(Session::SignedOut);
        drop(current);
        Ok(())
    }

    fn publish(&self, session: Session) {
        let label = session.label();
        match session.user() {
            Some(user) => tracing::info!(state = label, login = %user.login, "session changed"),
            None => tracing::info!(state = label, "session changed"),
        }
        self.state.send_replace(session);
        self.telemetry.record(TelemetryEvent::SessionChanged {
            state: label.to_owned(),
        });
    }

    fn notify(&self, notice: SessionNotice) {
        drop(self.notices.send(notice));
    }

    // A bare counter has no invariant a panicking holder could break.
    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
