//! Authentication identity and provider seam.
//!
//! The hosted auth provider is reached through [`AuthBackend`]. Provider
//! error codes are mapped to Turkish user-facing messages; codes outside the
//! table fall back to the provider's raw message.

use tracing::{info, warn};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

impl Identity {
    #[must_use]
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self { uid: uid.into(), email: email.into() }
    }
}

/// An auth failure with the provider code and a localized message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    /// Provider code such as `auth/wrong-password`.
    pub code: String,
    /// Message suitable for display.
    pub message: String,
}

impl AuthError {
    /// Build from a provider code and raw provider message.
    #[must_use]
    pub fn from_provider(code: &str, raw: &str) -> Self {
        Self { code: code.to_string(), message: localize_auth_error(code, raw) }
    }
}

const AUTH_MESSAGES: &[(&str, &str)] = &[
    ("auth/user-not-found", "Bu e-posta ile kayıtlı kullanıcı bulunamadı."),
    ("auth/wrong-password", "Şifre hatalı."),
    ("auth/invalid-credential", "E-posta veya şifre hatalı."),
    ("auth/email-already-in-use", "Bu e-posta adresi zaten kullanımda."),
    ("auth/invalid-email", "Geçersiz e-posta adresi."),
    ("auth/weak-password", "Şifre en az 6 karakter olmalıdır."),
    ("auth/too-many-requests", "Çok fazla deneme yapıldı. Lütfen daha sonra tekrar deneyin."),
    ("auth/network-request-failed", "Ağ hatası. İnternet bağlantınızı kontrol edin."),
    ("auth/user-disabled", "Bu hesap devre dışı bırakılmış."),
];

/// Turkish message for a provider error code, or `raw` when unmapped.
#[must_use]
pub fn localize_auth_error(code: &str, raw: &str) -> String {
    AUTH_MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or_else(|| raw.to_string(), |(_, msg)| (*msg).to_string())
}

/// Lowercased, trimmed email, or `None` if it is not `local@domain`.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Hosted authentication provider.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Current auth status as seen by the app shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Identity>,
    /// True until the provider reports the initial session, and while a
    /// sign-in/up/out call is running.
    pub loading: bool,
}

impl AuthState {
    /// State before the provider has reported anything.
    #[must_use]
    pub fn initializing() -> Self {
        Self { user: None, loading: true }
    }

    /// Provider callback: the session changed.
    pub fn on_auth_changed(&mut self, user: Option<Identity>) {
        self.user = user;
        self.loading = false;
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// # Errors
    ///
    /// Returns the backend's [`AuthError`]; `auth/invalid-email` when the
    /// address does not parse.
    pub async fn sign_in(&mut self, backend: &dyn AuthBackend, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email).ok_or_else(|| AuthError::from_provider("auth/invalid-email", email))?;
        self.loading = true;
        let result = backend.sign_in(&email, password).await;
        self.finish(result, "sign in")
    }

    /// # Errors
    ///
    /// Returns the backend's [`AuthError`]; `auth/invalid-email` when the
    /// address does not parse.
    pub async fn sign_up(&mut self, backend: &dyn AuthBackend, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email).ok_or_else(|| AuthError::from_provider("auth/invalid-email", email))?;
        self.loading = true;
        let result = backend.sign_up(&email, password).await;
        self.finish(result, "sign up")
    }

    /// # Errors
    ///
    /// Returns the backend's [`AuthError`]; the local user is kept on failure.
    pub async fn sign_out(&mut self, backend: &dyn AuthBackend) -> Result<(), AuthError> {
        self.loading = true;
        let result = backend.sign_out().await;
        self.loading = false;
        match result {
            Ok(()) => {
                info!("signed out");
                self.user = None;
                Ok(())
            }
            Err(e) => {
                warn!(code = %e.code, "sign out failed");
                Err(e)
            }
        }
    }

    fn finish(&mut self, result: Result<Identity, AuthError>, action: &str) -> Result<(), AuthError> {
        self.loading = false;
        match result {
            Ok(identity) => {
                info!(uid = %identity.uid, action, "authenticated");
                self.user = Some(identity);
                Ok(())
            }
            Err(e) => {
                warn!(code = %e.code, action, "auth failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
