use std::{collections::HashMap, fmt};

use {
    async_trait::async_trait,
    lansite_config::LansiteConfig,
    lansite_protocol::ExternalProfile,
    secrecy::ExposeSecret,
    serde::Serialize,
    tracing::info,
};

use crate::state::GatewayState;

// ── Types ────────────────────────────────────────────────────────────────────

/// What an identity provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub display_name: String,
    pub profile: Option<ExternalProfile>,
}

/// Reconnect credentials handed to the browser after a successful login.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub id: u64,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("{0} login is disabled")]
    Disabled(&'static str),

    #[error("missing query parameter `{0}`")]
    MissingParam(&'static str),

    #[error("unknown login code")]
    UnknownCode,
}

// ── Providers ────────────────────────────────────────────────────────────────

/// Source of asserted identities for the HTTP login routes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn enabled(&self, config: &LansiteConfig) -> bool;

    async fn assert_identity(
        &self,
        state: &GatewayState,
        params: &HashMap<String, String>,
    ) -> Result<ExternalIdentity, LoginError>;
}

fn param<'a>(
    params: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, LoginError> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(LoginError::MissingParam(key))
}

/// Pre-shared code mapped to a display name in the config.
pub struct CodeLogin;

#[async_trait]
impl IdentityProvider for CodeLogin {
    fn name(&self) -> &'static str {
        "code"
    }

    fn enabled(&self, config: &LansiteConfig) -> bool {
        config.auth.login_with_code
    }

    async fn assert_identity(
        &self,
        state: &GatewayState,
        params: &HashMap<String, String>,
    ) -> Result<ExternalIdentity, LoginError> {
        let code = param(params, "code")?.to_ascii_uppercase();
        let display_name = state.codes.lookup(&code).ok_or(LoginError::UnknownCode)?;
        Ok(ExternalIdentity {
            display_name: display_name.to_string(),
            profile: Some(ExternalProfile {
                id: format!("code:{code}"),
                avatar: None,
            }),
        })
    }
}

/// Trust any username. Only mounted in developer mode.
pub struct DeveloperLogin;

#[async_trait]
impl IdentityProvider for DeveloperLogin {
    fn name(&self) -> &'static str {
        "developer"
    }

    fn enabled(&self, config: &LansiteConfig) -> bool {
        config.auth.developer_mode
    }

    async fn assert_identity(
        &self,
        _state: &GatewayState,
        params: &HashMap<String, String>,
    ) -> Result<ExternalIdentity, LoginError> {
        let username = param(params, "username")?;
        Ok(ExternalIdentity {
            display_name: username.to_string(),
            profile: Some(ExternalProfile {
                id: format!("dev:{username}"),
                avatar: None,
            }),
        })
    }
}

// ── Login ────────────────────────────────────────────────────────────────────

/// Register (or refresh) the asserted identity on the main stream.
pub async fn complete_login(state: &GatewayState, identity: ExternalIdentity) -> Credentials {
    let mut stream = state.stream.lock().await;
    let registered = stream
        .sessions_mut()
        .sign_in(&identity.display_name, identity.profile);
    info!(id = registered.id, display_name = %registered.display_name, "login");
    Credentials {
        id: registered.id,
        secret: registered.secret().expose_secret().clone(),
    }
}

pub async fn login(
    state: &GatewayState,
    provider: &dyn IdentityProvider,
    params: &HashMap<String, String>,
) -> Result<Credentials, LoginError> {
    if !provider.enabled(&state.config) {
        return Err(LoginError::Disabled(provider.name()));
    }
    let identity = provider.assert_identity(state, params).await?;
    Ok(complete_login(state, identity).await)
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc};

    fn state() -> Arc<GatewayState> {
        let mut config = LansiteConfig::default();
        config.auth.login_with_code = true;
        config.codes.insert("QWERT".into(), "kacza".into());
        GatewayState::new(config)
    }

    fn params(key: &str, value: &str) -> HashMap<String, String> {
        HashMap::from([(key.to_string(), value.to_string())])
    }

    #[tokio::test]
    async fn code_login_registers_identity() {
        let state = state();
        let creds = login(&state, &CodeLogin, &params("code", "qwert"))
            .await
            .unwrap();
        let stream = state.stream.lock().await;
        let identity = stream.sessions().check_credentials(creds.id, &creds.secret);
        assert_eq!(identity.unwrap().display_name, "kacza");
    }

    #[tokio::test]
    async fn same_code_reuses_identity() {
        let state = state();
        let first = login(&state, &CodeLogin, &params("code", "QWERT"))
            .await
            .unwrap();
        let second = login(&state, &CodeLogin, &params("code", " qwert "))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.secret, second.secret);
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let state = state();
        let err = login(&state, &CodeLogin, &params("code", "ZZZZZ"))
            .await
            .unwrap_err();
        assert_eq!(err, LoginError::UnknownCode);
        assert!(state.stream.lock().await.sessions().is_empty());
    }

    #[tokio::test]
    async fn missing_code_is_rejected() {
        let err = login(&state(), &CodeLogin, &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err, LoginError::MissingParam("code"));
    }

    #[tokio::test]
    async fn developer_login_requires_developer_mode() {
        let err = login(&state(), &DeveloperLogin, &params("username", "dev"))
            .await
            .unwrap_err();
        assert_eq!(err, LoginError::Disabled("developer"));

        let mut config = LansiteConfig::default();
        config.auth.developer_mode = true;
        let dev = GatewayState::new(config);
        let creds = login(&dev, &DeveloperLogin, &params("username", "dev"))
            .await
            .unwrap();
        assert_eq!(creds.id, 1);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials {
            id: 1,
            secret: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
