// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS credential resolution.
//!
//! Resolution order: explicit `[bedrock]` config values, then the standard
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
//! environment variables. Missing credentials are not an error at startup;
//! the first signed request reports them as [`MomaError::Auth`].

use moma_config::model::BedrockConfig;
use moma_core::MomaError;
use secrecy::{ExposeSecret, SecretString};

/// Static AWS credentials.
pub struct Credentials {
    pub access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: session_token.map(SecretString::from),
        }
    }

    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|t| t.expose_secret())
    }

    /// Resolves credentials from config, falling back to the process environment.
    pub fn resolve(config: &BedrockConfig) -> Option<Self> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolves credentials using `lookup` in place of the process environment.
    ///
    /// Config and environment are not mixed: a config key id without a
    /// secret falls through to the environment as a whole.
    pub fn resolve_with(
        config: &BedrockConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<Self> {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(String::from);

        let non_empty_secret = |v: &Option<SecretString>| {
            v.as_ref()
                .filter(|s| !s.expose_secret().is_empty())
                .cloned()
        };

        if let (Some(key), Some(secret)) = (
            non_empty(&config.access_key_id),
            non_empty_secret(&config.secret_access_key),
        ) {
            return Some(Self {
                access_key_id: key,
                secret_access_key: secret,
                session_token: non_empty_secret(&config.session_token),
            });
        }

        let env = |name: &str| lookup(name).filter(|s| !s.is_empty());
        let key = env("AWS_ACCESS_KEY_ID")?;
        let secret = env("AWS_SECRET_ACCESS_KEY")?;
        Some(Self::new(key, secret, env("AWS_SESSION_TOKEN")))
    }
}

/// Returns the credentials or the error reported when none were found.
pub fn require(credentials: Option<&Credentials>) -> Result<&Credentials, MomaError> {
    credentials.ok_or_else(|| {
        MomaError::Auth(
            "no AWS credentials: set bedrock.access_key_id/secret_access_key or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY"
                .into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn config_values_take_precedence() {
        let config = BedrockConfig {
            access_key_id: Some("AKIDCONFIG".into()),
            secret_access_key: Some(SecretString::from("config-secret".to_string())),
            ..Default::default()
        };
        let creds = Credentials::resolve_with(
            &config,
            env(&[("AWS_ACCESS_KEY_ID", "AKIDENV"), ("AWS_SECRET_ACCESS_KEY", "env")]),
        )
        .unwrap();
        assert_eq!(creds.access_key_id, "AKIDCONFIG");
        assert_eq!(creds.secret_access_key(), "config-secret");
        assert_eq!(creds.session_token(), None);
    }

    #[test]
    fn falls_back_to_environment() {
        let creds = Credentials::resolve_with(
            &BedrockConfig::default(),
            env(&[
                ("AWS_ACCESS_KEY_ID", "AKIDENV"),
                ("AWS_SECRET_ACCESS_KEY", "env-secret"),
                ("AWS_SESSION_TOKEN", "token"),
            ]),
        )
        .unwrap();
        assert_eq!(creds.access_key_id, "AKIDENV");
        assert_eq!(creds.session_token(), Some("token"));
    }

    #[test]
    fn partial_config_falls_through() {
        let config = BedrockConfig {
            access_key_id: Some("AKIDCONFIG".into()),
            ..Default::default()
        };
        assert!(Credentials::resolve_with(&config, env(&[])).is_none());
    }

    #[test]
    fn empty_values_count_as_missing() {
        let creds = Credentials::resolve_with(
            &BedrockConfig::default(),
            env(&[("AWS_ACCESS_KEY_ID", ""), ("AWS_SECRET_ACCESS_KEY", "x")]),
        );
        assert!(creds.is_none());
    }

    #[test]
    fn missing_credentials_are_auth_errors() {
        let err = require(None).unwrap_err();
        assert!(matches!(err, MomaError::Auth(_)));
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("AKID", "very-secret", Some("tok".into()));
        let debug = format!("{creds:?}");
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("tok\""));
        assert!(debug.contains("AKID"));
    }
}
