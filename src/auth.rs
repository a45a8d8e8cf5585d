//! API-key identity resolution: the `resolveUser`/`isAdmin` collaborator.
//!
//! The core never parses credentials; this layer maps an API key from
//! `Authorization: Bearer <key>` or `X-API-Key: <key>` to a pre-resolved
//! [`AuthUser`] before a request reaches any handler. Keys come from
//! `API_KEYS` (format: `key1:1:user,key2:2:admin`). When `DISABLE_AUTH=true`
//! or no keys are configured, every request runs as user 0 (dev bypass).

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::UserId;

/// Role attached to an API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("user") {
            Some(Role::User)
        } else if s.eq_ignore_ascii_case("admin") {
            Some(Role::Admin)
        } else {
            None
        }
    }
}

/// Resolved identity injected by the auth middleware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Default for AuthUser {
    fn default() -> Self {
        Self {
            user_id: UserId(0),
            role: Role::User,
        }
    }
}

/// Returns `Ok(())` for admins; otherwise a 403 response. Use in admin-only
/// handlers: `require_admin(&auth)?`.
pub fn require_admin(user: &AuthUser) -> Result<(), Response> {
    if user.is_admin() {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "admin role required").into_response())
    }
}

/// Key → identity map plus the dev-bypass flag. Built from env or literals.
#[derive(Clone)]
pub struct AuthConfig {
    pub disable: bool,
    keys: Arc<HashMap<String, AuthUser>>,
}

impl AuthConfig {
    /// Auth disabled: every request runs as user 0.
    pub fn disabled() -> Self {
        Self {
            disable: true,
            keys: Arc::new(HashMap::new()),
        }
    }

    /// Parses `key:user_id:role` triples separated by commas. Malformed
    /// entries are skipped. An empty map disables auth.
    pub fn from_keys(keys: &str) -> Self {
        let map: HashMap<String, AuthUser> = keys
            .split(',')
            .filter_map(|part| {
                let mut split = part.trim().splitn(3, ':');
                let key = split.next()?.trim().to_string();
                let user_id: u64 = split.next()?.trim().parse().ok()?;
                let role = Role::parse(split.next()?.trim())?;
                if key.is_empty() {
                    return None;
                }
                Some((
                    key,
                    AuthUser {
                        user_id: UserId(user_id),
                        role,
                    },
                ))
            })
            .collect();
        Self {
            disable: map.is_empty(),
            keys: Arc::new(map),
        }
    }

    /// Loads from env: `DISABLE_AUTH=true` or unset/empty `API_KEYS` means
    /// the dev bypass; otherwise `API_KEYS=key:user_id:role,...`.
    pub fn from_env() -> Self {
        let disable = std::env::var("DISABLE_AUTH")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let config = std::env::var("API_KEYS")
            .ok()
            .map(|s| Self::from_keys(&s))
            .unwrap_or_else(Self::disabled);
        Self {
            disable: disable || config.disable,
            keys: config.keys,
        }
    }

    pub fn resolve(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).copied()
    }
}

/// Extracts the API key from `Authorization: Bearer <key>` or `X-API-Key`.
fn api_key_from_request(req: &Request) -> Option<String> {
    if let Some(v) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(s) = v.to_str() {
            let s = s.trim();
            if s.len() >= 7 && s.get(..7).map(|p| p.eq_ignore_ascii_case("bearer ")).unwrap_or(false) {
                return Some(s.get(7..).unwrap_or("").trim().to_string());
            }
        }
    }
    if let Some(v) = req.headers().get("X-API-Key") {
        if let Ok(s) = v.to_str() {
            return Some(s.trim().to_string());
        }
    }
    None
}

/// Auth middleware: injects the resolved [`AuthUser`] or returns 401.
/// With auth disabled, injects the default user and continues.
pub async fn resolve_user(mut req: Request<Body>, next: Next, config: AuthConfig) -> Response {
    if config.disable {
        req.extensions_mut().insert(AuthUser::default());
        return next.run(req).await;
    }

    let key = match api_key_from_request(&req) {
        Some(k) if !k.is_empty() => k,
        _ => {
            return (StatusCode::UNAUTHORIZED, "missing or invalid Authorization or X-API-Key")
                .into_response();
        }
    };

    match config.resolve(&key) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => (StatusCode::UNAUTHORIZED, "invalid API key").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_keys_parses_triples() {
        let config = AuthConfig::from_keys("alpha:1:user, beta:2:admin");
        assert!(!config.disable);
        assert_eq!(
            config.resolve("alpha"),
            Some(AuthUser {
                user_id: UserId(1),
                role: Role::User
            })
        );
        assert_eq!(
            config.resolve("beta"),
            Some(AuthUser {
                user_id: UserId(2),
                role: Role::Admin
            })
        );
        assert_eq!(config.resolve("gamma"), None);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let config = AuthConfig::from_keys("good:1:user,missing-role:2,:3:user,bad:notnum:admin");
        assert!(config.resolve("good").is_some());
        assert!(config.resolve("missing-role").is_none());
        assert!(config.resolve("bad").is_none());
    }

    #[test]
    fn empty_key_set_disables_auth() {
        let config = AuthConfig::from_keys("");
        assert!(config.disable);
    }

    #[test]
    fn require_admin_rejects_plain_user() {
        let user = AuthUser {
            user_id: UserId(1),
            role: Role::User,
        };
        assert!(require_admin(&user).is_err());
        let admin = AuthUser {
            user_id: UserId(2),
            role: Role::Admin,
        };
        assert!(require_admin(&admin).is_ok());
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("User"), Some(Role::User));
        assert_eq!(Role::parse("operator"), None);
    }
}
