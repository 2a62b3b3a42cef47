use log::debug;
use serde::Deserialize;

use crate::auth::{self, Claims};
use crate::db::DbPool;

/// Why a protected request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoSession,
    InvalidSession,
}

impl DenyReason {
    /// Value for the login redirect's `error` query parameter. A missing
    /// session is the ordinary signed-out case and carries no error marker;
    /// a failed verification does.
    pub fn query_error(&self) -> Option<&'static str> {
        match self {
            DenyReason::NoSession => None,
            DenyReason::InvalidSession => Some("auth"),
        }
    }
}

/// Outcome of the per-request session check. `Allowed(None)` means the
/// path is public and no verification was attempted.
#[derive(Debug, PartialEq)]
pub enum RouteDecision {
    Allowed(Option<Claims>),
    Denied(DenyReason),
}

/// Configured set of path prefixes that require a live session.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ProtectedPaths(Vec<String>);

impl ProtectedPaths {
    pub fn is_protected(&self, path: &str) -> bool {
        self.0.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

impl Default for ProtectedPaths {
    fn default() -> Self {
        ProtectedPaths(vec!["/dashboard".into(), "/settings".into()])
    }
}

/// Stateless per-request decision. Public paths pass unconditionally;
/// protected paths need a token that the identity layer accepts. The guard
/// itself holds no session data and delegates all verification.
pub async fn decide(
    pool: &DbPool,
    protected: &ProtectedPaths,
    path: &str,
    token: Option<&str>,
) -> RouteDecision {
    if !protected.is_protected(path) {
        return RouteDecision::Allowed(None);
    }
    match token {
        None => RouteDecision::Denied(DenyReason::NoSession),
        Some(token) => match auth::verify_session_token(pool, token).await {
            Ok(claims) => RouteDecision::Allowed(Some(claims)),
            Err(err) => {
                debug!("denying {path}: {err}");
                RouteDecision::Denied(DenyReason::InvalidSession)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn test_pool() -> (DbPool, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = db::init_db(&dir.path().join("guard.sqlite"));
        (pool, dir)
    }

    #[test]
    fn prefix_matching() {
        let paths = ProtectedPaths::default();
        assert!(paths.is_protected("/dashboard"));
        assert!(paths.is_protected("/dashboard/expenses/3/paid"));
        assert!(paths.is_protected("/settings"));
        assert!(!paths.is_protected("/login"));
        assert!(!paths.is_protected("/"));
    }

    #[rocket::async_test]
    async fn public_paths_pass_without_verification() {
        let (pool, _dir) = test_pool();
        let decision = decide(&pool, &ProtectedPaths::default(), "/login", None).await;
        assert_eq!(decision, RouteDecision::Allowed(None));

        // Even a garbage token is never inspected on a public path.
        let decision = decide(
            &pool,
            &ProtectedPaths::default(),
            "/login",
            Some("garbage"),
        )
        .await;
        assert_eq!(decision, RouteDecision::Allowed(None));
    }

    #[rocket::async_test]
    async fn missing_token_on_protected_path() {
        let (pool, _dir) = test_pool();
        let decision = decide(&pool, &ProtectedPaths::default(), "/dashboard", None).await;
        assert_eq!(decision, RouteDecision::Denied(DenyReason::NoSession));
        assert_eq!(DenyReason::NoSession.query_error(), None);
    }

    #[rocket::async_test]
    async fn unverifiable_token_on_protected_path() {
        let (pool, _dir) = test_pool();
        let decision = decide(
            &pool,
            &ProtectedPaths::default(),
            "/dashboard",
            Some("not-a-session"),
        )
        .await;
        assert_eq!(decision, RouteDecision::Denied(DenyReason::InvalidSession));
        assert_eq!(DenyReason::InvalidSession.query_error(), Some("auth"));
    }

    #[rocket::async_test]
    async fn verified_token_is_allowed_with_claims() {
        let (pool, _dir) = test_pool();
        let (principal, token) = auth::sign_up(&pool, "a@example.com", "hunter22", 5)
            .await
            .unwrap();

        let decision = decide(
            &pool,
            &ProtectedPaths::default(),
            "/dashboard",
            Some(&token),
        )
        .await;
        match decision {
            RouteDecision::Allowed(Some(claims)) => {
                assert_eq!(claims.user_id, principal.user_id);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }
}
