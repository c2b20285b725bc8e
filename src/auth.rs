use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    error::ApiError,
    repository::{Repository, RepositoryState},
    token::TokenCodec,
};

/// Role names as stored in the `roles` table.
pub const ADMIN: &str = "Admin";
pub const POSTER: &str = "Poster";

/// AuthUser
///
/// The resolved identity of an authenticated request. Built fresh from the bearer token
/// on every request; nothing is remembered between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    /// Name of the user's assigned role.
    pub role: String,
}

impl AuthUser {
    /// Admins hold every role. Anyone else holds exactly their assigned role.
    pub fn has_role(&self, required: &str) -> bool {
        self.role == ADMIN || self.role == required
    }
}

/// Extracts the credential from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// authenticate
///
/// Resolves the request's bearer token to a user: token -> user id -> user row -> role.
/// A missing or unverifiable token, or a user that no longer exists, is `Unauthorized`.
pub async fn authenticate(
    repo: &dyn Repository,
    tokens: &TokenCodec,
    headers: &HeaderMap,
) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    let user_id = tokens.verify(token).ok_or(ApiError::Unauthorized)?;
    let user = repo.get_user(user_id).await?.ok_or(ApiError::Unauthorized)?;

    let role = repo
        .get_role(user.role_id)
        .await?
        .map(|role| role.role_name)
        .unwrap_or_default();

    Ok(AuthUser {
        id: user.id,
        username: user.username,
        role,
    })
}

/// Denies an authenticated user that does not hold `required`.
pub fn authorize(user: &AuthUser, required: &str) -> Result<(), ApiError> {
    if user.has_role(required) {
        Ok(())
    } else {
        tracing::debug!(user_id = user.id, role = %user.role, %required, "role check failed");
        Err(ApiError::Forbidden(required.to_string()))
    }
}

/// require_role
///
/// Middleware stage for protected routes. The state carries the role the route requires:
///
/// ```ignore
/// router.route_layer(middleware::from_fn_with_state((state, auth::POSTER), auth::require_role))
/// ```
///
/// On success the resolved [`AuthUser`] is stored in the request extensions, where the
/// `AuthUser` extractor picks it up without a second lookup.
pub async fn require_role(
    State((state, required)): State<(AppState, &'static str)>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(state.repo.as_ref(), &state.tokens, request.headers()).await?;
    authorize(&user, required)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// AuthUser Extractor Implementation
///
/// Uses the identity already resolved by [`require_role`] when present, and otherwise
/// authenticates the bearer token itself. Rejects with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenCodec: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let tokens = TokenCodec::from_ref(state);
        authenticate(repo.as_ref(), &tokens, &parts.headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user_with_role(role: &str) -> AuthUser {
        AuthUser {
            id: 1,
            username: "someone".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn admin_holds_every_role() {
        let admin = user_with_role(ADMIN);
        for required in [ADMIN, POSTER, "Moderator"] {
            assert!(authorize(&admin, required).is_ok());
        }
    }

    #[test]
    fn other_roles_hold_only_themselves() {
        let poster = user_with_role(POSTER);
        assert!(authorize(&poster, POSTER).is_ok());
        assert!(matches!(
            authorize(&poster, ADMIN),
            Err(ApiError::Forbidden(role)) if role == ADMIN
        ));
        assert!(authorize(&poster, "Moderator").is_err());
    }

    #[test]
    fn bearer_scheme_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(bearer_token(&headers), Some("xyz"));
    }
}
