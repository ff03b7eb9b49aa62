use airctt_shared::auth::{PLACEHOLDER_CONSUMER_ID, Role};
use airctt_shared::jwt::{self, JwtClaims};
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use tracing::{error, warn};

use super::{AppError, AppState};

/// How many days of inactivity before a session is considered expired.
const SESSION_IDLE_DAYS: i64 = 14;
/// How many days before mandatory re-login.
const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct AuthCtx {
    pub username: String,
    pub role: Role,
    pub consumer_id: String,
    pub store_id: Option<String>,
}

impl AuthCtx {
    /// Identity for requests without a bearer token: the all-zero demo
    /// consumer.
    fn placeholder() -> Self {
        Self {
            username: "anonymous".to_string(),
            role: Role::Consumer,
            consumer_id: PLACEHOLDER_CONSUMER_ID.to_string(),
            store_id: None,
        }
    }

    /// True when the request carried no bearer token at all.
    pub fn is_anonymous(&self) -> bool {
        self.consumer_id == PLACEHOLDER_CONSUMER_ID && self.store_id.is_none()
    }
}

/// Resolve the caller identity. A missing Authorization header falls back
/// to the placeholder consumer; a present but invalid token is rejected.
pub async fn resolve_identity(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(header_val) = req.headers().get(header::AUTHORIZATION) else {
        let auth = AuthCtx::placeholder();
        record_identity_on_span(&auth);
        req.extensions_mut().insert(auth);
        return Ok(next.run(req).await);
    };
    let header_str = header_val.to_str().map_err(|_| AppError::unauthorized())?;
    let prefix = "Bearer ";
    if !header_str.starts_with(prefix) {
        return Err(AppError::unauthorized());
    }
    let token = &header_str[prefix.len()..];

    let claims = match jwt::decode_and_verify(token, state.config.jwt_secret.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error=%e, "auth: jwt decode failed");
            return Err(AppError::unauthorized());
        }
    };

    validate_claims(&state, &claims).map_err(|e| {
        warn!(error=?e, username=%claims.sub, "auth: validate_claims failed");
        AppError::unauthorized()
    })?;

    let cutoff = Utc::now() - Duration::days(SESSION_IDLE_DAYS);
    match state
        .store
        .touch_session_with_cutoff(&claims.jti, cutoff.naive_utc())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                jti = %claims.jti,
                username = %claims.sub,
                cutoff = %cutoff,
                "auth: session missing or expired (last_used_at < cutoff)"
            );
            return Err(AppError::unauthorized());
        }
        Err(e) => {
            error!(jti = %claims.jti, error=%e, "auth: touch_session_with_cutoff failed");
            return Err(AppError::internal(e));
        }
    }

    let consumer_id = claims
        .consumer_id
        .clone()
        .unwrap_or_else(|| PLACEHOLDER_CONSUMER_ID.to_string());
    let auth = AuthCtx {
        username: claims.sub,
        role: claims.role,
        consumer_id,
        store_id: claims.store_id,
    };
    record_identity_on_span(&auth);
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Fill the identity fields the request span declared as Empty. Runs
/// inside the trace span, so the fields show up on every later event of
/// the request.
fn record_identity_on_span(auth: &AuthCtx) {
    let span = tracing::Span::current();
    span.record("username", tracing::field::display(&auth.username));
    span.record("role", tracing::field::debug(&auth.role));
    span.record("consumer_id", tracing::field::display(&auth.consumer_id));
}

pub async fn issue_jwt_for_user(
    state: &AppState,
    username: &str,
    role: Role,
    consumer_id: Option<String>,
    store_id: Option<String>,
) -> Result<String, AppError> {
    let jti = uuid::Uuid::new_v4().to_string();
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp();
    let claims = JwtClaims {
        sub: username.to_string(),
        jti: jti.clone(),
        exp,
        role,
        consumer_id,
        store_id,
    };

    validate_claims(state, &claims)?;

    state
        .store
        .create_session(&jti, username)
        .await
        .map_err(|e| {
            error!(username, error=%e, "login: create_session failed");
            AppError::internal(e)
        })?;
    let token = jwt::encode(&claims, state.config.jwt_secret.as_bytes()).map_err(|e| {
        error!(username, error=%e, "login: jwt encode failed");
        AppError::internal(e)
    })?;
    Ok(token)
}

fn validate_claims(state: &AppState, claims: &JwtClaims) -> Result<(), AppError> {
    let user = state
        .config
        .users
        .iter()
        .find(|u| u.username == claims.sub)
        .ok_or_else(|| {
            warn!(username = %claims.sub, "issue_jwt: unknown user");
            AppError::forbidden()
        })?;

    if user.role != claims.role {
        warn!(
            username = %claims.sub,
            requested_role = ?claims.role,
            actual_role = ?user.role,
            "issue_jwt: role mismatch"
        );
        return Err(AppError::forbidden());
    }

    match claims.role {
        Role::Consumer => {
            let consumer_id = claims.consumer_id.as_deref().ok_or_else(|| {
                warn!(username = %claims.sub, "issue_jwt: consumer token missing consumer_id");
                AppError::forbidden()
            })?;
            let expected = user.consumer_id.as_deref().ok_or_else(|| {
                warn!(
                    username = %claims.sub,
                    "issue_jwt: user missing consumer binding in config"
                );
                AppError::forbidden()
            })?;
            if expected != consumer_id {
                warn!(
                    username = %claims.sub,
                    expected = expected,
                    requested = consumer_id,
                    "issue_jwt: consumer mismatch"
                );
                return Err(AppError::forbidden());
            }
        }
        Role::Merchant => {
            let store_id = claims.store_id.as_deref().ok_or_else(|| {
                warn!(username = %claims.sub, "issue_jwt: merchant token missing store_id");
                AppError::forbidden()
            })?;
            let expected = user.store_id.as_deref().ok_or_else(|| {
                warn!(
                    username = %claims.sub,
                    "issue_jwt: user missing store binding in config"
                );
                AppError::forbidden()
            })?;
            if expected != store_id {
                warn!(
                    username = %claims.sub,
                    expected = expected,
                    requested = store_id,
                    "issue_jwt: store mismatch"
                );
                return Err(AppError::forbidden());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;
        fn make_writer(&'a self) -> Capture {
            self.clone()
        }
    }

    #[test]
    fn identity_fields_land_on_the_request_span() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            // Same shape as the server's request span: fields declared
            // Empty up front, filled once the identity resolves.
            let span = tracing::info_span!(
                "request",
                username = tracing::field::Empty,
                role = tracing::field::Empty,
                consumer_id = tracing::field::Empty
            );
            let _guard = span.enter();
            record_identity_on_span(&AuthCtx::placeholder());
            tracing::info!("identity resolved");
        });
        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("username=anonymous"), "{out}");
        assert!(out.contains(PLACEHOLDER_CONSUMER_ID), "{out}");
    }
}
