pub mod auth;
mod config;

use crate::server::auth::AuthCtx;
use crate::storage::StorageError;
use airctt_shared::api;
use airctt_shared::auth::Role;
use airctt_shared::domain::IssuedReason;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{Extension, FromRequest, Request, State},
    http::{Method, StatusCode, header},
    routing::{get, post},
};
use bcrypt::verify;
use chrono::NaiveDateTime;
pub use config::{AppConfig, UserConfig};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info_span;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: crate::storage::Store,
}

impl AppState {
    pub fn new(config: AppConfig, store: crate::storage::Store) -> Self {
        Self { config, store }
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

/// Json extractor that reports malformed or incomplete request bodies as
/// 400 instead of axum's default 422.
struct Body<T>(T);

impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Body(value)),
            Err(rej) => Err(AppError::bad_request(rej.body_text())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let ledger = Router::new()
        .route("/api/v1/coupons/issue", post(api_issue_coupon))
        .route("/api/v1/coupons/use", post(api_use_coupon))
        .route("/api/v1/merchant/check-coupon", post(api_check_coupon))
        .route("/api/v1/game/start", post(api_game_start))
        .route("/api/v1/game/finish", post(api_game_finish))
        .route("/api/v1/rewards/claim", post(api_claim_reward))
        .route("/api/v1/wallet/transaction", post(api_wallet_transaction))
        .route("/api/v1/wallet/my-balance", get(api_my_balance))
        .route("/api/v1/wallet/my-coupons", get(api_my_coupons))
        .route("/api/v1/wallet/my-history", get(api_my_history))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_identity,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            username = tracing::field::Empty,
            role = tracing::field::Empty,
            consumer_id = tracing::field::Empty
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/v1/auth/login", post(api_auth_login))
        .merge(ledger)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured

    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    // Put into request extensions for trace layer & handlers
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    // Set header on response
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    // HSTS is only honored on HTTPS; harmless otherwise
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    // Disable caching for API and health endpoints
    if path == "/healthz" || path.starts_with("/api/") || path == "/api" {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
        headers.insert(
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        );
        headers.insert(
            HeaderName::from_static("expires"),
            HeaderValue::from_static("0"),
        );
    }

    Ok(resp)
}

async fn api_auth_login(
    State(state): State<AppState>,
    Json(body): Json<api::AuthReq>,
) -> Result<Json<api::AuthResp>, AppError> {
    // Find user in config
    let user = state
        .config
        .users
        .iter()
        .find(|u| u.username == body.username)
        .ok_or_else(|| {
            tracing::warn!(username=%body.username, "login: unknown username");
            AppError::unauthorized()
        })?;
    if !verify(&body.password, &user.password_hash).map_err(|e| {
        tracing::error!(username=%body.username, error=%e, "login: bcrypt verify failed");
        AppError::internal(e)
    })? {
        tracing::warn!(username=%body.username, "login: invalid password");
        return Err(AppError::unauthorized());
    }
    let token = auth::issue_jwt_for_user(
        &state,
        &user.username,
        user.role,
        user.consumer_id.clone(),
        user.store_id.clone(),
    )
    .await?;
    Ok(Json(api::AuthResp { token }))
}

async fn api_issue_coupon(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Body(body): Body<api::IssueCouponReq>,
) -> Result<Json<api::IssueCouponResp>, AppError> {
    let reason = match body.reason.as_deref() {
        None | Some("") => IssuedReason::Manual,
        Some(r) => r
            .parse::<IssuedReason>()
            .map_err(AppError::bad_request)?,
    };
    let issue = state
        .store
        .issue_coupon(&body.consumer_id, &body.coupon_id, reason)
        .await?;
    Ok(Json(api::IssueCouponResp {
        coupon_issue_id: issue.id,
        status: issue.status,
    }))
}

async fn api_use_coupon(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Body(body): Body<api::UseCouponReq>,
) -> Result<Json<api::UseCouponResp>, AppError> {
    if body.coupon_issue_id.trim().is_empty() {
        return Err(AppError::bad_request("coupon_issue_id required"));
    }
    if body.store_id.trim().is_empty() {
        return Err(AppError::bad_request("store_id required"));
    }
    let issue = state
        .store
        .redeem_coupon(&body.coupon_issue_id, &body.store_id)
        .await?;
    let used_at = issue
        .used_at
        .map(to_rfc3339)
        .ok_or_else(|| AppError::internal("redeemed coupon missing used_at"))?;
    Ok(Json(api::UseCouponResp {
        id: issue.id,
        status: issue.status,
        used_at,
    }))
}

async fn api_check_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Body(body): Body<api::CheckCouponReq>,
) -> Result<Json<api::CheckCouponResp>, AppError> {
    // Any merchant (or the anonymous demo identity) may check; a consumer
    // token gets no access to the merchant surface.
    if !auth.is_anonymous() && auth.role != Role::Merchant {
        return Err(AppError::forbidden());
    }
    if body.code_or_id.trim().is_empty() {
        return Err(AppError::bad_request("code_or_id required"));
    }
    let (issue, template) = state.store.find_coupon_issue(&body.code_or_id).await?;
    Ok(Json(api::CheckCouponResp {
        id: issue.id,
        status: issue.status,
        title: template.title,
        description: template.description,
        discount_type: template.discount_type,
        discount_value: template.discount_value,
        valid_until: template.valid_until.map(to_rfc3339),
    }))
}

async fn api_game_start(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Body(body): Body<api::GameStartReq>,
) -> Result<Json<api::GameStartResp>, AppError> {
    let session = state
        .store
        .start_game_session(&body.consumer_id, &body.game_type)
        .await?;
    Ok(Json(api::GameStartResp {
        session_id: session.id,
        started_at: to_rfc3339(session.started_at),
    }))
}

async fn api_game_finish(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Body(body): Body<api::GameFinishReq>,
) -> Result<Json<api::GameFinishResp>, AppError> {
    if body.session_id.trim().is_empty() {
        return Err(AppError::bad_request("session_id required"));
    }
    let client_info = body
        .client_info
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(AppError::internal)?;
    let reward = state
        .store
        .finish_game_session(
            &body.session_id,
            body.steps_cleared.unwrap_or(0),
            body.success.unwrap_or(false),
            client_info,
        )
        .await?;
    let resp = match reward {
        Some(reward) => api::GameFinishResp {
            success: true,
            reward_id: Some(reward.id),
            reward_type: Some(reward.reward_type),
            reward_value: reward.reward_value,
            message: None,
        },
        None => api::GameFinishResp {
            success: false,
            reward_id: None,
            reward_type: None,
            reward_value: None,
            message: Some("no reward for this session".to_string()),
        },
    };
    Ok(Json(resp))
}

async fn api_claim_reward(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Body(body): Body<api::ClaimRewardReq>,
) -> Result<Json<api::ClaimRewardResp>, AppError> {
    if body.reward_id.trim().is_empty() {
        return Err(AppError::bad_request("reward_id required"));
    }
    let outcome = state.store.claim_reward(&body.reward_id).await?;
    Ok(Json(api::ClaimRewardResp {
        status: "ok".to_string(),
        coupon_issue_id: outcome.coupon_issue_id,
        wallet_tx_id: outcome.wallet_tx_id,
    }))
}

async fn api_wallet_transaction(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Body(body): Body<api::WalletTxReq>,
) -> Result<Json<api::WalletTxResp>, AppError> {
    let (tx_id, new_balance) = state
        .store
        .record_wallet_tx(&body.consumer_id, &body.tx_type, body.amount_points, None)
        .await?;
    Ok(Json(api::WalletTxResp {
        status: "ok".to_string(),
        wallet_tx_id: tx_id,
        new_balance,
    }))
}

async fn api_my_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::BalanceDto>, AppError> {
    let balance = state.store.wallet_balance(&auth.consumer_id).await?;
    Ok(Json(api::BalanceDto { balance }))
}

async fn api_my_coupons(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::WalletCouponDto>>, AppError> {
    let rows = state
        .store
        .list_coupons_for_consumer(&auth.consumer_id)
        .await?;
    let items = rows
        .into_iter()
        .map(|(issue, template)| api::WalletCouponDto {
            id: issue.id,
            title: template.title,
            description: template.description,
            brand: template.brand,
            status: issue.status,
            expires_at: template.valid_until.map(to_rfc3339),
            discount_rate: template.discount_value,
        })
        .collect();
    Ok(Json(items))
}

async fn api_my_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::WalletHistoryItemDto>>, AppError> {
    let rows = state.store.wallet_history(&auth.consumer_id).await?;
    let items = rows
        .into_iter()
        .map(|tx| api::WalletHistoryItemDto {
            id: tx.id,
            user_id: auth.consumer_id.clone(),
            amount: tx.amount_points,
            direction: if tx.amount_points >= 0 {
                "earned".to_string()
            } else {
                "used".to_string()
            },
            description: tx.tx_type,
            created_at: to_rfc3339(tx.created_at),
        })
        .collect();
    Ok(Json(items))
}

fn to_rfc3339(dt: NaiveDateTime) -> String {
    chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(dt, chrono::Utc).to_rfc3339()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn forbidden() -> Self {
        Self::Forbidden
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidInput(m) => AppError::BadRequest(m),
            StorageError::NotFound(m) => AppError::NotFound(m),
            StorageError::InvalidState(m) => AppError::BadRequest(m),
            StorageError::AlreadyClaimed(m) => AppError::BadRequest(m),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".into(), "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::error!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(ErrorBody { error: msg });
        (status, body).into_response()
    }
}
