use serde::{Deserialize, Serialize};

pub mod endpoints;

pub const API_V1_PREFIX: &str = "/api/v1";

// Auth
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
}

// Coupon ledger
#[derive(Debug, Serialize, Deserialize)]
pub struct IssueCouponReq {
    pub consumer_id: String,
    pub coupon_id: String,
    /// Defaults to MANUAL when absent.
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueCouponResp {
    pub coupon_issue_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UseCouponReq {
    pub coupon_issue_id: String,
    pub store_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UseCouponResp {
    pub id: String,
    pub status: String,
    pub used_at: String, // RFC3339 UTC
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckCouponReq {
    pub code_or_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckCouponResp {
    pub id: String,
    pub status: String,
    pub title: String,
    pub description: String,
    pub discount_type: String,
    pub discount_value: i32,
    pub valid_until: Option<String>, // RFC3339 UTC
}

// Game sessions
#[derive(Debug, Serialize, Deserialize)]
pub struct GameStartReq {
    pub consumer_id: String,
    pub game_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameStartResp {
    pub session_id: String,
    pub started_at: String, // RFC3339 UTC
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameFinishReq {
    pub session_id: String,
    pub steps_cleared: Option<i32>,
    pub success: Option<bool>,
    pub client_info: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameFinishResp {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// Reward claim
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRewardReq {
    pub reward_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRewardResp {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_issue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_tx_id: Option<i32>,
}

// Wallet
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletTxReq {
    pub consumer_id: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub amount_points: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletTxResp {
    pub status: String,
    pub wallet_tx_id: i32,
    pub new_balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceDto {
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCouponDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub status: String,
    pub expires_at: Option<String>, // RFC3339 UTC
    pub discount_rate: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletHistoryItemDto {
    pub id: i32,
    pub user_id: String,
    pub amount: i64,
    /// "earned" when amount >= 0, "used" otherwise.
    #[serde(rename = "type")]
    pub direction: String,
    pub description: String,
    pub created_at: String, // RFC3339 UTC
}
