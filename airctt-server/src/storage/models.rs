use crate::storage::schema::{
    coupon_issues, coupons, game_rewards, game_sessions, sessions, stores, wallet_transactions,
    wallets,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = coupons)]
pub struct Coupon {
    pub id: String,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub discount_type: String,
    pub discount_value: i32,
    pub valid_until: Option<NaiveDateTime>,
    pub status: String,
}

#[derive(Insertable)]
#[diesel(table_name = coupons)]
pub struct NewCoupon<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub brand: &'a str,
    pub discount_type: &'a str,
    pub discount_value: i32,
    pub valid_until: Option<NaiveDateTime>,
    pub status: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = stores)]
pub struct StoreRow {
    pub id: String,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = stores)]
pub struct NewStore<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = coupon_issues)]
#[diesel(belongs_to(Coupon, foreign_key = coupon_id))]
pub struct CouponIssue {
    pub id: String,
    pub code: String,
    pub coupon_id: String,
    pub consumer_id: String,
    pub status: String,
    pub issued_reason: String,
    pub issued_at: NaiveDateTime,
    pub used_at: Option<NaiveDateTime>,
    pub used_store_id: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = coupon_issues)]
pub struct NewCouponIssue<'a> {
    pub id: &'a str,
    pub code: &'a str,
    pub coupon_id: &'a str,
    pub consumer_id: &'a str,
    pub status: &'a str,
    pub issued_reason: &'a str,
    pub issued_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = wallets)]
pub struct Wallet {
    pub id: i32,
    pub consumer_id: String,
    pub total_points: i64,
}

#[derive(Insertable)]
#[diesel(table_name = wallets)]
pub struct NewWallet<'a> {
    pub consumer_id: &'a str,
    pub total_points: i64,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = wallet_transactions)]
#[diesel(belongs_to(Wallet, foreign_key = wallet_id))]
pub struct WalletTransaction {
    pub id: i32,
    pub wallet_id: i32,
    pub tx_type: String,
    pub amount_points: i64,
    pub related_game_session_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = wallet_transactions)]
pub struct NewWalletTransaction<'a> {
    pub wallet_id: i32,
    pub tx_type: &'a str,
    pub amount_points: i64,
    pub related_game_session_id: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = game_sessions)]
pub struct GameSession {
    pub id: String,
    pub consumer_id: String,
    pub game_type: String,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub steps_cleared: i32,
    pub success: Option<bool>,
    pub client_info: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = game_sessions)]
pub struct NewGameSession<'a> {
    pub id: &'a str,
    pub consumer_id: &'a str,
    pub game_type: &'a str,
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = game_rewards)]
#[diesel(belongs_to(GameSession, foreign_key = game_session_id))]
pub struct GameReward {
    pub id: String,
    pub game_session_id: String,
    pub reward_type: String,
    pub reward_value: Option<i64>,
    pub created_coupon_issue_id: Option<String>,
    pub created_wallet_tx_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = game_rewards)]
pub struct NewGameReward<'a> {
    pub id: &'a str,
    pub game_session_id: &'a str,
    pub reward_type: &'a str,
    pub reward_value: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(primary_key(jti))]
pub struct Session {
    pub jti: String,
    pub username: String,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub jti: &'a str,
    pub username: &'a str,
}
