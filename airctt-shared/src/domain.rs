use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single coupon grant. ISSUED is the only non-terminal
/// state; USED and EXPIRED admit no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CouponStatus {
    Issued,
    Used,
    Expired,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Issued => "ISSUED",
            CouponStatus::Used => "USED",
            CouponStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CouponStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUED" => Ok(CouponStatus::Issued),
            "USED" => Ok(CouponStatus::Used),
            "EXPIRED" => Ok(CouponStatus::Expired),
            other => Err(format!("unknown coupon status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuedReason {
    Manual,
    GameReward,
}

impl IssuedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuedReason::Manual => "MANUAL",
            IssuedReason::GameReward => "GAME_REWARD",
        }
    }
}

impl fmt::Display for IssuedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssuedReason {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(IssuedReason::Manual),
            "GAME_REWARD" => Ok(IssuedReason::GameReward),
            other => Err(format!("unknown issue reason: {other}")),
        }
    }
}

/// Reward payout tags are free-form ("COUPON_90", "POINT_1000", ...); the
/// dispatcher only branches on the COUPON prefix.
pub fn is_coupon_reward(reward_type: &str) -> bool {
    reward_type.starts_with("COUPON")
}

/// Coupon template as seeded from config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub discount_type: String,
    pub discount_value: i32,
    pub valid_until: Option<chrono::NaiveDateTime>,
    /// "active" templates are eligible for game-reward payouts.
    pub status: String,
}

/// Redemption location as seeded from config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_status_round_trip() {
        for s in [CouponStatus::Issued, CouponStatus::Used, CouponStatus::Expired] {
            assert_eq!(s.as_str().parse::<CouponStatus>().unwrap(), s);
        }
        assert!("BOGUS".parse::<CouponStatus>().is_err());
    }

    #[test]
    fn reward_type_prefix_branch() {
        assert!(is_coupon_reward("COUPON_90"));
        assert!(is_coupon_reward("COUPON"));
        assert!(!is_coupon_reward("POINT_1000"));
    }
}
