use super::API_V1_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

pub fn auth_login(base: &str) -> String {
    base_join(base, &format!("{}/auth/login", API_V1_PREFIX))
}
pub fn coupons_issue(base: &str) -> String {
    base_join(base, &format!("{}/coupons/issue", API_V1_PREFIX))
}
pub fn coupons_use(base: &str) -> String {
    base_join(base, &format!("{}/coupons/use", API_V1_PREFIX))
}
pub fn merchant_check_coupon(base: &str) -> String {
    base_join(base, &format!("{}/merchant/check-coupon", API_V1_PREFIX))
}
pub fn game_start(base: &str) -> String {
    base_join(base, &format!("{}/game/start", API_V1_PREFIX))
}
pub fn game_finish(base: &str) -> String {
    base_join(base, &format!("{}/game/finish", API_V1_PREFIX))
}
pub fn rewards_claim(base: &str) -> String {
    base_join(base, &format!("{}/rewards/claim", API_V1_PREFIX))
}
pub fn wallet_transaction(base: &str) -> String {
    base_join(base, &format!("{}/wallet/transaction", API_V1_PREFIX))
}
pub fn wallet_my_balance(base: &str) -> String {
    base_join(base, &format!("{}/wallet/my-balance", API_V1_PREFIX))
}
pub fn wallet_my_coupons(base: &str) -> String {
    base_join(base, &format!("{}/wallet/my-coupons", API_V1_PREFIX))
}
pub fn wallet_my_history(base: &str) -> String {
    base_join(base, &format!("{}/wallet/my-history", API_V1_PREFIX))
}
