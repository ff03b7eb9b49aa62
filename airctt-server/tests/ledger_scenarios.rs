use airctt_server::storage::{self, StorageError, Store};
use airctt_shared::domain::{CouponTemplate, IssuedReason, Store as StoreLocation};
use chrono::{Duration, Utc};
use diesel::prelude::*;

struct TestStore {
    store: Store,
    db_path: std::path::PathBuf,
    _tempdir: tempfile::TempDir,
}

async fn setup(templates: Vec<CouponTemplate>) -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let store = Store::connect_sqlite(db_path.to_str().unwrap())
        .await
        .expect("db");
    let stores = vec![StoreLocation {
        id: "s1".into(),
        name: "Gangnam flagship".into(),
    }];
    store
        .seed_from_config(&templates, &stores)
        .await
        .expect("seed");
    TestStore {
        store,
        db_path,
        _tempdir: dir,
    }
}

fn active_template(id: &str) -> CouponTemplate {
    CouponTemplate {
        id: id.into(),
        title: "Latte 90% off".into(),
        description: "One free-ish latte".into(),
        brand: "AIRCTT Cafe".into(),
        discount_type: "percent".into(),
        discount_value: 90,
        valid_until: Some((Utc::now() + Duration::days(30)).naive_utc()),
        status: "active".into(),
    }
}

fn expired_template(id: &str) -> CouponTemplate {
    CouponTemplate {
        valid_until: Some((Utc::now() - Duration::days(1)).naive_utc()),
        ..active_template(id)
    }
}

fn inactive_template(id: &str) -> CouponTemplate {
    CouponTemplate {
        status: "inactive".into(),
        ..active_template(id)
    }
}

/// Insert a game reward row directly; finish_game_session only mints the
/// fixed coupon reward, so point-type rewards come from here.
fn insert_raw_reward(
    ts: &TestStore,
    reward_id: &str,
    session_id: &str,
    reward_type: &str,
    reward_value: Option<i64>,
) {
    use airctt_server::storage::schema::game_rewards::dsl as gr;
    let mut conn = SqliteConnection::establish(ts.db_path.to_str().unwrap()).unwrap();
    diesel::insert_into(gr::game_rewards)
        .values((
            gr::id.eq(reward_id),
            gr::game_session_id.eq(session_id),
            gr::reward_type.eq(reward_type),
            gr::reward_value.eq(reward_value),
            gr::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .unwrap();
}

#[tokio::test]
async fn redeem_is_exactly_once() {
    let ts = setup(vec![active_template("c1")]).await;

    let issue = ts
        .store
        .issue_coupon("u1", "c1", IssuedReason::Manual)
        .await
        .unwrap();
    assert_eq!(issue.status, "ISSUED");
    assert_eq!(issue.issued_reason, "MANUAL");
    assert!(issue.used_at.is_none());

    let used = ts.store.redeem_coupon(&issue.id, "s1").await.unwrap();
    assert_eq!(used.status, "USED");
    assert!(used.used_at.is_some());
    assert_eq!(used.used_store_id.as_deref(), Some("s1"));

    let err = ts.store.redeem_coupon(&issue.id, "s1").await.unwrap_err();
    match err {
        StorageError::InvalidState(msg) => assert!(msg.contains("USED"), "{msg}"),
        other => panic!("expected InvalidState, got {other:?}"),
    }
}

#[tokio::test]
async fn redeem_unknown_issue_is_not_found() {
    let ts = setup(vec![active_template("c1")]).await;
    let err = ts.store.redeem_coupon("nope", "s1").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn redeem_of_lapsed_coupon_expires_it() {
    let ts = setup(vec![expired_template("c-old")]).await;
    let issue = ts
        .store
        .issue_coupon("u1", "c-old", IssuedReason::Manual)
        .await
        .unwrap();

    let err = ts.store.redeem_coupon(&issue.id, "s1").await.unwrap_err();
    match err {
        StorageError::InvalidState(msg) => assert!(msg.contains("EXPIRED"), "{msg}"),
        other => panic!("expected InvalidState, got {other:?}"),
    }
    // The transition is persisted, not just reported
    let (reloaded, _) = ts.store.find_coupon_issue(&issue.id).await.unwrap();
    assert_eq!(reloaded.status, "EXPIRED");
}

#[tokio::test]
async fn concurrent_redeems_produce_one_winner() {
    let ts = setup(vec![active_template("c1")]).await;
    let issue = ts
        .store
        .issue_coupon("u1", "c1", IssuedReason::Manual)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        ts.store.redeem_coupon(&issue.id, "s1"),
        ts.store.redeem_coupon(&issue.id, "s1"),
    );
    assert_eq!(
        a.is_ok() as u8 + b.is_ok() as u8,
        1,
        "exactly one redeem must win: {a:?} / {b:?}"
    );
}

#[tokio::test]
async fn lookup_by_id_and_code() {
    let ts = setup(vec![active_template("c1")]).await;
    let issue = ts
        .store
        .issue_coupon("u1", "c1", IssuedReason::Manual)
        .await
        .unwrap();

    let (by_id, template) = ts.store.find_coupon_issue(&issue.id).await.unwrap();
    assert_eq!(by_id.id, issue.id);
    assert_eq!(template.title, "Latte 90% off");

    let (by_code, _) = ts.store.find_coupon_issue(&issue.code).await.unwrap();
    assert_eq!(by_code.id, issue.id);

    let err = ts.store.find_coupon_issue("missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn issue_requires_both_ids() {
    let ts = setup(vec![active_template("c1")]).await;
    let err = ts
        .store
        .issue_coupon("", "c1", IssuedReason::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));
    let err = ts
        .store
        .issue_coupon("u1", "  ", IssuedReason::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));
}

#[tokio::test]
async fn successful_session_mints_reward() {
    let ts = setup(vec![active_template("c1")]).await;
    let session = ts.store.start_game_session("u1", "stairs").await.unwrap();

    let reward = ts
        .store
        .finish_game_session(&session.id, 7, true, None)
        .await
        .unwrap()
        .expect("successful session must mint a reward");
    assert_eq!(reward.reward_type, storage::GAME_REWARD_TYPE);
    assert_eq!(reward.reward_value, Some(storage::GAME_REWARD_VALUE));
    assert!(reward.created_coupon_issue_id.is_none());
    assert!(reward.created_wallet_tx_id.is_none());
}

#[tokio::test]
async fn failed_session_mints_nothing() {
    let ts = setup(vec![active_template("c1")]).await;
    let session = ts.store.start_game_session("u1", "stairs").await.unwrap();
    let reward = ts
        .store
        .finish_game_session(&session.id, 2, false, None)
        .await
        .unwrap();
    assert!(reward.is_none());
}

#[tokio::test]
async fn finish_unknown_session_is_not_found() {
    let ts = setup(vec![active_template("c1")]).await;
    let err = ts
        .store
        .finish_game_session("missing", 0, true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn coupon_reward_claim_issues_once() {
    let ts = setup(vec![active_template("c1")]).await;
    let session = ts.store.start_game_session("u1", "stairs").await.unwrap();
    let reward = ts
        .store
        .finish_game_session(&session.id, 7, true, None)
        .await
        .unwrap()
        .unwrap();

    let outcome = ts.store.claim_reward(&reward.id).await.unwrap();
    let issue_id = outcome.coupon_issue_id.expect("coupon payout expected");
    assert!(outcome.wallet_tx_id.is_none());

    let (issue, _) = ts.store.find_coupon_issue(&issue_id).await.unwrap();
    assert_eq!(issue.consumer_id, "u1");
    assert_eq!(issue.issued_reason, "GAME_REWARD");
    assert_eq!(issue.status, "ISSUED");

    let err = ts.store.claim_reward(&reward.id).await.unwrap_err();
    assert!(matches!(err, StorageError::AlreadyClaimed(_)));

    // No side effects from the rejected second claim
    let coupons = ts.store.list_coupons_for_consumer("u1").await.unwrap();
    assert_eq!(coupons.len(), 1);
    assert_eq!(ts.store.wallet_balance("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn claim_without_active_template_falls_back_to_points() {
    let ts = setup(vec![inactive_template("c-off")]).await;
    let session = ts.store.start_game_session("u1", "stairs").await.unwrap();
    let reward = ts
        .store
        .finish_game_session(&session.id, 7, true, None)
        .await
        .unwrap()
        .unwrap();

    let outcome = ts.store.claim_reward(&reward.id).await.unwrap();
    assert!(outcome.coupon_issue_id.is_none());
    assert!(outcome.wallet_tx_id.is_some());
    assert_eq!(
        ts.store.wallet_balance("u1").await.unwrap(),
        storage::GAME_REWARD_VALUE
    );
    let history = ts.store.wallet_history("u1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].tx_type, "GAME_REWARD");
    assert_eq!(
        history[0].related_game_session_id.as_deref(),
        Some(session.id.as_str())
    );
}

#[tokio::test]
async fn point_reward_creates_wallet_lazily() {
    let ts = setup(vec![active_template("c1")]).await;
    let session = ts.store.start_game_session("u-new", "stairs").await.unwrap();
    insert_raw_reward(&ts, "r-point", &session.id, "POINT_1000", Some(1000));

    assert_eq!(ts.store.wallet_balance("u-new").await.unwrap(), 0);
    let outcome = ts.store.claim_reward("r-point").await.unwrap();
    assert!(outcome.coupon_issue_id.is_none());
    assert_eq!(ts.store.wallet_balance("u-new").await.unwrap(), 1000);

    let history = ts.store.wallet_history("u-new").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount_points, 1000);
}

#[tokio::test]
async fn point_reward_without_value_defaults() {
    let ts = setup(vec![active_template("c1")]).await;
    let session = ts.store.start_game_session("u1", "stairs").await.unwrap();
    insert_raw_reward(&ts, "r-unset", &session.id, "POINT_BONUS", None);

    ts.store.claim_reward("r-unset").await.unwrap();
    assert_eq!(
        ts.store.wallet_balance("u1").await.unwrap(),
        storage::DEFAULT_POINT_VALUE
    );
}

#[tokio::test]
async fn claim_with_dangling_session_is_inconsistent() {
    let ts = setup(vec![active_template("c1")]).await;
    insert_raw_reward(&ts, "r-bad", "no-such-session", "POINT_1000", Some(1000));

    let err = ts.store.claim_reward("r-bad").await.unwrap_err();
    assert!(matches!(err, StorageError::Inconsistent(_)));
}

#[tokio::test]
async fn claim_unknown_reward_is_not_found() {
    let ts = setup(vec![active_template("c1")]).await;
    let err = ts.store.claim_reward("missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn balance_tracks_signed_transaction_sum() {
    let ts = setup(vec![]).await;

    assert_eq!(ts.store.wallet_balance("u1").await.unwrap(), 0);
    assert!(ts.store.wallet_history("u1").await.unwrap().is_empty());

    let (_, bal) = ts
        .store
        .record_wallet_tx("u1", "MANUAL", 500, None)
        .await
        .unwrap();
    assert_eq!(bal, 500);
    let (_, bal) = ts
        .store
        .record_wallet_tx("u1", "MANUAL", -120, None)
        .await
        .unwrap();
    assert_eq!(bal, 380);
    let (_, bal) = ts
        .store
        .record_wallet_tx("u1", "MANUAL", 20, None)
        .await
        .unwrap();
    assert_eq!(bal, 400);

    let history = ts.store.wallet_history("u1").await.unwrap();
    assert_eq!(history.len(), 3);
    // Newest first
    assert_eq!(history[0].amount_points, 20);
    assert_eq!(history[2].amount_points, 500);
    let sum: i64 = history.iter().map(|t| t.amount_points).sum();
    assert_eq!(sum, ts.store.wallet_balance("u1").await.unwrap());
}

#[tokio::test]
async fn concurrent_wallet_txs_keep_cached_total_consistent() {
    let ts = setup(vec![]).await;

    let (a, b, c) = tokio::join!(
        ts.store.record_wallet_tx("u1", "MANUAL", 300, None),
        ts.store.record_wallet_tx("u1", "MANUAL", 200, None),
        ts.store.record_wallet_tx("u1", "MANUAL", -50, None),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(ts.store.wallet_balance("u1").await.unwrap(), 450);
    let history = ts.store.wallet_history("u1").await.unwrap();
    assert_eq!(history.len(), 3);
    let sum: i64 = history.iter().map(|t| t.amount_points).sum();
    assert_eq!(sum, ts.store.wallet_balance("u1").await.unwrap());
}

#[tokio::test]
async fn wallet_tx_rejects_blank_input() {
    let ts = setup(vec![]).await;
    let err = ts
        .store
        .record_wallet_tx("", "MANUAL", 10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));
    let err = ts
        .store
        .record_wallet_tx("u1", "", 10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));
}
