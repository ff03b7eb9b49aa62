pub mod models;
pub mod schema;

use airctt_shared::domain::{self, CouponTemplate, IssuedReason};
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use models::{
    Coupon, CouponIssue, GameReward, GameSession, NewCoupon, NewCouponIssue, NewGameReward,
    NewGameSession, NewSession, NewStore, NewWallet, NewWalletTransaction, Wallet,
    WalletTransaction,
};

/// Reward minted when a game session finishes successfully.
pub const GAME_REWARD_TYPE: &str = "COUPON_90";
pub const GAME_REWARD_VALUE: i64 = 90;
/// Points credited for a point-type reward whose value was never set.
pub const DEFAULT_POINT_VALUE: i64 = 100;

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The entity is in a state that forbids the operation. The message
    /// always names the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A reward payout was attempted a second time.
    #[error("already claimed: {0}")]
    AlreadyClaimed(String),

    /// A required foreign-key join did not resolve.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
}

/// Result of a successful reward claim. Exactly one of the two ids is set.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub coupon_issue_id: Option<String>,
    pub wallet_tx_id: Option<i32>,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store { pool })
    }

    pub async fn seed_from_config(
        &self,
        cfg_coupons: &[CouponTemplate],
        cfg_stores: &[domain::Store],
    ) -> Result<(), StorageError> {
        use schema::{coupons, stores};

        let pool = self.pool.clone();
        let coupons_owned = cfg_coupons.to_owned();
        let stores_owned = cfg_stores.to_owned();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;

            // Upsert coupon templates
            for c in &coupons_owned {
                let new_coupon = NewCoupon {
                    id: &c.id,
                    title: &c.title,
                    description: &c.description,
                    brand: &c.brand,
                    discount_type: &c.discount_type,
                    discount_value: c.discount_value,
                    valid_until: c.valid_until,
                    status: &c.status,
                };
                diesel::insert_into(coupons::table)
                    .values(&new_coupon)
                    .on_conflict(coupons::id)
                    .do_update()
                    .set((
                        coupons::title.eq(new_coupon.title),
                        coupons::description.eq(new_coupon.description),
                        coupons::brand.eq(new_coupon.brand),
                        coupons::discount_type.eq(new_coupon.discount_type),
                        coupons::discount_value.eq(new_coupon.discount_value),
                        coupons::valid_until.eq(new_coupon.valid_until),
                        coupons::status.eq(new_coupon.status),
                    ))
                    .execute(&mut conn)?;
            }

            // Upsert stores
            for s in &stores_owned {
                let new_store = NewStore {
                    id: &s.id,
                    name: &s.name,
                };
                diesel::insert_into(stores::table)
                    .values(&new_store)
                    .on_conflict(stores::id)
                    .do_update()
                    .set(stores::name.eq(new_store.name))
                    .execute(&mut conn)?;
            }

            Ok(())
        })
        .await?
    }

    /// Issue a coupon from a template to a consumer. No stock or template
    /// availability check; the issue row stands on its own.
    pub async fn issue_coupon(
        &self,
        consumer: &str,
        coupon: &str,
        reason: IssuedReason,
    ) -> Result<CouponIssue, StorageError> {
        if consumer.trim().is_empty() {
            return Err(StorageError::InvalidInput("consumer_id required".into()));
        }
        if coupon.trim().is_empty() {
            return Err(StorageError::InvalidInput("coupon_id required".into()));
        }
        let pool = self.pool.clone();
        let consumer_owned = consumer.to_string();
        let coupon_owned = coupon.to_string();
        tokio::task::spawn_blocking(move || -> Result<CouponIssue, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            insert_coupon_issue(&mut conn, &consumer_owned, &coupon_owned, reason)
        })
        .await?
    }

    /// Redeem a coupon at a store: ISSUED -> USED, exactly once.
    ///
    /// Runs in an immediate transaction so two concurrent redeems of the
    /// same issue cannot both observe ISSUED. A coupon whose template
    /// validity has lapsed is moved to EXPIRED here and the redeem fails
    /// with the same invalid-state error a USED coupon produces.
    pub async fn redeem_coupon(
        &self,
        issue_id: &str,
        store_id: &str,
    ) -> Result<CouponIssue, StorageError> {
        use schema::coupon_issues::dsl as ci;
        let pool = self.pool.clone();
        let issue_owned = issue_id.to_string();
        let store_owned = store_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<CouponIssue, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.immediate_transaction(|conn| -> Result<CouponIssue, StorageError> {
                let issue: Option<CouponIssue> = ci::coupon_issues
                    .find(&issue_owned)
                    .first::<CouponIssue>(conn)
                    .optional()?;
                let Some(issue) = issue else {
                    return Err(StorageError::NotFound(format!(
                        "coupon issue not found: {issue_owned}"
                    )));
                };
                if issue.status != domain::CouponStatus::Issued.as_str() {
                    return Err(StorageError::InvalidState(format!(
                        "coupon issue {} is {}, expected ISSUED",
                        issue.id, issue.status
                    )));
                }

                let now = Utc::now().naive_utc();
                if coupon_validity_lapsed(conn, &issue.coupon_id, now)? {
                    diesel::update(
                        ci::coupon_issues
                            .filter(ci::id.eq(&issue.id))
                            .filter(ci::status.eq(domain::CouponStatus::Issued.as_str())),
                    )
                    .set(ci::status.eq(domain::CouponStatus::Expired.as_str()))
                    .execute(conn)?;
                    return Err(StorageError::InvalidState(format!(
                        "coupon issue {} is EXPIRED, expected ISSUED",
                        issue.id
                    )));
                }

                // Conditional update: only the ISSUED row may transition
                let updated = diesel::update(
                    ci::coupon_issues
                        .filter(ci::id.eq(&issue.id))
                        .filter(ci::status.eq(domain::CouponStatus::Issued.as_str())),
                )
                .set((
                    ci::status.eq(domain::CouponStatus::Used.as_str()),
                    ci::used_at.eq(Some(now)),
                    ci::used_store_id.eq(Some(store_owned.as_str())),
                ))
                .execute(conn)?;
                if updated != 1 {
                    return Err(StorageError::Inconsistent(format!(
                        "redeem updated {updated} rows for coupon issue {}",
                        issue.id
                    )));
                }
                Ok(ci::coupon_issues
                    .find(&issue.id)
                    .first::<CouponIssue>(conn)?)
            })
        })
        .await?
    }

    /// Resolve a coupon issue by primary id or redemption code, together
    /// with its template's display fields.
    pub async fn find_coupon_issue(
        &self,
        code_or_id: &str,
    ) -> Result<(CouponIssue, Coupon), StorageError> {
        use schema::{coupon_issues, coupons};
        let pool = self.pool.clone();
        let key = code_or_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<(CouponIssue, Coupon), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let by_id: Option<(CouponIssue, Coupon)> = coupon_issues::table
                .inner_join(coupons::table)
                .filter(coupon_issues::id.eq(&key))
                .first::<(CouponIssue, Coupon)>(&mut conn)
                .optional()?;
            if let Some(found) = by_id {
                return Ok(found);
            }
            coupon_issues::table
                .inner_join(coupons::table)
                .filter(coupon_issues::code.eq(&key))
                .first::<(CouponIssue, Coupon)>(&mut conn)
                .optional()?
                .ok_or_else(|| StorageError::NotFound(format!("coupon not found: {key}")))
        })
        .await?
    }

    pub async fn list_coupons_for_consumer(
        &self,
        consumer: &str,
    ) -> Result<Vec<(CouponIssue, Coupon)>, StorageError> {
        use schema::{coupon_issues, coupons};
        let pool = self.pool.clone();
        let consumer_owned = consumer.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<(CouponIssue, Coupon)>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(coupon_issues::table
                .inner_join(coupons::table)
                .filter(coupon_issues::consumer_id.eq(&consumer_owned))
                .order(coupon_issues::issued_at.desc())
                .load::<(CouponIssue, Coupon)>(&mut conn)?)
        })
        .await?
    }

    pub async fn start_game_session(
        &self,
        consumer: &str,
        game_type: &str,
    ) -> Result<GameSession, StorageError> {
        use schema::game_sessions;
        if consumer.trim().is_empty() {
            return Err(StorageError::InvalidInput("consumer_id required".into()));
        }
        if game_type.trim().is_empty() {
            return Err(StorageError::InvalidInput("game_type required".into()));
        }
        let pool = self.pool.clone();
        let consumer_owned = consumer.to_string();
        let game_type_owned = game_type.to_string();
        tokio::task::spawn_blocking(move || -> Result<GameSession, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now().naive_utc();
            let new_session = NewGameSession {
                id: &id,
                consumer_id: &consumer_owned,
                game_type: &game_type_owned,
                started_at: now,
            };
            diesel::insert_into(game_sessions::table)
                .values(&new_session)
                .execute(&mut conn)?;
            Ok(game_sessions::table
                .find(&id)
                .first::<GameSession>(&mut conn)?)
        })
        .await?
    }

    /// Record a session's final fields; mint a GameReward when the run was
    /// successful. Returns the minted reward, or None for a failed run.
    pub async fn finish_game_session(
        &self,
        session_id: &str,
        steps_cleared: i32,
        success: bool,
        client_info: Option<String>,
    ) -> Result<Option<GameReward>, StorageError> {
        use schema::{game_rewards, game_sessions::dsl as gs};
        let pool = self.pool.clone();
        let session_owned = session_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<GameReward>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.immediate_transaction(|conn| -> Result<Option<GameReward>, StorageError> {
                let now = Utc::now().naive_utc();
                let updated = diesel::update(gs::game_sessions.filter(gs::id.eq(&session_owned)))
                    .set((
                        gs::finished_at.eq(Some(now)),
                        gs::steps_cleared.eq(steps_cleared),
                        gs::success.eq(Some(success)),
                        gs::client_info.eq(client_info.as_deref()),
                    ))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(StorageError::NotFound(format!(
                        "game session not found: {session_owned}"
                    )));
                }
                if !success {
                    return Ok(None);
                }
                let reward_id = uuid::Uuid::new_v4().to_string();
                let new_reward = NewGameReward {
                    id: &reward_id,
                    game_session_id: &session_owned,
                    reward_type: GAME_REWARD_TYPE,
                    reward_value: Some(GAME_REWARD_VALUE),
                    created_at: now,
                };
                diesel::insert_into(game_rewards::table)
                    .values(&new_reward)
                    .execute(conn)?;
                Ok(Some(
                    game_rewards::table
                        .find(&reward_id)
                        .first::<GameReward>(conn)?,
                ))
            })
        })
        .await?
    }

    /// Pay out a reward exactly once.
    ///
    /// The whole claim runs in one immediate transaction: the
    /// already-claimed check, the payout write and the claim-field update
    /// either all land or none do, and concurrent claims of the same
    /// reward serialize on the write lock.
    ///
    /// COUPON-type rewards issue from the first active template; when none
    /// remains the claim falls back to the points payout rather than
    /// dropping the reward.
    pub async fn claim_reward(&self, reward_id: &str) -> Result<ClaimOutcome, StorageError> {
        use schema::{game_rewards::dsl as gr, game_sessions::dsl as gs};
        let pool = self.pool.clone();
        let reward_owned = reward_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<ClaimOutcome, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.immediate_transaction(|conn| -> Result<ClaimOutcome, StorageError> {
                let reward: Option<GameReward> = gr::game_rewards
                    .find(&reward_owned)
                    .first::<GameReward>(conn)
                    .optional()?;
                let Some(reward) = reward else {
                    return Err(StorageError::NotFound(format!(
                        "reward not found: {reward_owned}"
                    )));
                };
                if reward.created_coupon_issue_id.is_some()
                    || reward.created_wallet_tx_id.is_some()
                {
                    return Err(StorageError::AlreadyClaimed(format!(
                        "reward already claimed: {}",
                        reward.id
                    )));
                }

                // The owning consumer comes through the session join; a
                // dangling session reference is fatal for the claim.
                let consumer: Option<String> = gs::game_sessions
                    .filter(gs::id.eq(&reward.game_session_id))
                    .select(gs::consumer_id)
                    .first::<String>(conn)
                    .optional()?;
                let Some(consumer) = consumer else {
                    return Err(StorageError::Inconsistent(format!(
                        "reward {} references missing game session {}",
                        reward.id, reward.game_session_id
                    )));
                };

                if domain::is_coupon_reward(&reward.reward_type) {
                    use schema::coupons::dsl as cp;
                    let template: Option<String> = cp::coupons
                        .filter(cp::status.eq("active"))
                        .select(cp::id)
                        .first::<String>(conn)
                        .optional()?;
                    if let Some(template_id) = template {
                        let issue = insert_coupon_issue(
                            conn,
                            &consumer,
                            &template_id,
                            IssuedReason::GameReward,
                        )?;
                        diesel::update(gr::game_rewards.filter(gr::id.eq(&reward.id)))
                            .set(gr::created_coupon_issue_id.eq(Some(issue.id.as_str())))
                            .execute(conn)?;
                        return Ok(ClaimOutcome {
                            coupon_issue_id: Some(issue.id),
                            wallet_tx_id: None,
                        });
                    }
                    tracing::warn!(
                        reward_id = %reward.id,
                        "no active coupon template; falling back to points payout"
                    );
                }

                let points = reward.reward_value.unwrap_or(DEFAULT_POINT_VALUE);
                let (tx_id, _balance) = apply_wallet_tx(
                    conn,
                    &consumer,
                    "GAME_REWARD",
                    points,
                    Some(&reward.game_session_id),
                )?;
                diesel::update(gr::game_rewards.filter(gr::id.eq(&reward.id)))
                    .set(gr::created_wallet_tx_id.eq(Some(tx_id)))
                    .execute(conn)?;
                Ok(ClaimOutcome {
                    coupon_issue_id: None,
                    wallet_tx_id: Some(tx_id),
                })
            })
        })
        .await?
    }

    /// Append a wallet transaction and move the cached balance in the same
    /// transaction. Negative amounts debit; no sufficient-balance check.
    pub async fn record_wallet_tx(
        &self,
        consumer: &str,
        tx_type: &str,
        amount_points: i64,
        related_game_session: Option<&str>,
    ) -> Result<(i32, i64), StorageError> {
        if consumer.trim().is_empty() {
            return Err(StorageError::InvalidInput("consumer_id required".into()));
        }
        if tx_type.trim().is_empty() {
            return Err(StorageError::InvalidInput("type required".into()));
        }
        let pool = self.pool.clone();
        let consumer_owned = consumer.to_string();
        let tx_type_owned = tx_type.to_string();
        let related_owned = related_game_session.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || -> Result<(i32, i64), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.immediate_transaction(|conn| {
                apply_wallet_tx(
                    conn,
                    &consumer_owned,
                    &tx_type_owned,
                    amount_points,
                    related_owned.as_deref(),
                )
            })
        })
        .await?
    }

    /// Cached balance; 0 for consumers without a wallet.
    pub async fn wallet_balance(&self, consumer: &str) -> Result<i64, StorageError> {
        use schema::wallets::dsl as w;
        let pool = self.pool.clone();
        let consumer_owned = consumer.to_string();
        tokio::task::spawn_blocking(move || -> Result<i64, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let total: Option<i64> = w::wallets
                .filter(w::consumer_id.eq(&consumer_owned))
                .select(w::total_points)
                .first::<i64>(&mut conn)
                .optional()?;
            Ok(total.unwrap_or(0))
        })
        .await?
    }

    /// Transaction history, newest first. Empty for consumers without a
    /// wallet.
    pub async fn wallet_history(
        &self,
        consumer: &str,
    ) -> Result<Vec<WalletTransaction>, StorageError> {
        use schema::{wallet_transactions::dsl as wt, wallets::dsl as w};
        let pool = self.pool.clone();
        let consumer_owned = consumer.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<WalletTransaction>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let wallet: Option<Wallet> = w::wallets
                .filter(w::consumer_id.eq(&consumer_owned))
                .first::<Wallet>(&mut conn)
                .optional()?;
            let Some(wallet) = wallet else {
                return Ok(Vec::new());
            };
            Ok(wt::wallet_transactions
                .filter(wt::wallet_id.eq(wallet.id))
                .order((wt::created_at.desc(), wt::id.desc()))
                .load::<WalletTransaction>(&mut conn)?)
        })
        .await?
    }

    // Session helpers for JWT inactivity windows
    pub async fn create_session(&self, jti_: &str, username_: &str) -> Result<(), StorageError> {
        use schema::sessions;
        let pool = self.pool.clone();
        let j = jti_.to_string();
        let u = username_.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let new = NewSession {
                jti: &j,
                username: &u,
            };
            diesel::insert_into(sessions::table)
                .values(&new)
                .on_conflict_do_nothing()
                .execute(&mut conn)?;
            Ok(())
        })
        .await?
    }

    /// Touch session atomically, but only if it hasn't expired.
    /// Returns `true` if the session was found and updated, `false` otherwise.
    ///
    /// This combines the idle timeout check and the `last_used_at` update into
    /// a single atomic UPDATE, eliminating the race condition between checking
    /// and updating the session.
    pub async fn touch_session_with_cutoff(
        &self,
        jti_: &str,
        cutoff: chrono::NaiveDateTime,
    ) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let pool = self.pool.clone();
        let j = jti_.to_string();
        tokio::task::spawn_blocking(move || -> Result<bool, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let now = Utc::now().naive_utc();
            let updated =
                diesel::update(sessions.filter(jti.eq(&j)).filter(last_used_at.ge(cutoff)))
                    .set(last_used_at.eq(now))
                    .execute(&mut conn)?;
            Ok(updated > 0)
        })
        .await?
    }
}

/// Insert a fresh ISSUED coupon issue row and return it.
fn insert_coupon_issue(
    conn: &mut SqliteConnection,
    consumer: &str,
    coupon: &str,
    reason: IssuedReason,
) -> Result<CouponIssue, StorageError> {
    use schema::coupon_issues;
    let id = uuid::Uuid::new_v4().to_string();
    let code = new_redemption_code();
    let new_issue = NewCouponIssue {
        id: &id,
        code: &code,
        coupon_id: coupon,
        consumer_id: consumer,
        status: domain::CouponStatus::Issued.as_str(),
        issued_reason: reason.as_str(),
        issued_at: Utc::now().naive_utc(),
    };
    diesel::insert_into(coupon_issues::table)
        .values(&new_issue)
        .execute(conn)?;
    Ok(coupon_issues::table.find(&id).first::<CouponIssue>(conn)?)
}

/// Append a ledger entry and increment the wallet's cached total. The
/// wallet row is created lazily on first use. Must run inside a
/// transaction; returns (tx id, balance after).
fn apply_wallet_tx(
    conn: &mut SqliteConnection,
    consumer: &str,
    tx_type: &str,
    amount_points: i64,
    related_game_session: Option<&str>,
) -> Result<(i32, i64), StorageError> {
    use schema::{wallet_transactions, wallets::dsl as w};

    let wallet: Option<Wallet> = w::wallets
        .filter(w::consumer_id.eq(consumer))
        .first::<Wallet>(conn)
        .optional()?;
    let wallet = match wallet {
        Some(wallet) => wallet,
        None => {
            let new_wallet = NewWallet {
                consumer_id: consumer,
                total_points: 0,
            };
            diesel::insert_into(w::wallets)
                .values(&new_wallet)
                .returning(models::Wallet::as_returning())
                .get_result::<Wallet>(conn)?
        }
    };

    let new_tx = NewWalletTransaction {
        wallet_id: wallet.id,
        tx_type,
        amount_points,
        related_game_session_id: related_game_session,
        created_at: Utc::now().naive_utc(),
    };
    let tx_id: i32 = diesel::insert_into(wallet_transactions::table)
        .values(&new_tx)
        .returning(wallet_transactions::id)
        .get_result::<i32>(conn)?;

    // Atomic increment keeps the cached total equal to the ledger sum
    diesel::update(w::wallets.filter(w::id.eq(wallet.id)))
        .set(w::total_points.eq(w::total_points + amount_points))
        .execute(conn)?;
    let balance: i64 = w::wallets
        .filter(w::id.eq(wallet.id))
        .select(w::total_points)
        .first::<i64>(conn)?;
    Ok((tx_id, balance))
}

/// True when the template exists and its validity window has passed. An
/// absent template never expires an issue (issues are not FK-checked).
fn coupon_validity_lapsed(
    conn: &mut SqliteConnection,
    coupon_id: &str,
    now: chrono::NaiveDateTime,
) -> Result<bool, StorageError> {
    use schema::coupons::dsl as cp;
    let valid_until: Option<Option<chrono::NaiveDateTime>> = cp::coupons
        .filter(cp::id.eq(coupon_id))
        .select(cp::valid_until)
        .first::<Option<chrono::NaiveDateTime>>(conn)
        .optional()?;
    Ok(matches!(valid_until, Some(Some(until)) if until < now))
}

fn new_redemption_code() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..12].to_uppercase()
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    // Ignore the result rows; Diesel's execute is fine for PRAGMAs
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    Ok(())
}
