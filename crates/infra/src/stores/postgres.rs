//! Postgres-backed twin store.
//!
//! Persistent implementation of [`TwinStore`] selected via
//! `USE_PERSISTENT_STORES=true` + `DATABASE_URL`. Uniqueness is enforced by
//! the schema (primary keys plus the `(transfer_id, account_id)` unique
//! constraint) and balance application runs inside one SQL transaction with
//! the account row locked, which gives the per-account single-writer
//! guarantee the balance contract requires.
//!
//! Notification and subscription stores stay in-memory for now and can be
//! swapped to Postgres later.

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use piggybank_accounts::{Account, Transaction, TransactionType};
use piggybank_core::{AccountId, DomainError, TransactionId, TransferId};

use super::{AppliedTransaction, PageOf, PageRequest, StoreError, TwinStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id            TEXT PRIMARY KEY,
    account_type  TEXT NOT NULL,
    identifier    TEXT NOT NULL,
    balance_value NUMERIC NOT NULL,
    currency_code TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    UNIQUE (account_type, identifier)
);

CREATE TABLE IF NOT EXISTS transactions (
    id                  UUID PRIMARY KEY,
    transfer_id         UUID NOT NULL,
    account_id          TEXT NOT NULL REFERENCES accounts (id),
    amount_value        NUMERIC NOT NULL,
    currency_code       TEXT NOT NULL,
    valuation_timestamp TIMESTAMPTZ NOT NULL,
    purpose             TEXT NOT NULL,
    tx_type             TEXT NOT NULL,
    source_account      TEXT,
    destination_account TEXT,
    created_at          TIMESTAMPTZ NOT NULL,
    UNIQUE (transfer_id, account_id)
);
"#;

/// Postgres-backed store for accounts and their ledger entries.
pub struct PostgresTwinStore {
    pool: PgPool,
}

impl PostgresTwinStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bootstrap the schema in one step.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(sql_err)?;
        Self::ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(pool).await.map_err(sql_err)?;
        }
        Ok(())
    }

    /// Run an async store operation from the sync trait surface.
    ///
    /// Requires the multi-thread tokio runtime; `block_in_place` keeps the
    /// worker thread usable for the blocking wait.
    fn run<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| StoreError::Backend("postgres store requires a tokio runtime".into()))?;
        tokio::task::block_in_place(|| handle.block_on(fut))
    }
}

fn sql_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let id: String = row.try_get("id").map_err(sql_err)?;
    let code: String = row.try_get("currency_code").map_err(sql_err)?;
    Ok(Account {
        id: id.parse::<AccountId>()?,
        account_type: row.try_get("account_type").map_err(sql_err)?,
        identifier: row.try_get("identifier").map_err(sql_err)?,
        balance: piggybank_core::Amount::new(
            row.try_get::<Decimal, _>("balance_value").map_err(sql_err)?,
            piggybank_core::Currency::try_from(code.as_str())?,
        ),
        created_at: row.try_get("created_at").map_err(sql_err)?,
    })
}

fn kind_from_str(s: &str) -> Result<TransactionType, StoreError> {
    match s {
        "CREDIT" => Ok(TransactionType::Credit),
        "DEBIT" => Ok(TransactionType::Debit),
        "DUMMY" => Ok(TransactionType::Dummy),
        other => Err(StoreError::Backend(format!(
            "unknown transaction type in storage: {other}"
        ))),
    }
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let id: uuid::Uuid = row.try_get("id").map_err(sql_err)?;
    let transfer_id: uuid::Uuid = row.try_get("transfer_id").map_err(sql_err)?;
    let account_id: String = row.try_get("account_id").map_err(sql_err)?;
    let code: String = row.try_get("currency_code").map_err(sql_err)?;
    let tx_type: String = row.try_get("tx_type").map_err(sql_err)?;
    Ok(Transaction {
        id: TransactionId::from_uuid(id),
        transfer_id: TransferId::from_uuid(transfer_id),
        account_id: account_id.parse::<AccountId>()?,
        amount: piggybank_core::Amount::new(
            row.try_get::<Decimal, _>("amount_value").map_err(sql_err)?,
            piggybank_core::Currency::try_from(code.as_str())?,
        ),
        valuation_timestamp: row.try_get("valuation_timestamp").map_err(sql_err)?,
        purpose: row.try_get("purpose").map_err(sql_err)?,
        kind: kind_from_str(&tx_type)?,
        source_account: row.try_get("source_account").map_err(sql_err)?,
        destination_account: row.try_get("destination_account").map_err(sql_err)?,
        created_at: row.try_get("created_at").map_err(sql_err)?,
    })
}

async fn insert_transaction_tx<'e, E>(executor: E, t: &Transaction) -> Result<(), StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO transactions
            (id, transfer_id, account_id, amount_value, currency_code,
             valuation_timestamp, purpose, tx_type, source_account,
             destination_account, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(t.id.as_uuid())
    .bind(t.transfer_id.as_uuid())
    .bind(t.account_id.as_str())
    .bind(t.amount.value)
    .bind(t.amount.currency.code())
    .bind(t.valuation_timestamp)
    .bind(&t.purpose)
    .bind(t.kind.to_string())
    .bind(&t.source_account)
    .bind(&t.destination_account)
    .bind(t.created_at)
    .execute(executor)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(format!(
                "transaction for transfer {} on account {} already exists",
                t.transfer_id, t.account_id
            ))
        } else {
            sql_err(e)
        }
    })?;
    Ok(())
}

impl TwinStore for PostgresTwinStore {
    fn insert_account(&self, account: Account) -> Result<Account, StoreError> {
        self.run(async {
            sqlx::query(
                r#"
                INSERT INTO accounts
                    (id, account_type, identifier, balance_value, currency_code, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(account.id.as_str())
            .bind(&account.account_type)
            .bind(&account.identifier)
            .bind(account.balance.value)
            .bind(account.balance.currency.code())
            .bind(account.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!(
                        "account with type {} and identifier {} already exists",
                        account.account_type, account.identifier
                    ))
                } else {
                    sql_err(e)
                }
            })?;
            Ok(account.clone())
        })
    }

    fn account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.run(async {
            let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(sql_err)?;
            row.as_ref().map(account_from_row).transpose()
        })
    }

    fn account_by_natural_key(
        &self,
        account_type: &str,
        identifier: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.run(async {
            let row =
                sqlx::query("SELECT * FROM accounts WHERE account_type = $1 AND identifier = $2")
                    .bind(account_type)
                    .bind(identifier)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(sql_err)?;
            row.as_ref().map(account_from_row).transpose()
        })
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.run(async {
            let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(sql_err)?;
            rows.iter().map(account_from_row).collect()
        })
    }

    fn delete_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.run(async {
            let mut tx = self.pool.begin().await.map_err(sql_err)?;

            let row = sqlx::query("SELECT * FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(sql_err)?;
            let Some(row) = row else {
                return Ok(None);
            };
            let account = account_from_row(&row)?;

            // Transactions first: they reference the account row.
            sqlx::query("DELETE FROM transactions WHERE account_id = $1")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(sql_err)?;
            sqlx::query("DELETE FROM accounts WHERE id = $1")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(sql_err)?;

            tx.commit().await.map_err(sql_err)?;
            Ok(Some(account))
        })
    }

    fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction, StoreError> {
        self.run(async {
            insert_transaction_tx(&self.pool, &transaction).await?;
            Ok(transaction.clone())
        })
    }

    fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        self.run(async {
            let row = sqlx::query("SELECT * FROM transactions WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(sql_err)?;
            row.as_ref().map(transaction_from_row).transpose()
        })
    }

    fn transaction_for_transfer(
        &self,
        transfer_id: &TransferId,
        account_id: &AccountId,
    ) -> Result<Option<Transaction>, StoreError> {
        self.run(async {
            let row = sqlx::query(
                "SELECT * FROM transactions WHERE transfer_id = $1 AND account_id = $2",
            )
            .bind(transfer_id.as_uuid())
            .bind(account_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_err)?;
            row.as_ref().map(transaction_from_row).transpose()
        })
    }

    fn transactions_by_account(
        &self,
        id: &AccountId,
        page: PageRequest,
    ) -> Result<PageOf<Transaction>, StoreError> {
        self.run(async {
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = $1")
                    .bind(id.as_str())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(sql_err)?;

            let rows = sqlx::query(
                r#"
                SELECT * FROM transactions
                WHERE account_id = $1
                ORDER BY created_at, id
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(id.as_str())
            .bind(page.size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(sql_err)?;

            Ok(PageOf {
                items: rows
                    .iter()
                    .map(transaction_from_row)
                    .collect::<Result<_, _>>()?,
                page: page.page,
                size: page.size,
                total: total as usize,
            })
        })
    }

    fn apply_transaction(&self, transaction: Transaction) -> Result<AppliedTransaction, StoreError> {
        self.run(async {
            let mut tx = self.pool.begin().await.map_err(sql_err)?;

            // Lock the account row first: every applier for this account
            // serializes here, making the dedup check + insert race-free.
            let row = sqlx::query("SELECT * FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(transaction.account_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(sql_err)?;
            let Some(row) = row else {
                return Err(StoreError::Domain(DomainError::validation(format!(
                    "account with id {} not found",
                    transaction.account_id
                ))));
            };
            let account = account_from_row(&row)?;

            let existing = sqlx::query(
                "SELECT * FROM transactions WHERE transfer_id = $1 AND account_id = $2",
            )
            .bind(transaction.transfer_id.as_uuid())
            .bind(transaction.account_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(sql_err)?;
            if let Some(existing) = existing {
                return Ok(AppliedTransaction {
                    transaction: transaction_from_row(&existing)?,
                    account,
                    replayed: true,
                });
            }

            let updated = account.apply(transaction.kind, &transaction.amount)?;

            insert_transaction_tx(&mut *tx, &transaction).await?;
            sqlx::query("UPDATE accounts SET balance_value = $2, currency_code = $3 WHERE id = $1")
                .bind(updated.id.as_str())
                .bind(updated.balance.value)
                .bind(updated.balance.currency.code())
                .execute(&mut *tx)
                .await
                .map_err(sql_err)?;

            tx.commit().await.map_err(sql_err)?;
            Ok(AppliedTransaction {
                transaction,
                account: updated,
                replayed: false,
            })
        })
    }
}
