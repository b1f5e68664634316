use crate::{
    config::DatabaseSettings,
    data::{BalanceRecord, Error, UserId},
    date::CANONICAL_FORMAT,
};
use chrono::NaiveDate;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow},
    Connection, Row,
};
use tokio::runtime::{Builder, Runtime};

/// Read-only lookups the enrichment needs. The production implementation is
/// `MySqlStore`; tests use an in-memory table set with the same semantics.
pub(crate) trait LedgerStore {
    /// Owner of the vendor item titled `code`, first match only.
    fn user_for_code(&mut self, code: &str) -> Result<Option<UserId>, Error>;
    /// Newest wallet transaction of `user` dated on or before `cutoff`.
    fn latest_transaction(
        &mut self,
        user: &str,
        cutoff: NaiveDate,
    ) -> Result<Option<BalanceRecord>, Error>;
    /// Current wallet row of `user`.
    fn current_balance(&mut self, user: &str) -> Result<Option<BalanceRecord>, Error>;
}

const USER_FOR_CODE: &str = r#"
    SELECT CAST(`user` AS CHAR) AS user_id
    FROM vendoritems
    WHERE title = ?
    LIMIT 1"#;

const LATEST_TRANSACTION: &str = r#"
    SELECT balance_snapshot AS amount, CAST(datecreated AS CHAR) AS as_of
    FROM wallet_transactionitems
    WHERE `user` = ? AND datecreated <= ?
    ORDER BY datecreated DESC
    LIMIT 1"#;

const CURRENT_BALANCE: &str = r#"
    SELECT balance AS amount, CAST(datecreated AS CHAR) AS as_of
    FROM walletitems
    WHERE `user` = ?
    LIMIT 1"#;

/// The one MySQL connection of a run. The driver is async, so the store
/// carries its own single-threaded runtime and blocks on every query.
pub(crate) struct MySqlStore {
    // Dropped before the runtime it was opened on.
    conn: MySqlConnection,
    runtime: Runtime,
}

impl MySqlStore {
    pub fn connect(settings: &DatabaseSettings) -> Result<Self, Error> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.name);
        let conn = runtime.block_on(MySqlConnection::connect_with(&options))?;
        Ok(Self { conn, runtime })
    }

    /// Say goodbye to the server. Dropping the store also releases the
    /// socket, just without the handshake.
    pub fn close(self) -> Result<(), Error> {
        let Self { conn, runtime } = self;
        runtime.block_on(conn.close())?;
        Ok(())
    }

    fn fetch_balance(
        &mut self,
        query: sqlx::query::Query<'_, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    ) -> Result<Option<BalanceRecord>, Error> {
        let row = self.runtime.block_on(query.fetch_optional(&mut self.conn))?;
        row.as_ref().map(balance_from_row).transpose()
    }
}

fn balance_from_row(row: &MySqlRow) -> Result<BalanceRecord, Error> {
    Ok(BalanceRecord {
        amount: row.try_get("amount")?,
        as_of: row.try_get("as_of")?,
    })
}

impl LedgerStore for MySqlStore {
    fn user_for_code(&mut self, code: &str) -> Result<Option<UserId>, Error> {
        let row = self
            .runtime
            .block_on(sqlx::query(USER_FOR_CODE).bind(code).fetch_optional(&mut self.conn))?;
        match row {
            Some(row) => Ok(row.try_get("user_id")?),
            None => Ok(None),
        }
    }

    fn latest_transaction(
        &mut self,
        user: &str,
        cutoff: NaiveDate,
    ) -> Result<Option<BalanceRecord>, Error> {
        // Bound as text, as the literal a hand-written query would carry.
        let cutoff = cutoff.format(CANONICAL_FORMAT).to_string();
        self.fetch_balance(sqlx::query(LATEST_TRANSACTION).bind(user).bind(cutoff))
    }

    fn current_balance(&mut self, user: &str) -> Result<Option<BalanceRecord>, Error> {
        self.fetch_balance(sqlx::query(CURRENT_BALANCE).bind(user))
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::LedgerStore;
    use crate::{
        data::{BalanceRecord, Error, UserId},
        date::CANONICAL_FORMAT,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    pub(crate) fn record(amount: Decimal, as_of: &str) -> BalanceRecord {
        BalanceRecord {
            amount: Some(amount),
            as_of: Some(as_of.to_owned()),
        }
    }

    /// The three tables as plain vectors. Dates are compared as text against
    /// the cutoff, like MySQL does for a character column.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryStore {
        pub vendoritems: Vec<(String, UserId)>,
        pub transactions: Vec<(UserId, BalanceRecord)>,
        pub wallets: Vec<(UserId, BalanceRecord)>,
        /// Every query issued, in order, as `(table, key)`.
        pub queries: Vec<(&'static str, String)>,
        /// Simulated connection loss: the query with this index fails.
        pub fail_at: Option<usize>,
    }

    impl MemoryStore {
        fn issue(&mut self, table: &'static str, key: &str) -> Result<(), Error> {
            if self.fail_at == Some(self.queries.len()) {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection lost",
                )));
            }
            self.queries.push((table, key.to_owned()));
            Ok(())
        }
    }

    impl LedgerStore for MemoryStore {
        fn user_for_code(&mut self, code: &str) -> Result<Option<UserId>, Error> {
            self.issue("vendoritems", code)?;
            Ok(self
                .vendoritems
                .iter()
                .find(|(title, _)| title == code)
                .map(|(_, user)| user.clone()))
        }

        fn latest_transaction(
            &mut self,
            user: &str,
            cutoff: NaiveDate,
        ) -> Result<Option<BalanceRecord>, Error> {
            self.issue("wallet_transactionitems", user)?;
            let cutoff = cutoff.format(CANONICAL_FORMAT).to_string();
            Ok(self
                .transactions
                .iter()
                .filter(|(owner, _)| owner == user)
                .filter(|(_, rec)| rec.as_of.as_deref().is_some_and(|d| d <= cutoff.as_str()))
                .max_by(|(_, a), (_, b)| a.as_of.cmp(&b.as_of))
                .map(|(_, rec)| rec.clone()))
        }

        fn current_balance(&mut self, user: &str) -> Result<Option<BalanceRecord>, Error> {
            self.issue("walletitems", user)?;
            Ok(self
                .wallets
                .iter()
                .find(|(owner, _)| owner == user)
                .map(|(_, rec)| rec.clone()))
        }
    }
}
