//! SQLite storage layer for inspected blocks and derived MEV events.
//!
//! Every derived entity kind is keyed by `block_number` and replaced wholesale
//! when a block is re-inspected: `delete_for_block` followed by `write_all`.
//! Uses WAL mode and one SQLite transaction per batch insert.

use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{Address, B256, U256};
use eyre::{eyre, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction};

use crate::types::{
    Arbitrage, Block, ClassifiedTrace, Liquidation, MinerPayment, PunkSnipe, Swap, Transfer,
};

/// An entity kind persisted as rows belonging to one block.
pub trait BlockRows: Sized {
    /// Table holding rows of this kind. Must have a `block_number` column.
    const TABLE: &'static str;
    /// Comma-separated data columns, in the order [`BlockRows::to_row`] binds them.
    const COLUMNS: &'static str;

    fn to_row(&self) -> Vec<Value>;

    /// Insert `rows` inside an open transaction.
    fn insert_all(tx: &Transaction<'_>, rows: &[Self]) -> Result<()> {
        let mut stmt = tx.prepare(&insert_sql(Self::TABLE, Self::COLUMNS))?;
        for row in rows {
            stmt.execute(rusqlite::params_from_iter(row.to_row()))?;
        }
        Ok(())
    }
}

fn insert_sql(table: &str, columns: &str) -> String {
    let placeholders = vec!["?"; columns.split(',').count()].join(", ");
    format!("INSERT INTO {} ({}) VALUES ({})", table, columns, placeholders)
}

fn int(value: u64) -> Value {
    Value::Integer(value as i64)
}

fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

fn addr(value: &Address) -> Value {
    Value::Text(format!("{:#x}", value))
}

fn hash(value: &B256) -> Value {
    Value::Text(format!("{:#x}", value))
}

fn wei(value: &U256) -> Value {
    Value::Text(format!("0x{:x}", value))
}

fn path(trace_address: &[usize]) -> Value {
    let rendered = trace_address
        .iter()
        .map(|idx| idx.to_string())
        .collect::<Vec<_>>()
        .join(",");
    Value::Text(format!("[{}]", rendered))
}

fn nullable(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Creates or opens a SQLite database with WAL mode enabled.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrations fail.
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| eyre!("store connection mutex poisoned"))
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS blocks (
                block_number INTEGER PRIMARY KEY,
                block_hash TEXT,
                miner TEXT,
                base_fee_per_gas TEXT,
                block_timestamp INTEGER
            );

            CREATE TABLE IF NOT EXISTS classified_traces (
                block_number INTEGER,
                transaction_hash TEXT,
                transaction_position INTEGER,
                trace_address TEXT,
                call_kind TEXT,
                from_address TEXT,
                to_address TEXT,
                value TEXT,
                gas INTEGER,
                gas_used INTEGER,
                error TEXT,
                classification TEXT,
                protocol TEXT,
                abi_name TEXT,
                function_name TEXT,
                inputs TEXT
            );
            CREATE INDEX IF NOT EXISTS classified_traces_block
                ON classified_traces (block_number);

            CREATE TABLE IF NOT EXISTS transfers (
                block_number INTEGER,
                transaction_hash TEXT,
                trace_address TEXT,
                from_address TEXT,
                to_address TEXT,
                amount TEXT,
                token_address TEXT,
                PRIMARY KEY (block_number, transaction_hash, trace_address)
            );

            CREATE TABLE IF NOT EXISTS swaps (
                block_number INTEGER,
                transaction_hash TEXT,
                trace_address TEXT,
                protocol TEXT,
                abi_name TEXT,
                pool_address TEXT,
                account_address TEXT,
                recipient_address TEXT,
                token_in_address TEXT,
                token_in_amount TEXT,
                token_out_address TEXT,
                token_out_amount TEXT,
                PRIMARY KEY (block_number, transaction_hash, trace_address)
            );

            CREATE TABLE IF NOT EXISTS arbitrages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                block_number INTEGER,
                transaction_hash TEXT,
                account_address TEXT,
                profit_token_address TEXT,
                start_amount TEXT,
                end_amount TEXT,
                profit_amount TEXT
            );
            CREATE INDEX IF NOT EXISTS arbitrages_block ON arbitrages (block_number);

            CREATE TABLE IF NOT EXISTS arbitrage_swaps (
                arbitrage_id INTEGER NOT NULL REFERENCES arbitrages (id) ON DELETE CASCADE,
                swap_position INTEGER,
                swap_transaction_hash TEXT,
                swap_trace_address TEXT,
                PRIMARY KEY (arbitrage_id, swap_position)
            );

            CREATE TABLE IF NOT EXISTS liquidations (
                block_number INTEGER,
                transaction_hash TEXT,
                trace_address TEXT,
                protocol TEXT,
                liquidator_address TEXT,
                borrower_address TEXT,
                collateral_token_address TEXT,
                collateral_amount TEXT,
                debt_token_address TEXT,
                debt_amount TEXT,
                PRIMARY KEY (block_number, transaction_hash, trace_address)
            );

            CREATE TABLE IF NOT EXISTS punk_snipes (
                block_number INTEGER,
                transaction_hash TEXT,
                trace_address TEXT,
                bid_trace_address TEXT,
                bidder_address TEXT,
                accepter_address TEXT,
                punk_index TEXT,
                min_acceptance_price TEXT,
                acceptance_price TEXT,
                PRIMARY KEY (block_number, transaction_hash, trace_address, bid_trace_address)
            );

            CREATE TABLE IF NOT EXISTS miner_payments (
                block_number INTEGER,
                transaction_hash TEXT,
                transaction_index INTEGER,
                kind TEXT,
                recipient_address TEXT,
                amount TEXT,
                transaction_from_address TEXT,
                transaction_to_address TEXT,
                gas_used INTEGER,
                gas_price TEXT,
                base_fee_per_gas TEXT,
                gas_price_with_coinbase_transfer TEXT,
                PRIMARY KEY (block_number, transaction_hash, kind)
            );

            CREATE TABLE IF NOT EXISTS latest_block_update (
                block_number INTEGER PRIMARY KEY,
                updated_at TEXT
            );
            ",
        )?;
        Ok(())
    }

    /// Delete every row of kind `T` belonging to `block_number`.
    ///
    /// # Errors
    /// Returns error if the delete statement fails.
    pub fn delete_for_block<T: BlockRows>(&self, block_number: u64) -> Result<usize> {
        let deleted = self.conn()?.execute(
            &format!("DELETE FROM {} WHERE block_number = ?", T::TABLE),
            rusqlite::params![block_number],
        )?;
        Ok(deleted)
    }

    /// Batch insert rows of kind `T` in one transaction.
    ///
    /// # Errors
    /// Returns error if any insert fails; nothing is committed in that case.
    pub fn write_all<T: BlockRows>(&self, rows: &[T]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        T::insert_all(&tx, rows)?;
        tx.commit()?;
        Ok(rows.len())
    }

    /// Number of rows of kind `T` stored for `block_number`.
    pub fn count_for_block<T: BlockRows>(&self, block_number: u64) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE block_number = ?", T::TABLE),
            rusqlite::params![block_number],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All rows of kind `T` for `block_number`, rendered one string per row
    /// and sorted, for comparing the stored state of a block.
    pub fn snapshot_for_block<T: BlockRows>(&self, block_number: u64) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {cols} FROM {table} WHERE block_number = ? ORDER BY {cols}",
            cols = T::COLUMNS,
            table = T::TABLE
        ))?;
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map(rusqlite::params![block_number], |row| {
                let mut fields = Vec::with_capacity(column_count);
                for idx in 0..column_count {
                    let value: Value = row.get(idx)?;
                    fields.push(format!("{:?}", value));
                }
                Ok(fields.join("|"))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Swap references of every arbitrage in `block_number`, as
    /// `(transaction_hash, trace_address)` in arbitrage then swap order.
    pub fn arbitrage_swap_refs(&self, block_number: u64) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "
            SELECT s.swap_transaction_hash, s.swap_trace_address
            FROM arbitrage_swaps s
            JOIN arbitrages a ON a.id = s.arbitrage_id
            WHERE a.block_number = ?
            ORDER BY a.id, s.swap_position
            ",
        )?;
        let refs = stmt
            .query_map(rusqlite::params![block_number], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(refs)
    }

    /// Highest block number recorded as fully inspected, if any.
    pub fn find_latest_block_update(&self) -> Result<Option<u64>> {
        let block_number: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT block_number FROM latest_block_update ORDER BY block_number DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(block_number.map(|n| n as u64))
    }

    /// Replace the recorded watermark with `block_number`.
    pub fn update_latest_block(&self, block_number: u64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM latest_block_update", [])?;
        tx.execute(
            "INSERT INTO latest_block_update (block_number, updated_at) VALUES (?, ?)",
            rusqlite::params![block_number, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl BlockRows for Block {
    const TABLE: &'static str = "blocks";
    const COLUMNS: &'static str =
        "block_number, block_hash, miner, base_fee_per_gas, block_timestamp";

    fn to_row(&self) -> Vec<Value> {
        vec![
            int(self.block_number),
            hash(&self.block_hash),
            addr(&self.miner),
            wei(&U256::from(self.base_fee_per_gas)),
            int(self.timestamp),
        ]
    }
}

impl BlockRows for ClassifiedTrace {
    const TABLE: &'static str = "classified_traces";
    const COLUMNS: &'static str = "block_number, transaction_hash, transaction_position, \
        trace_address, call_kind, from_address, to_address, value, gas, gas_used, error, \
        classification, protocol, abi_name, function_name, inputs";

    fn to_row(&self) -> Vec<Value> {
        let trace = &self.trace;
        let inputs = serde_json::to_string(&self.inputs).unwrap_or_else(|_| "{}".to_string());
        vec![
            int(trace.block_number),
            nullable(trace.transaction_hash.as_ref().map(hash)),
            nullable(trace.transaction_position.map(int)),
            path(&trace.trace_address),
            text(trace.call_kind.as_str()),
            addr(&trace.from_address),
            nullable(trace.to_address.as_ref().map(addr)),
            wei(&trace.value),
            int(trace.gas),
            int(trace.gas_used),
            nullable(trace.error.clone().map(text)),
            text(self.classification.as_str()),
            nullable(self.protocol.map(|p| text(p.as_str()))),
            nullable(self.abi_name.clone().map(text)),
            nullable(self.function_name.clone().map(text)),
            text(inputs),
        ]
    }
}

impl BlockRows for Transfer {
    const TABLE: &'static str = "transfers";
    const COLUMNS: &'static str = "block_number, transaction_hash, trace_address, \
        from_address, to_address, amount, token_address";

    fn to_row(&self) -> Vec<Value> {
        vec![
            int(self.block_number),
            hash(&self.transaction_hash),
            path(&self.trace_address),
            addr(&self.from_address),
            addr(&self.to_address),
            wei(&self.amount),
            addr(&self.token_address),
        ]
    }
}

impl BlockRows for Swap {
    const TABLE: &'static str = "swaps";
    const COLUMNS: &'static str = "block_number, transaction_hash, trace_address, protocol, \
        abi_name, pool_address, account_address, recipient_address, token_in_address, \
        token_in_amount, token_out_address, token_out_amount";

    fn to_row(&self) -> Vec<Value> {
        vec![
            int(self.block_number),
            hash(&self.transaction_hash),
            path(&self.trace_address),
            nullable(self.protocol.map(|p| text(p.as_str()))),
            text(self.abi_name.clone()),
            addr(&self.pool_address),
            addr(&self.account_address),
            addr(&self.recipient_address),
            addr(&self.token_in_address),
            wei(&self.amount_in),
            addr(&self.token_out_address),
            wei(&self.amount_out),
        ]
    }
}

impl BlockRows for Arbitrage {
    const TABLE: &'static str = "arbitrages";
    const COLUMNS: &'static str = "block_number, transaction_hash, account_address, \
        profit_token_address, start_amount, end_amount, profit_amount";

    fn to_row(&self) -> Vec<Value> {
        vec![
            int(self.block_number),
            hash(&self.transaction_hash),
            addr(&self.account_address),
            addr(&self.profit_token_address),
            wei(&self.start_amount),
            wei(&self.end_amount),
            wei(&self.profit_amount),
        ]
    }

    fn insert_all(tx: &Transaction<'_>, rows: &[Self]) -> Result<()> {
        let mut arb_stmt = tx.prepare(&insert_sql(Self::TABLE, Self::COLUMNS))?;
        let mut swap_stmt = tx.prepare(
            "
            INSERT INTO arbitrage_swaps (
                arbitrage_id, swap_position, swap_transaction_hash, swap_trace_address
            ) VALUES (?, ?, ?, ?)
            ",
        )?;

        for arbitrage in rows {
            let arbitrage_id = arb_stmt.insert(rusqlite::params_from_iter(arbitrage.to_row()))?;
            for (position, swap) in arbitrage.swaps.iter().enumerate() {
                swap_stmt.execute(rusqlite::params![
                    arbitrage_id,
                    position as i64,
                    hash(&swap.transaction_hash),
                    path(&swap.trace_address),
                ])?;
            }
        }
        Ok(())
    }
}

impl BlockRows for Liquidation {
    const TABLE: &'static str = "liquidations";
    const COLUMNS: &'static str = "block_number, transaction_hash, trace_address, protocol, \
        liquidator_address, borrower_address, collateral_token_address, collateral_amount, \
        debt_token_address, debt_amount";

    fn to_row(&self) -> Vec<Value> {
        vec![
            int(self.block_number),
            hash(&self.transaction_hash),
            path(&self.trace_address),
            text(self.protocol.as_str()),
            addr(&self.liquidator_address),
            addr(&self.borrower_address),
            addr(&self.collateral_token_address),
            nullable(self.collateral_amount.as_ref().map(wei)),
            addr(&self.debt_token_address),
            wei(&self.debt_amount),
        ]
    }
}

impl BlockRows for PunkSnipe {
    const TABLE: &'static str = "punk_snipes";
    const COLUMNS: &'static str = "block_number, transaction_hash, trace_address, \
        bid_trace_address, bidder_address, accepter_address, punk_index, min_acceptance_price, \
        acceptance_price";

    fn to_row(&self) -> Vec<Value> {
        vec![
            int(self.block_number),
            hash(&self.transaction_hash),
            path(&self.trace_address),
            path(&self.bid_trace_address),
            addr(&self.bidder_address),
            addr(&self.accepter_address),
            wei(&self.punk_index),
            wei(&self.min_acceptance_price),
            wei(&self.acceptance_price),
        ]
    }
}

impl BlockRows for MinerPayment {
    const TABLE: &'static str = "miner_payments";
    const COLUMNS: &'static str = "block_number, transaction_hash, transaction_index, kind, \
        recipient_address, amount, transaction_from_address, transaction_to_address, gas_used, \
        gas_price, base_fee_per_gas, gas_price_with_coinbase_transfer";

    fn to_row(&self) -> Vec<Value> {
        vec![
            int(self.block_number),
            hash(&self.transaction_hash),
            int(self.transaction_index),
            text(self.kind.as_str()),
            addr(&self.recipient_address),
            wei(&self.amount),
            addr(&self.transaction_from_address),
            nullable(self.transaction_to_address.as_ref().map(addr)),
            int(self.gas_used),
            wei(&U256::from(self.gas_price)),
            wei(&U256::from(self.base_fee_per_gas)),
            wei(&self.gas_price_with_coinbase_transfer),
        ]
    }
}
