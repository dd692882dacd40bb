//! Contract implementations for [`AsyncPgConnection`].

use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::result::{Error, QueryResult};
use diesel::sql_types::{Array, BigInt, Bool, Double, Float, Integer, SmallInt, Text};
use diesel::{QueryableByName, sql_types};
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};

use super::{CursorExecutor, Executor, Loader, Model, Transactional};
use crate::TRACING_TARGET_QUERY;
use crate::query::{Query, SelectQuery, Statement, quote_ident};
use crate::types::{PrimaryKey, SqlValue};

type BoxedQuery = BoxedSqlQuery<'static, Pg, SqlQuery>;

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(QueryableByName)]
struct CursorKeyRow {
    #[diesel(sql_type = Text)]
    cursor_key: String,
}

/// Builds a boxed raw query with every value bound in order.
fn prepare(statement: Statement) -> BoxedQuery {
    let (sql, binds) = statement.into_parts();
    tracing::trace!(target: TRACING_TARGET_QUERY, sql = %sql, binds = binds.len(), "Preparing statement");

    binds
        .into_iter()
        .fold(diesel::sql_query(sql).into_boxed::<Pg>(), bind)
}

fn bind(query: BoxedQuery, value: SqlValue) -> BoxedQuery {
    match value {
        SqlValue::Bool(v) => query.bind::<Bool, _>(v),
        SqlValue::SmallInt(v) => query.bind::<SmallInt, _>(v),
        SqlValue::Int(v) => query.bind::<Integer, _>(v),
        SqlValue::BigInt(v) => query.bind::<BigInt, _>(v),
        SqlValue::Real(v) => query.bind::<Float, _>(v),
        SqlValue::Double(v) => query.bind::<Double, _>(v),
        SqlValue::Text(v) => query.bind::<Text, _>(v),
        SqlValue::Uuid(v) => query.bind::<sql_types::Uuid, _>(v),
        SqlValue::SmallIntArray(v) => query.bind::<Array<SmallInt>, _>(v),
        SqlValue::IntArray(v) => query.bind::<Array<Integer>, _>(v),
        SqlValue::BigIntArray(v) => query.bind::<Array<BigInt>, _>(v),
        SqlValue::RealArray(v) => query.bind::<Array<Float>, _>(v),
        SqlValue::DoubleArray(v) => query.bind::<Array<Double>, _>(v),
        SqlValue::TextArray(v) => query.bind::<Array<Text>, _>(v),
        SqlValue::UuidArray(v) => query.bind::<Array<sql_types::Uuid>, _>(v),
    }
}

impl Executor for AsyncPgConnection {
    async fn execute(&mut self, query: &Query) -> QueryResult<usize> {
        prepare(query.to_statement()).execute(self).await
    }

    async fn execute_raw(&mut self, sql: &str, binds: Vec<SqlValue>) -> QueryResult<usize> {
        prepare(Statement::with_binds(sql, binds)).execute(self).await
    }
}

impl<M> Loader<M> for AsyncPgConnection
where
    M: Model + QueryableByName<Pg>,
{
    async fn load(&mut self, query: &Query) -> QueryResult<Vec<M>> {
        prepare(query.to_statement()).load::<M>(self).await
    }

    async fn count(&mut self, query: &SelectQuery) -> QueryResult<i64> {
        let row: CountRow = prepare(query.to_count_statement())
            .get_result(self)
            .await?;
        Ok(row.count)
    }
}

impl Transactional for AsyncPgConnection {
    async fn begin(&mut self) -> QueryResult<()> {
        AnsiTransactionManager::begin_transaction(self).await
    }

    async fn commit(&mut self) -> QueryResult<()> {
        AnsiTransactionManager::commit_transaction(self).await
    }

    async fn rollback(&mut self) -> QueryResult<()> {
        AnsiTransactionManager::rollback_transaction(self).await
    }

    fn in_transaction(&mut self) -> bool {
        matches!(
            AnsiTransactionManager::transaction_manager_status_mut(self).transaction_depth(),
            Ok(Some(_))
        )
    }
}

impl CursorExecutor for AsyncPgConnection {
    async fn declare_cursor(&mut self, name: &str, query: &SelectQuery) -> QueryResult<()> {
        let mut statement = query.to_statement();
        statement.prepend_sql(&format!(
            "DECLARE {} NO SCROLL CURSOR WITHOUT HOLD FOR ",
            quote_ident(name)
        ));

        prepare(statement).execute(self).await.map(drop)
    }

    async fn fetch_forward<K: PrimaryKey>(
        &mut self,
        name: &str,
        count: usize,
    ) -> QueryResult<Vec<K>> {
        let sql = format!("FETCH FORWARD {count} FROM {}", quote_ident(name));
        let rows: Vec<CursorKeyRow> = diesel::sql_query(sql).load(self).await?;

        rows.iter()
            .map(|row| K::parse_key(&row.cursor_key).map_err(Error::DeserializationError))
            .collect()
    }

    async fn close_cursor(&mut self, name: &str) -> QueryResult<()> {
        let sql = format!("CLOSE {}", quote_ident(name));
        diesel::sql_query(sql).execute(self).await.map(drop)
    }
}
