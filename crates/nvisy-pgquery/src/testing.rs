//! In-memory doubles for the execution contracts.

use std::collections::{HashMap, VecDeque};

use diesel::result::{Error, QueryResult};
use uuid::Uuid;

use crate::executor::{CursorExecutor, Executor, Loader, Model, Relation, Transactional};
use crate::query::{Condition, Query, SelectQuery};
use crate::types::{DeletedScope, PrimaryKey, SqlValue};

/// A soft-deletable model with an integer key and one relation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Widget {
    pub id: i64,
    pub name: String,
    pub deleted: bool,
}

impl Widget {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: format!("widget-{id}"),
            deleted: false,
        }
    }

    pub fn deleted(id: i64) -> Self {
        Self {
            deleted: true,
            ..Self::new(id)
        }
    }
}

impl Model for Widget {
    type Key = i64;

    const TABLE: &'static str = "widgets";
    const SOFT_DELETE_COLUMN: Option<&'static str> = Some("deleted_at");

    fn primary_key(&self) -> i64 {
        self.id
    }

    fn relation(name: &str) -> Option<Relation> {
        match name {
            "owner" => Some(Relation {
                join: r#"LEFT JOIN "owners" ON "owners"."id" = "widgets"."owner_id""#,
                columns: &[r#""owners"."name" AS "owner_name""#],
            }),
            _ => None,
        }
    }
}

/// A model keyed by an opaque identifier.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub id: Uuid,
}

impl Model for Token {
    type Key = Uuid;

    const TABLE: &'static str = "tokens";

    fn primary_key(&self) -> Uuid {
        self.id
    }
}

/// A model whose writes maintain `created_at` and `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Document {
    pub id: i64,
}

impl Model for Document {
    type Key = i64;

    const TABLE: &'static str = "documents";
    const TIMESTAMPS: bool = true;

    fn primary_key(&self) -> i64 {
        self.id
    }
}

/// Rows the fake database can hold.
pub(crate) trait FakeRow: Model + Clone {
    fn is_deleted(&self) -> bool {
        false
    }
}

impl FakeRow for Widget {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl FakeRow for Token {}

/// An in-memory table of `M` rows.
///
/// SELECTs honour structured key conditions (`>` and `= ANY`), the
/// soft-delete scope, a trailing `DESC` on the first ORDER BY expression,
/// and OFFSET/LIMIT. Raw conditions are recorded but not evaluated.
pub(crate) struct FakeDb<M> {
    pub rows: Vec<M>,
    /// Operations in the order they ran, e.g. `begin`, `fetch 2`, `load`.
    pub events: Vec<String>,
    /// Rendered SQL of every loaded or declared query.
    pub statements: Vec<String>,
    /// Raw statements passed to [`Executor::execute_raw`].
    pub raw: Vec<(String, Vec<SqlValue>)>,
    /// The event name (e.g. `"load"`, `"commit"`) that fails with an injected error.
    pub fail_on: Option<&'static str>,
    /// Makes key-filtered loads return nothing, as if rows vanished.
    pub hide_fetched_rows: bool,
    depth: u32,
    cursors: HashMap<String, VecDeque<String>>,
}

impl<M: FakeRow> FakeDb<M> {
    pub fn new(rows: Vec<M>) -> Self {
        Self {
            rows,
            events: Vec::new(),
            statements: Vec::new(),
            raw: Vec::new(),
            fail_on: None,
            hide_fetched_rows: false,
            depth: 0,
            cursors: HashMap::new(),
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns the events whose name starts with `prefix`.
    pub fn count_events(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn record(&mut self, event: impl Into<String>) -> QueryResult<()> {
        let event = event.into();
        let failed = self
            .fail_on
            .is_some_and(|name| event.split(' ').next() == Some(name));
        self.events.push(event);

        if failed {
            Err(Error::QueryBuilderError("injected failure".into()))
        } else {
            Ok(())
        }
    }

    fn select(&self, query: &SelectQuery, paginated: bool) -> Vec<M> {
        let mut rows: Vec<M> = self
            .rows
            .iter()
            .filter(|row| visible(*row, query.deleted_scope()))
            .filter(|row| {
                let key = row.primary_key().to_value();
                query.conditions().iter().all(|c| match c {
                    Condition::Gt { value, .. } => greater(&key, value),
                    Condition::AnyOf { values, .. } => {
                        !self.hide_fetched_rows && contains(values, &key)
                    }
                    Condition::Raw { .. } => true,
                })
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            a.primary_key()
                .partial_cmp(&b.primary_key())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if query
            .order_exprs()
            .first()
            .is_some_and(|expr| expr.ends_with(" DESC"))
        {
            rows.reverse();
        }

        if !paginated {
            return rows;
        }

        let offset = query.offset().unwrap_or(0) as usize;
        let limit = query.limit().map_or(usize::MAX, |l| l as usize);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

fn visible<M: FakeRow>(row: &M, scope: DeletedScope) -> bool {
    if M::SOFT_DELETE_COLUMN.is_none() {
        return true;
    }

    match scope {
        DeletedScope::Default => !row.is_deleted(),
        DeletedScope::WithDeleted => true,
        DeletedScope::OnlyDeleted => row.is_deleted(),
    }
}

fn greater(key: &SqlValue, bound: &SqlValue) -> bool {
    match (key, bound) {
        (SqlValue::SmallInt(k), SqlValue::SmallInt(b)) => k > b,
        (SqlValue::Int(k), SqlValue::Int(b)) => k > b,
        (SqlValue::BigInt(k), SqlValue::BigInt(b)) => k > b,
        (SqlValue::Double(k), SqlValue::Double(b)) => k > b,
        (SqlValue::Text(k), SqlValue::Text(b)) => k > b,
        (SqlValue::Uuid(k), SqlValue::Uuid(b)) => k > b,
        _ => false,
    }
}

fn contains(values: &SqlValue, key: &SqlValue) -> bool {
    match (values, key) {
        (SqlValue::SmallIntArray(v), SqlValue::SmallInt(k)) => v.contains(k),
        (SqlValue::IntArray(v), SqlValue::Int(k)) => v.contains(k),
        (SqlValue::BigIntArray(v), SqlValue::BigInt(k)) => v.contains(k),
        (SqlValue::DoubleArray(v), SqlValue::Double(k)) => v.contains(k),
        (SqlValue::TextArray(v), SqlValue::Text(k)) => v.contains(k),
        (SqlValue::UuidArray(v), SqlValue::Uuid(k)) => v.contains(k),
        _ => false,
    }
}

impl<M: FakeRow> Executor for FakeDb<M> {
    async fn execute(&mut self, query: &Query) -> QueryResult<usize> {
        self.record(format!("execute {}", query.kind()))?;
        self.statements.push(query.to_statement().sql().to_owned());
        Ok(1)
    }

    async fn execute_raw(&mut self, sql: &str, binds: Vec<SqlValue>) -> QueryResult<usize> {
        self.record("raw")?;
        self.raw.push((sql.to_owned(), binds));
        Ok(1)
    }
}

impl<M: FakeRow> Loader<M> for FakeDb<M> {
    async fn load(&mut self, query: &Query) -> QueryResult<Vec<M>> {
        self.record("load")?;
        self.statements.push(query.to_statement().sql().to_owned());

        match query {
            Query::Select(select) => Ok(self.select(select, true)),
            other => Err(Error::QueryBuilderError(
                format!("cannot load rows from {}", other.kind()).into(),
            )),
        }
    }

    async fn count(&mut self, query: &SelectQuery) -> QueryResult<i64> {
        self.record("count")?;
        Ok(self.select(query, false).len() as i64)
    }
}

impl<M: FakeRow> Transactional for FakeDb<M> {
    async fn begin(&mut self) -> QueryResult<()> {
        self.record("begin")?;
        self.depth += 1;
        Ok(())
    }

    async fn commit(&mut self) -> QueryResult<()> {
        self.record("commit")?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    async fn rollback(&mut self) -> QueryResult<()> {
        self.depth = self.depth.saturating_sub(1);
        self.record("rollback")
    }

    fn in_transaction(&mut self) -> bool {
        self.depth > 0
    }
}

impl<M: FakeRow> CursorExecutor for FakeDb<M> {
    async fn declare_cursor(&mut self, name: &str, query: &SelectQuery) -> QueryResult<()> {
        self.record(format!("declare {name}"))?;
        if self.depth == 0 {
            return Err(Error::QueryBuilderError(
                "DECLARE CURSOR can only be used in transaction blocks".into(),
            ));
        }

        self.statements.push(query.to_statement().sql().to_owned());
        let keys = self
            .select(query, true)
            .iter()
            .map(|row| row.primary_key().to_string())
            .collect();
        self.cursors.insert(name.to_owned(), keys);
        Ok(())
    }

    async fn fetch_forward<K: PrimaryKey>(
        &mut self,
        name: &str,
        count: usize,
    ) -> QueryResult<Vec<K>> {
        self.record(format!("fetch {count}"))?;
        let cursor = self
            .cursors
            .get_mut(name)
            .ok_or_else(|| Error::QueryBuilderError(format!("cursor {name} does not exist").into()))?;

        let take = count.min(cursor.len());
        cursor
            .drain(..take)
            .map(|text| K::parse_key(&text).map_err(Error::DeserializationError))
            .collect()
    }

    async fn close_cursor(&mut self, name: &str) -> QueryResult<()> {
        self.record("close")?;
        self.cursors.remove(name);
        Ok(())
    }
}

/// Builds live widgets with the given ids.
pub(crate) fn widgets(ids: impl IntoIterator<Item = i64>) -> Vec<Widget> {
    ids.into_iter().map(Widget::new).collect()
}
