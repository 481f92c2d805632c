//! In-memory table backend for tests.
//!
//! Rows live in a map per table. Every call is counted so tests can assert
//! how many requests a code path issued, and failures or latency can be
//! injected for the next calls.

use super::{BackendError, BoxFuture, Table, TableBackend, TableQuery, NO_ROWS_CODE};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
  Select,
  SelectSingle,
  Insert,
  Update,
  Delete,
}

struct State {
  tables: HashMap<Table, Vec<Value>>,
  calls: HashMap<(Table, Op), usize>,
  next_id: u64,
  clock: DateTime<Utc>,
  failure: Option<BackendError>,
  latency: Option<Duration>,
}

impl State {
  fn tick(&mut self) -> String {
    self.clock += ChronoDuration::seconds(1);
    self.clock.to_rfc3339()
  }

  fn store(&mut self, table: Table, row: Value) -> Value {
    let mut obj = match row {
      Value::Object(obj) => obj,
      _ => Map::new(),
    };
    if !obj.contains_key("id") {
      self.next_id += 1;
      obj.insert(
        "id".to_string(),
        Value::String(format!("{}-{}", table.as_str(), self.next_id)),
      );
    }
    let now = self.tick();
    obj
      .entry("created_at")
      .or_insert_with(|| Value::String(now.clone()));
    obj.entry("updated_at").or_insert_with(|| Value::String(now));

    let row = Value::Object(obj);
    self.tables.entry(table).or_default().push(row.clone());
    row
  }

  fn matching(&self, query: &TableQuery) -> Vec<Value> {
    let mut rows: Vec<Value> = self
      .tables
      .get(&query.table)
      .map(|rows| {
        rows
          .iter()
          .filter(|row| matches(row, query))
          .cloned()
          .collect()
      })
      .unwrap_or_default();

    if let Some(order) = &query.order {
      rows.sort_by(|a, b| {
        let ord = compare(a.get(&order.column), b.get(&order.column));
        if order.ascending {
          ord
        } else {
          ord.reverse()
        }
      });
    }
    rows
  }
}

fn matches(row: &Value, query: &TableQuery) -> bool {
  query
    .filters
    .iter()
    .all(|f| row.get(&f.column) == Some(&f.value))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
    (Some(Value::Number(a)), Some(Value::Number(b))) => a
      .as_f64()
      .partial_cmp(&b.as_f64())
      .unwrap_or(Ordering::Equal),
    _ => Ordering::Equal,
  }
}

fn no_rows() -> BackendError {
  BackendError::with_code(
    NO_ROWS_CODE,
    "JSON object requested, multiple (or no) rows returned",
  )
}

pub struct MemoryBackend {
  state: Mutex<State>,
}

impl Default for MemoryBackend {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(State {
        tables: HashMap::new(),
        calls: HashMap::new(),
        next_id: 0,
        clock: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        failure: None,
        latency: None,
      }),
    }
  }

  /// Store a row directly, without counting a call.
  pub fn seed(&self, table: Table, row: Value) -> Value {
    self.state.lock().unwrap().store(table, row)
  }

  pub fn rows(&self, table: Table) -> Vec<Value> {
    let state = self.state.lock().unwrap();
    state.tables.get(&table).cloned().unwrap_or_default()
  }

  pub fn calls(&self, table: Table, op: Op) -> usize {
    let state = self.state.lock().unwrap();
    state.calls.get(&(table, op)).copied().unwrap_or(0)
  }

  pub fn total_calls(&self) -> usize {
    self.state.lock().unwrap().calls.values().sum()
  }

  /// Make every following call fail with `failure` (or succeed again with `None`).
  pub fn fail_with(&self, failure: Option<BackendError>) {
    self.state.lock().unwrap().failure = failure;
  }

  /// Delay every following response by `latency`.
  pub fn set_latency(&self, latency: Duration) {
    self.state.lock().unwrap().latency = Some(latency);
  }

  fn call<T: Send + 'static>(
    &self,
    table: Table,
    op: Op,
    f: impl FnOnce(&mut State) -> Result<T, BackendError>,
  ) -> BoxFuture<T> {
    let mut state = self.state.lock().unwrap();
    *state.calls.entry((table, op)).or_insert(0) += 1;
    let latency = state.latency;
    let result = match state.failure.clone() {
      Some(err) => Err(err),
      None => f(&mut *state),
    };
    Box::pin(async move {
      if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
      }
      result
    })
  }
}

impl TableBackend for MemoryBackend {
  fn select(&self, query: TableQuery) -> BoxFuture<Vec<Value>> {
    self.call(query.table, Op::Select, move |state| Ok(state.matching(&query)))
  }

  fn select_single(&self, query: TableQuery) -> BoxFuture<Value> {
    self.call(query.table, Op::SelectSingle, move |state| {
      let mut rows = state.matching(&query);
      if rows.len() == 1 {
        Ok(rows.remove(0))
      } else {
        Err(no_rows())
      }
    })
  }

  fn insert(&self, table: Table, row: Value) -> BoxFuture<Value> {
    self.call(table, Op::Insert, move |state| Ok(state.store(table, row)))
  }

  fn update(&self, query: TableQuery, patch: Value) -> BoxFuture<Value> {
    self.call(query.table, Op::Update, move |state| {
      let now = state.tick();
      let rows = state.tables.entry(query.table).or_default();
      let mut updated = None;
      for row in rows.iter_mut().filter(|row| matches(row, &query)) {
        if let (Value::Object(target), Value::Object(changes)) = (&mut *row, &patch) {
          for (key, value) in changes {
            target.insert(key.clone(), value.clone());
          }
          target.insert("updated_at".to_string(), Value::String(now.clone()));
        }
        updated.get_or_insert_with(|| row.clone());
      }
      updated.ok_or_else(no_rows)
    })
  }

  fn delete(&self, query: TableQuery) -> BoxFuture<()> {
    self.call(query.table, Op::Delete, move |state| {
      if let Some(rows) = state.tables.get_mut(&query.table) {
        rows.retain(|row| !matches(row, &query));
      }
      Ok(())
    })
  }
}
