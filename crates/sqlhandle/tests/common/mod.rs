#![allow(dead_code)]

use asupersync::CancelReason;
use asupersync::runtime::RuntimeBuilder;
use sqlhandle::{
    BoxFuture, Config, ConnPool, Cx, Db, Dialector, Error, LogLevel, Logger, Outcome, Ping,
    PreparedStatement, Result, Row, Value, open,
};
use sqlhandle_core::{ConnectionError, ConnectionErrorKind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory pool that counts every call.
#[derive(Default)]
pub struct MockPool {
    pub prepares: AtomicUsize,
    pub executes: AtomicUsize,
    pub queries: AtomicUsize,
    pub pings: AtomicUsize,
    /// `None`: no ping capability. `Some(None)`: ping succeeds.
    /// `Some(Some(msg))`: ping fails with `msg`.
    pub ping: Option<Option<String>>,
    pub ping_cancelled: bool,
    pub rows_affected: u64,
    pub executed: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl MockPool {
    pub fn new() -> Self {
        Self {
            rows_affected: 1,
            ..Self::default()
        }
    }

    pub fn with_ping(mut self, failure: Option<&str>) -> Self {
        self.ping = Some(failure.map(str::to_string));
        self
    }

    pub fn with_cancelled_ping(mut self) -> Self {
        self.ping = Some(None);
        self.ping_cancelled = true;
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().expect("executed log").clone()
    }

    fn record(&self, sql: &str) {
        self.executed.lock().expect("executed log").push(sql.to_string());
    }
}

impl Ping for MockPool {
    fn ping<'a>(&'a self, _cx: &'a Cx) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.ping_cancelled {
                return Outcome::Cancelled(CancelReason::user("ping cancelled"));
            }
            match &self.ping {
                Some(Some(message)) => Outcome::Err(Error::Connection(ConnectionError {
                    kind: ConnectionErrorKind::Ping,
                    message: message.clone(),
                    source: None,
                })),
                _ => Outcome::Ok(()),
            }
        })
    }
}

impl ConnPool for MockPool {
    fn prepare<'a>(
        &'a self,
        _cx: &'a Cx,
        sql: &'a str,
    ) -> BoxFuture<'a, Outcome<PreparedStatement, Error>> {
        Box::pin(async move {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Outcome::Ok(PreparedStatement::new(id, sql, sql.matches('?').count()))
        })
    }

    fn query<'a>(
        &'a self,
        _cx: &'a Cx,
        sql: &'a str,
        _params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<Vec<Row>, Error>> {
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.record(sql);
            Outcome::Ok(vec![Row::new(vec!["id".into()], vec![Value::BigInt(1)])])
        })
    }

    fn execute<'a>(
        &'a self,
        _cx: &'a Cx,
        sql: &'a str,
        _params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<u64, Error>> {
        Box::pin(async move {
            self.executes.fetch_add(1, Ordering::SeqCst);
            self.record(sql);
            Outcome::Ok(self.rows_affected)
        })
    }

    fn query_prepared<'a>(
        &'a self,
        cx: &'a Cx,
        stmt: &'a PreparedStatement,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<Vec<Row>, Error>> {
        self.query(cx, stmt.sql(), params)
    }

    fn execute_prepared<'a>(
        &'a self,
        cx: &'a Cx,
        stmt: &'a PreparedStatement,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<u64, Error>> {
        self.execute(cx, stmt.sql(), params)
    }

    fn as_ping(&self) -> Option<&dyn Ping> {
        self.ping.as_ref().map(|_| self as &dyn Ping)
    }
}

/// Dialector that installs a [`MockPool`], optionally failing.
#[derive(Debug)]
pub struct MockDialector {
    pub pool: Arc<MockPool>,
    pub failure: Option<String>,
    pub initialized: AtomicUsize,
}

impl MockDialector {
    pub fn new(pool: Arc<MockPool>) -> Self {
        Self {
            pool,
            failure: None,
            initialized: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

impl std::fmt::Debug for MockPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPool").finish_non_exhaustive()
    }
}

impl Dialector for MockDialector {
    fn name(&self) -> &str {
        "mock"
    }

    fn initialize(&self, db: &mut Db) -> Result<()> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Arc::make_mut(&mut db.config).conn_pool = Some(Arc::clone(&self.pool) as Arc<dyn ConnPool>);
        match &self.failure {
            Some(message) => Err(Error::Custom(message.clone())),
            None => Ok(()),
        }
    }
}

/// Logger that keeps every message; loggers derived through `log_mode`
/// share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    level: LogLevel,
    records: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl RecordingLogger {
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .expect("log records")
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.records
            .lock()
            .expect("log records")
            .push((level, message.to_string()));
    }
}

impl Logger for RecordingLogger {
    fn log_mode(&self, level: LogLevel) -> Arc<dyn Logger> {
        Arc::new(Self {
            level,
            records: Arc::clone(&self.records),
        })
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

pub fn block_on<F: std::future::Future>(f: F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(f)
}

/// Open a handle over `pool` and panic unless it succeeds.
pub fn open_ok(pool: Arc<MockPool>, config: Config) -> Db {
    let cx = Cx::for_testing();
    let dialector: Arc<dyn Dialector> = Arc::new(MockDialector::new(pool));
    match block_on(open(&cx, dialector, Some(config))) {
        Outcome::Ok(db) => db,
        Outcome::Err(e) => panic!("open failed: {e}"),
        Outcome::Cancelled(_) => panic!("open was cancelled"),
        Outcome::Panicked(_) => panic!("open panicked"),
    }
}
