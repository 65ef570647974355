use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use tokio::net::TcpStream;

use crate::auth::{resolve_role, HotelAuthSource, RoleError};
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command};

pub struct HotelHandler {
    engine: Arc<Engine>,
    query_parser: Arc<HotelQueryParser>,
}

impl HotelHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(HotelQueryParser),
        }
    }

    /// The role is the login user name of the connection.
    fn resolve_role<C: ClientInfo>(&self, client: &C) -> PgWireResult<Role> {
        let login = client.metadata().get("user").map(String::as_str);
        resolve_role(login).map_err(role_err)
    }

    /// Resolve the role, parse, execute, and record query metrics.
    async fn run<C: ClientInfo>(
        &self,
        client: &C,
        query: &str,
        format: &Format,
    ) -> PgWireResult<Vec<Response>> {
        let role = self.resolve_role(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        let label = observability::command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(role, cmd, format).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(
        &self,
        role: Role,
        cmd: Command,
        format: &Format,
    ) -> PgWireResult<Vec<Response>> {
        let engine = &self.engine;
        match cmd {
            Command::InsertBooking {
                room_id,
                user_name,
                start,
                end,
            } => {
                let booking = engine
                    .create_booking(role, room_id, user_name, start, end)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![bookings_response(vec![booking], format)])
            }
            Command::SelectBookings => {
                let bookings = engine.list_bookings(role).await.map_err(engine_err)?;
                Ok(vec![bookings_response(bookings, format)])
            }
            Command::UpdateBooking { id, start, end } => {
                let booking = engine
                    .update_booking(role, id, start, end)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![bookings_response(vec![booking], format)])
            }
            Command::DeleteBooking { id } => {
                engine.delete_booking(role, id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::SelectRooms { id } => {
                let rooms = match id {
                    Some(id) => engine.get_room(id).into_iter().collect(),
                    None => engine.list_rooms(),
                };
                Ok(vec![rooms_response(rooms, format)])
            }
        }
    }
}

/// Column format the client asked for at `idx`. A short per-column list
/// falls back to text rather than indexing past its end.
fn column_format(format: &Format, idx: usize) -> FieldFormat {
    match format {
        Format::Individual(codes) if idx >= codes.len() => FieldFormat::Text,
        _ => format.format_for(idx),
    }
}

fn schema(columns: &[(&str, Type)], format: &Format) -> Vec<FieldInfo> {
    columns
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| {
            FieldInfo::new(
                (*name).into(),
                None,
                None,
                ty.clone(),
                column_format(format, i),
            )
        })
        .collect()
}

fn bookings_schema(format: &Format) -> Vec<FieldInfo> {
    schema(
        &[
            ("id", Type::INT8),
            ("room_id", Type::INT8),
            ("user_name", Type::VARCHAR),
            ("start_date", Type::DATE),
            ("end_date", Type::DATE),
        ],
        format,
    )
}

fn rooms_schema(format: &Format) -> Vec<FieldInfo> {
    schema(
        &[
            ("id", Type::INT8),
            ("number", Type::VARCHAR),
            ("type", Type::VARCHAR),
            ("price", Type::FLOAT8),
            ("description", Type::VARCHAR),
        ],
        format,
    )
}

fn bookings_response(bookings: Vec<Booking>, format: &Format) -> Response {
    let schema = Arc::new(bookings_schema(format));
    let rows: Vec<PgWireResult<_>> = bookings
        .into_iter()
        .map(|b| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&b.id)?;
            encoder.encode_field(&b.room_id)?;
            encoder.encode_field(&b.user_name)?;
            encoder.encode_field(&b.start_date())?;
            encoder.encode_field(&b.end_date())?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn rooms_response(rooms: Vec<Room>, format: &Format) -> Response {
    let schema = Arc::new(rooms_schema(format));
    let rows: Vec<PgWireResult<_>> = rooms
        .into_iter()
        .map(|r| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&r.id)?;
            encoder.encode_field(&r.number)?;
            encoder.encode_field(&r.kind)?;
            encoder.encode_field(&r.price)?;
            encoder.encode_field(&r.description)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

/// Row shape a statement will produce, judged from its text alone since
/// `$N` placeholders are not parseable until bound.
fn result_schema(stmt: &str, format: &Format) -> Vec<FieldInfo> {
    let upper = stmt.to_uppercase();
    if upper.contains("ROOMS") && upper.contains("SELECT") {
        rooms_schema(format)
    } else if upper.contains("BOOKINGS") && !upper.trim_start().starts_with("DELETE") {
        bookings_schema(format)
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for HotelHandler {
    async fn do_query<C>(&self, client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        self.run(client, query, &Format::UnifiedText).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct HotelQueryParser;

#[async_trait]
impl QueryParser for HotelQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt, column_format.unwrap_or(&Format::UnifiedText)))
    }
}

#[async_trait]
impl ExtendedQueryHandler for HotelHandler {
    type Statement = String;
    type QueryParser = HotelQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        self.run(client, &sql, &portal.result_column_format)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| sql_err(sql::SqlError::Empty))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            result_schema(&target.statement, &Format::UnifiedText),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(
            &target.statement.statement,
            &target.result_column_format,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start
                && let Ok(n) = sql[start..i].parse::<usize>()
            {
                max = max.max(n);
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
/// Highest index first, so `$1` never clobbers the prefix of `$10`.
fn substitute_params(portal: &Portal<String>) -> String {
    let values: Vec<Option<String>> = portal
        .parameters
        .iter()
        .map(|p| p.as_ref().map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
        .collect();
    substitute(&portal.statement.statement, &values)
}

fn substitute(sql: &str, params: &[Option<String>]) -> String {
    let mut result = sql.to_string();
    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(text) => format!("'{}'", text.replace('\'', "''")),
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }
    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct HotelFactory {
    handler: Arc<HotelHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<HotelAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl HotelFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = HotelAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(HotelHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for HotelFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
) -> std::io::Result<()> {
    let factory = HotelFactory::new(engine, password);
    pgwire::tokio::process_socket(socket, None, factory).await
}

// ── Error mapping ────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

/// SQLSTATE for each engine failure.
fn engine_sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::InvalidRange { .. } => "22023",
        EngineError::RoomNotFound(_) | EngineError::BookingNotFound(_) => "P0002",
        EngineError::RoomUnavailable { .. } => "23P01",
        EngineError::Forbidden(_) => "42501",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    metrics::counter!(observability::ENGINE_REJECTIONS_TOTAL, "reason" => e.reason()).increment(1);
    tracing::debug!("engine rejected request: {e}");
    user_error(engine_sqlstate(&e), e.to_string())
}

fn role_err(e: RoleError) -> PgWireError {
    tracing::debug!("role resolution failed: {e}");
    user_error("28000", e.to_string())
}

fn sql_err(e: sql::SqlError) -> PgWireError {
    user_error("42601", e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_params_finds_highest() {
        assert_eq!(count_params("SELECT * FROM bookings"), 0);
        assert_eq!(count_params("DELETE FROM bookings WHERE id = $1"), 1);
        assert_eq!(
            count_params("INSERT INTO bookings VALUES ($1, $2, $3, $4)"),
            4
        );
        assert_eq!(
            count_params("UPDATE bookings SET start_date = $3, end_date = $2 WHERE id = $1"),
            3
        );
    }

    #[test]
    fn substitute_quotes_and_escapes() {
        let sql = "INSERT INTO bookings VALUES ($1, $2, $3, $4)";
        let params = vec![
            Some("1".to_string()),
            Some("O'Brien".to_string()),
            Some("2024-01-01".to_string()),
            None,
        ];
        assert_eq!(
            substitute(sql, &params),
            "INSERT INTO bookings VALUES ('1', 'O''Brien', '2024-01-01', NULL)"
        );
    }

    #[test]
    fn substitute_handles_double_digit_placeholders() {
        let sql = "SELECT $1, $10";
        let mut params: Vec<Option<String>> = (1..=10).map(|i| Some(i.to_string())).collect();
        params[0] = Some("one".into());
        assert_eq!(substitute(sql, &params), "SELECT 'one', '10'");
    }

    #[test]
    fn result_schema_by_statement() {
        let text = Format::UnifiedText;
        assert_eq!(result_schema("SELECT * FROM rooms", &text).len(), 5);
        assert_eq!(result_schema("select * from bookings", &text).len(), 5);
        let insert = "INSERT INTO bookings VALUES ($1, $2, $3, $4)";
        assert_eq!(result_schema(insert, &text).len(), 5);
        assert!(result_schema("DELETE FROM bookings WHERE id = $1", &text).is_empty());
    }

    #[test]
    fn result_schema_follows_requested_format() {
        let binary = result_schema("SELECT * FROM bookings", &Format::UnifiedBinary);
        assert!(binary.iter().all(|f| f.format() == FieldFormat::Binary));

        let mixed = result_schema("SELECT * FROM bookings", &Format::Individual(vec![1, 0]));
        assert_eq!(mixed[0].format(), FieldFormat::Binary);
        assert_eq!(mixed[1].format(), FieldFormat::Text);
        assert_eq!(mixed[4].format(), FieldFormat::Text);
    }

    #[test]
    fn sqlstate_per_engine_error() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            engine_sqlstate(&EngineError::InvalidRange { start: date, end: date }),
            "22023"
        );
        assert_eq!(engine_sqlstate(&EngineError::RoomNotFound(1)), "P0002");
        assert_eq!(engine_sqlstate(&EngineError::BookingNotFound(1)), "P0002");
        assert_eq!(
            engine_sqlstate(&EngineError::RoomUnavailable { room_id: 1, conflicting: 2 }),
            "23P01"
        );
        assert_eq!(engine_sqlstate(&EngineError::Forbidden("list bookings")), "42501");
    }
}
