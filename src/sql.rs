use chrono::NaiveDate;
use sqlparser::ast::{
    self, AssignmentTarget, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor,
    TableObject, Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::limits::*;
use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertBooking {
        room_id: RoomId,
        user_name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    SelectBookings,
    UpdateBooking {
        id: BookingId,
        start: NaiveDate,
        end: NaiveDate,
    },
    DeleteBooking {
        id: BookingId,
    },
    SelectRooms {
        id: Option<RoomId>,
    },
}

/// Column order of `bookings` when an INSERT omits its column list.
const BOOKING_INSERT_COLUMNS: [&str; 4] = ["room_id", "user_name", "start_date", "end_date"];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    if sql.len() > MAX_QUERY_LEN {
        return Err(SqlError::InvalidArgument(format!(
            "query longer than {MAX_QUERY_LEN} bytes"
        )));
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    if table != "bookings" {
        return Err(SqlError::UnknownTable(table));
    }

    let values = extract_insert_values(insert)?;
    let columns: Vec<String> = if insert.columns.is_empty() {
        BOOKING_INSERT_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        insert.columns.iter().map(|c| c.value.to_lowercase()).collect()
    };
    if values.len() != columns.len() {
        return Err(SqlError::WrongArity("bookings", columns.len(), values.len()));
    }

    let (mut room_id, mut user_name, mut start, mut end) = (None, None, None, None);
    for (col, value) in columns.iter().zip(values.iter()) {
        match col.as_str() {
            "room_id" => room_id = Some(parse_id(value)?),
            "user_name" => user_name = Some(parse_user_name(value)?),
            "start_date" => start = Some(parse_date(value)?),
            "end_date" => end = Some(parse_date(value)?),
            "id" => return Err(SqlError::Unsupported("booking ids are assigned by the server".into())),
            other => return Err(SqlError::Parse(format!("unknown column: {other}"))),
        }
    }

    Ok(Command::InsertBooking {
        room_id: room_id.ok_or(SqlError::MissingColumn("room_id"))?,
        user_name: user_name.ok_or(SqlError::MissingColumn("user_name"))?,
        start: start.ok_or(SqlError::MissingColumn("start_date"))?,
        end: end.ok_or(SqlError::MissingColumn("end_date"))?,
    })
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let name = table_factor_name(&table.relation)?;
    if name != "bookings" {
        return Err(SqlError::UnknownTable(name));
    }

    let (mut start, mut end) = (None, None);
    for assignment in assignments {
        let col = match &assignment.target {
            AssignmentTarget::ColumnName(name) => {
                object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))?
            }
            _ => return Err(SqlError::Unsupported("tuple assignment".into())),
        };
        match col.as_str() {
            "start_date" => start = Some(parse_date(&assignment.value)?),
            "end_date" => end = Some(parse_date(&assignment.value)?),
            other => {
                return Err(SqlError::Unsupported(format!("column {other} cannot be updated")));
            }
        }
    }

    let id = extract_where_id(selection)?;
    Ok(Command::UpdateBooking {
        id,
        start: start.ok_or(SqlError::MissingColumn("start_date"))?,
        end: end.ok_or(SqlError::MissingColumn("end_date"))?,
    })
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    if table != "bookings" {
        return Err(SqlError::UnknownTable(table));
    }
    let id = extract_where_id(&delete.selection)?;
    Ok(Command::DeleteBooking { id })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    match table.as_str() {
        "bookings" => {
            if select.selection.is_some() {
                return Err(SqlError::Unsupported("filters on bookings".into()));
            }
            Ok(Command::SelectBookings)
        }
        "rooms" => {
            let id = match &select.selection {
                Some(_) => Some(extract_where_id(&select.selection)?),
                None => None,
            };
            Ok(Command::SelectRooms { id })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.len() {
            0 => Err(SqlError::Parse("empty VALUES".into())),
            1 => Ok(values.rows[0].clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<i64, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_id(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        Expr::Nested(inner) => extract_where_id(&Some(inner.as_ref().clone())),
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_i64_expr(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        let v = parse_i64_expr(expr)?;
        v.checked_neg()
            .ok_or_else(|| SqlError::InvalidArgument(format!("integer out of range: -({v})")))
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

/// Room and booking ids are positive integers.
fn parse_id(expr: &Expr) -> Result<i64, SqlError> {
    let v = parse_i64_expr(expr)?;
    if v <= 0 {
        return Err(SqlError::InvalidArgument(format!("id must be positive, got {v}")));
    }
    Ok(v)
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) | Some(Value::DoubleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_user_name(expr: &Expr) -> Result<String, SqlError> {
    let name = parse_string(expr)?;
    if name.trim().is_empty() {
        return Err(SqlError::InvalidArgument("user_name must not be empty".into()));
    }
    if name.len() > MAX_USER_NAME_LEN {
        return Err(SqlError::InvalidArgument(format!(
            "user_name longer than {MAX_USER_NAME_LEN} bytes"
        )));
    }
    Ok(name)
}

/// ISO `YYYY-MM-DD`, optionally cast (`'2024-01-01'::date`).
fn parse_date(expr: &Expr) -> Result<NaiveDate, SqlError> {
    if let Expr::Cast { expr: inner, .. } = expr {
        return parse_date(inner);
    }
    let s = parse_string(expr)?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| SqlError::InvalidArgument(format!("bad date {s:?}: {e}")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    MissingColumn(&'static str),
    InvalidArgument(String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::MissingColumn(col) => write!(f, "missing column: {col}"),
            SqlError::InvalidArgument(s) => write!(f, "invalid argument: {s}"),
        }
    }
}

impl std::error::Error for SqlError {}
