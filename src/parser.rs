//! Command text inspection used to name profiling spans.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::driver::CommandType;

/// Leading verb of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOperation {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Create,
    Drop,
    Alter,
    Truncate,
    Begin,
    Commit,
    Rollback,
    Set,
    Exec,
    Other,
}

impl StatementOperation {
    /// Get the verb as it appears in span names.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementOperation::Select => "SELECT",
            StatementOperation::Insert => "INSERT",
            StatementOperation::Update => "UPDATE",
            StatementOperation::Delete => "DELETE",
            StatementOperation::Merge => "MERGE",
            StatementOperation::Create => "CREATE",
            StatementOperation::Drop => "DROP",
            StatementOperation::Alter => "ALTER",
            StatementOperation::Truncate => "TRUNCATE",
            StatementOperation::Begin => "BEGIN",
            StatementOperation::Commit => "COMMIT",
            StatementOperation::Rollback => "ROLLBACK",
            StatementOperation::Set => "SET",
            StatementOperation::Exec => "EXEC",
            StatementOperation::Other => "QUERY",
        }
    }

    /// Pattern capturing the primary table for this operation, if any.
    fn table_pattern(&self) -> Option<&'static Regex> {
        let regex = match self {
            StatementOperation::Select => &*FROM_TABLE,
            StatementOperation::Insert => &*INSERT_TABLE,
            StatementOperation::Update => &*UPDATE_TABLE,
            StatementOperation::Delete => &*DELETE_TABLE,
            StatementOperation::Merge => &*MERGE_TABLE,
            StatementOperation::Create => &*CREATE_TABLE,
            StatementOperation::Drop => &*DROP_TABLE,
            StatementOperation::Alter => &*ALTER_TABLE,
            StatementOperation::Truncate => &*TRUNCATE_TABLE,
            StatementOperation::Exec => &*EXEC_TARGET,
            _ => return None,
        };
        Some(regex)
    }
}

impl std::fmt::Display for StatementOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quoted or bare identifier, optionally schema-qualified; the last part is captured.
macro_rules! table_regex {
    ($prefix:literal) => {
        Lazy::new(|| {
            Regex::new(concat!(
                "(?i)",
                $prefix,
                r#"\s+(?:[`"\[]?\w+[`"\]]?\.)?[`"\[]?(\w+)[`"\]]?"#
            ))
            .expect("table pattern is valid")
        })
    };
}

static FROM_TABLE: Lazy<Regex> = table_regex!(r"\bFROM");
static INSERT_TABLE: Lazy<Regex> = table_regex!(r"\bINSERT\s+INTO");
static UPDATE_TABLE: Lazy<Regex> = table_regex!(r"\bUPDATE");
static DELETE_TABLE: Lazy<Regex> = table_regex!(r"\bDELETE\s+FROM");
static MERGE_TABLE: Lazy<Regex> = table_regex!(r"\bMERGE(?:\s+INTO)?");
static CREATE_TABLE: Lazy<Regex> =
    table_regex!(r"\bCREATE\s+(?:TEMP(?:ORARY)?\s+)?TABLE(?:\s+IF\s+NOT\s+EXISTS)?");
static DROP_TABLE: Lazy<Regex> = table_regex!(r"\bDROP\s+TABLE(?:\s+IF\s+EXISTS)?");
static ALTER_TABLE: Lazy<Regex> = table_regex!(r"\bALTER\s+TABLE");
static TRUNCATE_TABLE: Lazy<Regex> = table_regex!(r"\bTRUNCATE(?:\s+TABLE)?");
static EXEC_TARGET: Lazy<Regex> = table_regex!(r"\b(?:EXEC(?:UTE)?|CALL)");

const VERBS: &[(&str, StatementOperation)] = &[
    ("SELECT", StatementOperation::Select),
    ("WITH", StatementOperation::Select),
    ("INSERT", StatementOperation::Insert),
    ("UPDATE", StatementOperation::Update),
    ("DELETE", StatementOperation::Delete),
    ("MERGE", StatementOperation::Merge),
    ("CREATE", StatementOperation::Create),
    ("DROP", StatementOperation::Drop),
    ("ALTER", StatementOperation::Alter),
    ("TRUNCATE", StatementOperation::Truncate),
    ("BEGIN", StatementOperation::Begin),
    ("START", StatementOperation::Begin),
    ("COMMIT", StatementOperation::Commit),
    ("ROLLBACK", StatementOperation::Rollback),
    ("SET", StatementOperation::Set),
    ("EXEC", StatementOperation::Exec),
    ("CALL", StatementOperation::Exec),
];

/// Detect the operation from the first word of `sql`.
pub fn parse_operation(sql: &str) -> StatementOperation {
    let first_word = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();

    VERBS
        .iter()
        .find(|(verb, _)| {
            first_word.eq_ignore_ascii_case(verb)
                || (*verb == "EXEC" && first_word.eq_ignore_ascii_case("EXECUTE"))
        })
        .map_or(StatementOperation::Other, |(_, op)| *op)
}

/// Extract the primary table (or procedure) name, lowercased.
pub fn extract_table(sql: &str, operation: StatementOperation) -> Option<String> {
    operation
        .table_pattern()?
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Operation and target of a command, for span naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSummary {
    pub operation: StatementOperation,
    pub table: Option<String>,
}

impl StatementSummary {
    /// Summarize text command `sql`.
    pub fn parse(sql: &str) -> Self {
        let operation = parse_operation(sql);
        let table = extract_table(sql, operation);
        Self { operation, table }
    }

    /// Summarize a command, taking its [`CommandType`] into account: the text
    /// of a stored procedure command is the procedure name, and the text of a
    /// table-direct command is the table name.
    pub fn for_command(text: &str, command_type: CommandType) -> Self {
        let name = || {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
        };

        match command_type {
            CommandType::Text => Self::parse(text),
            CommandType::StoredProcedure => Self {
                operation: StatementOperation::Exec,
                table: name(),
            },
            CommandType::TableDirect => Self {
                operation: StatementOperation::Select,
                table: name(),
            },
        }
    }

    /// `"OPERATION table"`, or `"OPERATION"` when no table was found.
    pub fn span_name(&self) -> String {
        match &self.table {
            Some(table) => format!("{} {}", self.operation, table),
            None => self.operation.as_str().to_string(),
        }
    }
}
