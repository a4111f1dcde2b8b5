//! Parameterized statement text

use std::fmt::Write as _;

use crate::{Dialect, QuoteEscape, Result, TabulaError, Value};

/// SQL text with `?` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Caller-written SQL whose placeholders bind to `params` in order.
    pub fn with_params(sql: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        Self {
            sql: sql.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Append literal SQL text.
    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `?` placeholder bound to `value`.
    pub fn push_param(&mut self, value: impl Into<Value>) -> &mut Self {
        self.sql.push('?');
        self.params.push(value.into());
        self
    }

    /// Append caller-written SQL that carries its own placeholders, with their values.
    pub fn push_fragment(&mut self, sql: &str, params: impl IntoIterator<Item = Value>) -> &mut Self {
        self.sql.push_str(sql);
        self.params.extend(params);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Check that every placeholder has exactly one scalar value.
    ///
    /// Placeholders are counted the way `dialect` tokenizes: quoted literals,
    /// quoted identifiers and comments never hold one.
    pub fn validate(&self, dialect: Dialect) -> Result<()> {
        let placeholders = count_placeholders(&self.sql, dialect);
        if placeholders != self.params.len() {
            return Err(TabulaError::InvalidArgument(format!(
                "statement has {} placeholders but {} arguments: {}",
                placeholders,
                self.params.len(),
                self.sql
            )));
        }
        self.validate_args()
    }

    /// Reject argument values that cannot bind to a single cell.
    ///
    /// The only check applied to caller-written SQL; the driver reports
    /// placeholder mismatches there.
    pub fn validate_args(&self) -> Result<()> {
        check_scalar_args(&self.params)
    }

    /// Render the statement with every placeholder replaced by its literal.
    ///
    /// Used for logging and error messages; execution always binds.
    pub fn to_literal_sql(&self, dialect: Dialect) -> String {
        let mut out = String::with_capacity(self.sql.len() + self.params.len() * 8);
        let mut params = self.params.iter();
        scan(&self.sql, dialect, |c, is_placeholder| {
            if is_placeholder {
                match params.next().and_then(|p| p.to_sql_literal(dialect)) {
                    Some(lit) => out.push_str(&lit),
                    None => out.push('?'),
                }
            } else {
                out.push(c);
            }
        });
        out
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)?;
        if !self.params.is_empty() {
            f.write_str(" -- [")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", p)?;
            }
            f.write_char(']')?;
        }
        Ok(())
    }
}

pub(crate) fn check_scalar_args(params: &[Value]) -> Result<()> {
    match params.iter().position(Value::is_array) {
        Some(pos) => Err(TabulaError::InvalidArgument(format!(
            "argument {} is an array; wrap it in a string to store it",
            pos + 1
        ))),
        None => Ok(()),
    }
}

/// Count `?` placeholders outside literals, quoted identifiers and comments.
pub fn count_placeholders(sql: &str, dialect: Dialect) -> usize {
    let mut count = 0;
    scan(sql, dialect, |_, is_placeholder| {
        if is_placeholder {
            count += 1;
        }
    });
    count
}

#[derive(Clone, Copy)]
enum Lexeme {
    Code,
    Quoted { quote: char, backslash: bool },
    LineComment,
    BlockComment,
}

/// Walk `sql` char by char, flagging the ones that are bare `?` placeholders.
fn scan(sql: &str, dialect: Dialect, mut visit: impl FnMut(char, bool)) {
    let info = dialect.info();
    let hash_comments = matches!(dialect, Dialect::MySql | Dialect::MariaDb);
    let mut state = Lexeme::Code;
    let mut escaped = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Lexeme::Code => match c {
                '\'' | '"' | '`' => {
                    // Identifiers never take backslash escapes
                    let backslash = info.string_escape == QuoteEscape::Backslash
                        && c != info.identifier_quote
                        && c != '`';
                    state = Lexeme::Quoted { quote: c, backslash };
                    visit(c, false);
                }
                '-' if chars.peek() == Some(&'-') => {
                    state = Lexeme::LineComment;
                    visit(c, false);
                }
                '#' if hash_comments => {
                    state = Lexeme::LineComment;
                    visit(c, false);
                }
                '/' if chars.peek() == Some(&'*') => {
                    visit(c, false);
                    if let Some(star) = chars.next() {
                        visit(star, false);
                    }
                    state = Lexeme::BlockComment;
                }
                _ => visit(c, c == '?'),
            },
            Lexeme::Quoted { quote, backslash } => {
                if escaped {
                    escaped = false;
                } else if backslash && c == '\\' {
                    escaped = true;
                } else if c == quote {
                    // A doubled quote closes and reopens, which reads the same
                    state = Lexeme::Code;
                }
                visit(c, false);
            }
            Lexeme::LineComment => {
                if c == '\n' {
                    state = Lexeme::Code;
                }
                visit(c, false);
            }
            Lexeme::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    visit(c, false);
                    if let Some(slash) = chars.next() {
                        visit(slash, false);
                    }
                    state = Lexeme::Code;
                } else {
                    visit(c, false);
                }
            }
        }
    }
}
