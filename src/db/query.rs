/// A parameterized SQL statement.
///
/// The statement text is a `&'static str`, so it can only come from a literal
/// in the source. Values always travel as bind parameters.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    text: &'static str,
    params: Vec<SqlValue>,
}

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SqlQuery {
    pub fn new(text: &'static str) -> Self {
        Self {
            text,
            params: Vec::new(),
        }
    }

    /// Bind the next positional parameter (`$1`, `$2`, ...).
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&crate::id::AccountId> for SqlValue {
    fn from(value: &crate::id::AccountId) -> Self {
        Self::Text(value.as_str().to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
