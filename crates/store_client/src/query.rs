//! Record query builder.
//!
//! Renders PostgREST query parameters: `col=eq.v`, `col=in.("a","b")`,
//! `or=(a.eq."x",b.ilike."y")`, `order=col.desc`, `limit=n`. List and
//! logic-tree values are always double-quoted so commas, dots and
//! parentheses in ids or emails survive.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    /// Case-insensitive pattern match (`*` is the wildcard).
    ILike(String, String),
    In(String, Vec<String>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn ilike(column: &str, pattern: impl Into<String>) -> Self {
        Filter::ILike(column.to_string(), pattern.into())
    }

    /// Case-insensitive match on the literal `value`: LIKE wildcards in it
    /// are escaped so `john_doe@x` does not also match `johnXdoe@x`.
    pub fn ilike_exact(column: &str, value: &str) -> Self {
        Filter::ILike(column.to_string(), escape_like(value))
    }

    pub fn is_in<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Filter::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    /// Top-level query parameter for this filter.
    fn param(&self) -> (String, String) {
        match self {
            Filter::Eq(col, v) => (col.clone(), format!("eq.{v}")),
            Filter::ILike(col, v) => (col.clone(), format!("ilike.{v}")),
            Filter::In(col, vs) => (col.clone(), format!("in.{}", quoted_list(vs))),
            Filter::Or(parts) => ("or".to_string(), logic_tree(parts)),
        }
    }

    /// Form used inside an `or=(...)` tree.
    fn nested(&self) -> String {
        match self {
            Filter::Eq(col, v) => format!("{col}.eq.{}", quote(v)),
            Filter::ILike(col, v) => format!("{col}.ilike.{}", quote(v)),
            Filter::In(col, vs) => format!("{col}.in.{}", quoted_list(vs)),
            Filter::Or(parts) => format!("or{}", logic_tree(parts)),
        }
    }
}

/// Backslash-escape backslashes, `%` and `_` for a LIKE pattern. PostgREST's `*`
/// alias for `%` cannot be escaped and is left as is.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn quoted_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("({})", items.join(","))
}

fn logic_tree(parts: &[Filter]) -> String {
    let items: Vec<String> = parts.iter().map(Filter::nested).collect();
    format!("({})", items.join(","))
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<Filter>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<String>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn is_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.filter(Filter::is_in(column, values))
    }

    pub fn or(self, parts: Vec<Filter>) -> Self {
        self.filter(Filter::Or(parts))
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Query-string pairs in a stable order: select, filters, order, limit.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().map(Filter::param));
        if let Some((col, asc)) = &self.order {
            let dir = if *asc { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{col}.{dir}")));
        }
        if let Some(n) = self.limit {
            params.push(("limit".to_string(), n.to_string()));
        }
        params
    }
}
