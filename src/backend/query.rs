/// A single row predicate in the backend's filter language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    /// Case-insensitive substring match.
    ILike(String, String),
    In(String, Vec<String>),
    IsNull(String),
    /// Matches when any nested filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Filter::Eq(column.to_string(), value.to_string())
    }

    pub fn ilike(column: &str, needle: impl Into<String>) -> Self {
        Filter::ILike(column.to_string(), needle.into())
    }

    fn operator(&self) -> String {
        match self {
            Filter::Eq(_, value) => format!("eq.{value}"),
            Filter::ILike(_, needle) => format!("ilike.*{needle}*"),
            Filter::In(_, values) => {
                let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
                format!("in.({})", items.join(","))
            }
            Filter::IsNull(_) => "is.null".to_string(),
            Filter::Or(filters) => {
                let items: Vec<String> = filters.iter().map(Filter::nested).collect();
                format!("({})", items.join(","))
            }
        }
    }

    /// Rendering used inside a logical group, where values must be quoted
    /// when they contain reserved characters.
    fn nested(&self) -> String {
        match self {
            Filter::Eq(column, value) => format!("{column}.eq.{}", quote(value)),
            Filter::ILike(column, needle) => format!("{column}.ilike.{}", quote(&format!("*{needle}*"))),
            Filter::In(column, _) | Filter::IsNull(column) => format!("{column}.{}", self.operator()),
            Filter::Or(_) => format!("or{}", self.operator()),
        }
    }

    fn param(&self) -> (String, String) {
        match self {
            Filter::Eq(column, _)
            | Filter::ILike(column, _)
            | Filter::In(column, _)
            | Filter::IsNull(column) => (column.clone(), self.operator()),
            Filter::Or(_) => ("or".to_string(), self.operator()),
        }
    }
}

fn quote(value: &str) -> String {
    let reserved = value
        .chars()
        .any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\') || c.is_whitespace());
    if !reserved {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Where null values land. Without it the backend puts nulls last when
/// ascending and first when descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
    pub nulls: Option<Nulls>,
}

impl Order {
    /// True when null values sort before non-null ones.
    pub fn nulls_first(&self) -> bool {
        match self.nulls {
            Some(Nulls::First) => true,
            Some(Nulls::Last) => false,
            None => self.direction == Direction::Desc,
        }
    }
}

/// A read, update or delete target: one table plus filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn ilike(self, column: &str, needle: impl Into<String>) -> Self {
        self.filter(Filter::ilike(column, needle))
    }

    pub fn is_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filter(Filter::In(column.to_string(), values))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(Filter::IsNull(column.to_string()))
    }

    pub fn any_of(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::Or(filters))
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
            nulls: None,
        });
        self
    }

    /// Moves rows with a null sort column to the end. No effect without an order.
    pub fn nulls_last(mut self) -> Self {
        if let Some(order) = &mut self.order {
            order.nulls = Some(Nulls::Last);
        }
        self
    }

    pub fn newest_first(self) -> Self {
        self.order_by("created_at", Direction::Desc)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs in the table REST dialect.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(self.filters.iter().map(Filter::param));
        if let Some(order) = &self.order {
            let direction = match order.direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            let nulls = match order.nulls {
                Some(Nulls::First) => ".nullsfirst",
                Some(Nulls::Last) => ".nullslast",
                None => "",
            };
            params.push(("order".to_string(), format!("{}.{direction}{nulls}", order.column)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}
