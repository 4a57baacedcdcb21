//! Query-string builder for the backend's table REST surface.
//!
//! Filters use the `column=operator.value` convention, e.g.
//! `status=eq.completed` or `title=ilike.*resume*`.

use std::fmt::Display;

/// Sort direction for [`Query::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A table query: column selection, filters, ordering and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Query {
    /// An empty query (all columns, no filters).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose columns, including embedded relations (`*,categories(name,slug)`).
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// `column = value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("eq.{value}"))
    }

    /// `column <> value`.
    #[must_use]
    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("neq.{value}"))
    }

    /// Case-insensitive substring match. Wildcard characters in `term` are
    /// stripped so user input cannot widen the pattern.
    #[must_use]
    pub fn search(self, column: &str, term: &str) -> Self {
        let cleaned: String = term
            .chars()
            .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')'))
            .collect();
        self.filter(column, format!("ilike.*{}*", cleaned.trim()))
    }

    /// `column IN (values...)`.
    #[must_use]
    pub fn is_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let list = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, format!("in.({list})"))
    }

    /// Add an ordering term. Multiple calls sort by each term in turn.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(format!("{column}.{}", direction.as_str()));
        self
    }

    /// Maximum number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Page through results, `page` starting at 1.
    #[must_use]
    pub const fn page(self, page: u32, per_page: u32) -> Self {
        let page = if page == 0 { 1 } else { page };
        self.limit(per_page).offset((page - 1).saturating_mul(per_page))
    }

    /// Whether the query carries any row filter. Deletes and updates refuse
    /// to run without one.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// The query as ordered key/value pairs, ready to append to a URL.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 4);
        if let Some(select) = &self.select {
            pairs.push(("select".to_string(), select.clone()));
        }
        pairs.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            pairs.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }

    /// Unencoded `key=value&...` form, used for cache keys and logging.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn filter(mut self, column: &str, expr: String) -> Self {
        self.filters.push((column.to_string(), expr));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        assert_eq!(Query::new().to_query_string(), "");
        assert!(!Query::new().has_filters());
    }

    #[test]
    fn test_full_query_order() {
        let query = Query::new()
            .select("*,categories(name,slug)")
            .eq("is_active", true)
            .order("is_featured", Direction::Desc)
            .order("created_at", Direction::Desc)
            .limit(12)
            .offset(24);

        assert_eq!(
            query.to_query_string(),
            "select=*,categories(name,slug)&is_active=eq.true&order=is_featured.desc,created_at.desc&limit=12&offset=24"
        );
    }

    #[test]
    fn test_search_strips_wildcards() {
        let query = Query::new().search("title", " *resume%, (cv) ");
        assert_eq!(query.to_query_string(), "title=ilike.*resume cv*");
    }

    #[test]
    fn test_is_in() {
        let query = Query::new().is_in("id", ["a", "b", "c"]);
        assert_eq!(query.to_query_string(), "id=in.(a,b,c)");
    }

    #[test]
    fn test_page() {
        assert_eq!(
            Query::new().page(3, 10).to_query_string(),
            "limit=10&offset=20"
        );
        assert_eq!(
            Query::new().page(0, 10).to_query_string(),
            "limit=10&offset=0"
        );
    }

    #[test]
    fn test_has_filters() {
        assert!(Query::new().neq("status", "archived").has_filters());
        assert!(!Query::new().limit(1).has_filters());
    }
}
