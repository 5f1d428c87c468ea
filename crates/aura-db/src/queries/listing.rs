//! Filtered, searchable, ordered and paginated `SELECT`s.
//!
//! Every list endpoint goes through [`Listing`]: equality filters are bound
//! parameters, search terms become `ILIKE` patterns, and ordering is only
//! accepted for whitelisted columns so no caller text reaches the SQL.

use anyhow::{Context, Result};
use sqlx::postgres::PgRow;
use sqlx::{Encode, FromRow, PgPool, Postgres, QueryBuilder, Type};
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;

/// Search, ordering and paging parameters shared by every list request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page<'a> {
    pub search: Option<&'a str>,
    pub ordering: Option<&'a str>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct Listing<'args> {
    builder: QueryBuilder<'args, Postgres>,
}

impl<'args> Listing<'args> {
    /// `SELECT * FROM <table>`. `table` must be a trusted identifier.
    pub fn from_table(table: &str) -> Self {
        Self::from_select(&format!("SELECT * FROM {table}"))
    }

    /// Start from an arbitrary trusted `SELECT ... FROM ...` without a
    /// `WHERE` clause.
    pub fn from_select(select: &str) -> Self {
        let mut builder = QueryBuilder::new(select);
        builder.push(" WHERE TRUE");
        Self { builder }
    }

    /// `AND <column> = $n` when `value` is present.
    pub fn eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres>,
    {
        if let Some(value) = value {
            self.builder.push(" AND ");
            self.builder.push(column);
            self.builder.push(" = ");
            self.builder.push_bind(value);
        }
        self
    }

    /// `AND (public OR author_id = $n)`: library rows visible to `author_id`.
    pub fn public_or_authored_by(&mut self, author_id: Uuid) -> &mut Self {
        self.builder.push(" AND (public OR author_id = ");
        self.builder.push_bind(author_id);
        self.builder.push(")");
        self
    }

    /// Case-insensitive substring match on any of `columns`. Blank terms are
    /// ignored.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        if columns.is_empty() {
            return self;
        }
        let pattern = format!("%{}%", escape_like(term));
        self.builder.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.builder.push(" OR ");
            }
            self.builder.push(*column);
            self.builder.push(" ILIKE ");
            self.builder.push_bind(pattern.clone());
        }
        self.builder.push(")");
        self
    }

    /// `ORDER BY` from `requested` (`col` or `-col`) when the column is in
    /// `allowed`, otherwise from `default` (same syntax). Ties break on `id`.
    pub fn order(&mut self, requested: Option<&str>, allowed: &[&str], default: &str) -> &mut Self {
        let (column, direction) = requested
            .map(|r| parse_ordering(r.trim()))
            .filter(|(column, _)| allowed.contains(column))
            .unwrap_or_else(|| parse_ordering(default));
        self.builder.push(" ORDER BY ");
        self.builder.push(column);
        self.builder.push(" ");
        self.builder.push(direction);
        self.builder.push(", id ");
        self.builder.push(direction);
        self
    }

    /// `LIMIT`/`OFFSET`, clamped to `1..=MAX_LIMIT` and `>= 0`.
    pub fn page(&mut self, limit: Option<i64>, offset: Option<i64>) -> &mut Self {
        let limit = clamp_limit(limit);
        let offset = offset.unwrap_or(0).max(0);
        self.builder.push(" LIMIT ");
        self.builder.push_bind(limit);
        self.builder.push(" OFFSET ");
        self.builder.push_bind(offset);
        self
    }

    /// Search, order and page in one call.
    pub fn finish(
        &mut self,
        page: Page<'_>,
        search_columns: &[&str],
        order_columns: &[&str],
        default_order: &str,
    ) -> &mut Self {
        self.search(search_columns, page.search)
            .order(page.ordering, order_columns, default_order)
            .page(page.limit, page.offset)
    }

    pub fn sql(&self) -> &str {
        self.builder.sql()
    }

    pub async fn fetch_all<T>(&mut self, pool: &PgPool) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let rows = self
            .builder
            .build_query_as::<T>()
            .fetch_all(pool)
            .await
            .context("failed to run list query")?;
        Ok(rows)
    }
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Escape `%`, `_` and `\` so the term matches literally inside `ILIKE`.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split `col` / `-col` into the column and its direction. Only one leading
/// `-` is consumed, so `--col` keeps a dash and fails the whitelist.
fn parse_ordering(ordering: &str) -> (&str, &'static str) {
    match ordering.strip_prefix('-') {
        Some(column) => (column, "DESC"),
        None => (ordering, "ASC"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_listing() {
        let listing = Listing::from_table("classes");
        assert_eq!(listing.sql(), "SELECT * FROM classes WHERE TRUE");
    }

    #[test]
    fn eq_skips_missing_values() {
        let mut listing = Listing::from_table("classes");
        listing
            .eq("school_id", Some(Uuid::nil()))
            .eq::<i32>("academic_year", None)
            .eq("active", Some(true));
        assert_eq!(
            listing.sql(),
            "SELECT * FROM classes WHERE TRUE AND school_id = $1 AND active = $2"
        );
    }

    #[test]
    fn search_binds_each_column() {
        let mut listing = Listing::from_table("users");
        listing.search(&["username", "first_name"], Some(" ana "));
        assert_eq!(
            listing.sql(),
            "SELECT * FROM users WHERE TRUE AND (username ILIKE $1 OR first_name ILIKE $2)"
        );
    }

    #[test]
    fn blank_search_is_ignored() {
        let mut listing = Listing::from_table("users");
        listing.search(&["username"], Some("   "));
        assert_eq!(listing.sql(), "SELECT * FROM users WHERE TRUE");
    }

    #[test]
    fn ordering_respects_whitelist() {
        let mut listing = Listing::from_table("users");
        listing.order(Some("-username"), &["username", "created_at"], "created_at");
        assert!(listing.sql().ends_with(" ORDER BY username DESC, id DESC"));

        let mut listing = Listing::from_table("users");
        listing.order(Some("password; DROP TABLE users"), &["username"], "-created_at");
        assert!(listing.sql().ends_with(" ORDER BY created_at DESC, id DESC"));
    }

    #[test]
    fn ordering_with_repeated_dashes_falls_back_to_default() {
        for requested in ["--title", "---title"] {
            let mut listing = Listing::from_table("lesson_templates");
            listing.order(Some(requested), &["created_at", "title"], "-created_at");
            assert!(
                listing.sql().ends_with(" ORDER BY created_at DESC, id DESC"),
                "{requested}: {}",
                listing.sql()
            );
        }
    }

    #[test]
    fn page_appends_limit_and_offset() {
        let mut listing = Listing::from_table("users");
        listing.page(Some(10), Some(20));
        assert_eq!(
            listing.sql(),
            "SELECT * FROM users WHERE TRUE LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIMIT);
        assert_eq!(clamp_limit(Some(42)), 42);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn library_visibility_clause() {
        let mut listing = Listing::from_table("lesson_templates");
        listing.public_or_authored_by(Uuid::nil()).eq("public", Some(true));
        assert_eq!(
            listing.sql(),
            "SELECT * FROM lesson_templates WHERE TRUE AND (public OR author_id = $1) \
             AND public = $2"
        );
    }
}
