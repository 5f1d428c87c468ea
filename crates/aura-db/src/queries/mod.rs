//! Query functions, one module per table.
//!
//! Tenant tables take the caller's `school_id` on every call and never read
//! or write rows of another school. Library tables are scoped by author and
//! `public` instead.

/// Declares a list filter: the given optional equality fields plus the
/// `search`, `ordering`, `limit` and `offset` parameters every list accepts.
macro_rules! list_filter {
    (
        $(#[$meta:meta])*
        $name:ident { $($field:ident : $ty:ty),* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, ::serde::Deserialize)]
        pub struct $name {
            $(pub $field: Option<$ty>,)*
            pub search: Option<String>,
            pub ordering: Option<String>,
            pub limit: Option<i64>,
            pub offset: Option<i64>,
        }

        impl $name {
            pub fn page(&self) -> $crate::queries::listing::Page<'_> {
                $crate::queries::listing::Page {
                    search: self.search.as_deref(),
                    ordering: self.ordering.as_deref(),
                    limit: self.limit,
                    offset: self.offset,
                }
            }
        }
    };
}

pub mod listing;

pub mod audit_logs;
pub mod notifications;
pub mod schools;
pub mod users;

pub mod charges;
pub mod documents;
pub mod enrollments;
pub mod staff;

pub mod assessments;
pub mod assignments;
pub mod classes;
pub mod grades;
pub mod lesson_records;
pub mod plans;
pub mod students;
pub mod submissions;
pub mod units;

pub mod activity_templates;
pub mod collections;
pub mod lesson_templates;
pub mod materials;

pub mod ai_analyses;
pub mod ai_suggestions;
pub mod interaction_logs;
