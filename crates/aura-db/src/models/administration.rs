use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    EnrollmentStatus as "enrollment status" {
        Active => "active",
        Suspended => "suspended",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

text_enum! {
    StaffPosition as "staff position" {
        Teacher => "teacher",
        Coordinator => "coordinator",
        Principal => "principal",
        Secretary => "secretary",
        Assistant => "assistant",
    }
}

text_enum! {
    ChargeKind as "charge kind" {
        Tuition => "tuition",
        Fee => "fee",
        Uniform => "uniform",
        Material => "material",
        Other => "other",
    }
}

text_enum! {
    ChargeStatus as "charge status" {
        Pending => "pending",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
    }
}

text_enum! {
    DocumentKind as "document kind" {
        IdCard => "id_card",
        TaxId => "tax_id",
        BirthCertificate => "birth_certificate",
        ProofOfAddress => "proof_of_address",
        Other => "other",
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub number: String,
    pub academic_year: i32,
    pub status: EnrollmentStatus,
    pub enrolled_on: NaiveDate,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Employment record attached to a user. At most one per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub registration_number: String,
    pub position: StaffPosition,
    pub department: String,
    pub hired_on: NaiveDate,
    pub salary: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Charge {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub kind: ChargeKind,
    pub description: String,
    pub amount: Decimal,
    pub due_on: NaiveDate,
    pub status: ChargeStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A personal document. The file itself lives elsewhere; only its URL is kept.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub kind: DocumentKind,
    pub number: String,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
