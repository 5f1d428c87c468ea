//! School administration: enrollments, staff, charges and documents.

use axum::Router;

use super::AppState;

tenant_crud! {
    pub mod enrollments at "/api/enrollments" => Enrollment as "enrollment" {
        new: NewEnrollment,
        changes: EnrollmentChanges,
        filter: EnrollmentFilter,
        insert: insert_enrollment,
        get: get_enrollment,
        list: list_enrollments,
        update: update_enrollment,
        delete: delete_enrollment,
    }
}

tenant_crud! {
    pub mod staff at "/api/staff" => Staff as "staff" {
        new: NewStaff,
        changes: StaffChanges,
        filter: StaffFilter,
        insert: insert_staff,
        get: get_staff,
        list: list_staff,
        update: update_staff,
        delete: delete_staff,
    }
}

tenant_crud! {
    pub mod charges at "/api/charges" => Charge as "charge" {
        new: NewCharge,
        changes: ChargeChanges,
        filter: ChargeFilter,
        insert: insert_charge,
        get: get_charge,
        list: list_charges,
        update: update_charge,
        delete: delete_charge,
    }
}

tenant_crud! {
    pub mod documents at "/api/documents" => Document as "document" {
        new: NewDocument,
        changes: DocumentChanges,
        filter: DocumentFilter,
        insert: insert_document,
        get: get_document,
        list: list_documents,
        update: update_document,
        delete: delete_document,
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(enrollments::routes())
        .merge(staff::routes())
        .merge(charges::routes())
        .merge(documents::routes())
}
