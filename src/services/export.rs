use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::models::booking::format_cents;
use crate::models::{Booking, Staff};

/// Cells starting with these are evaluated as formulas by spreadsheet apps.
const FORMULA_PREFIXES: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

fn field(value: &str) -> String {
    let value = if value.starts_with(FORMULA_PREFIXES) {
        format!("'{value}")
    } else {
        value.to_string()
    };
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

fn push_row(out: &mut String, values: &[String]) {
    let row: Vec<String> = values.iter().map(|v| field(v)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

pub fn bookings_csv(bookings: &[Booking]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &[
            "id", "customer_name", "customer_email", "customer_phone", "event_date", "event_venue",
            "package_name", "guest_count", "total_amount", "status", "payment_status",
            "payment_deadline", "paid_at", "payment_reference", "reason", "created_at",
        ]
        .map(String::from),
    );

    for b in bookings {
        let reason = b
            .cancellation_reason
            .as_deref()
            .or(b.rejection_reason.as_deref())
            .unwrap_or("");
        push_row(
            &mut out,
            &[
                b.id.clone(),
                b.customer_name.clone(),
                b.customer_email.clone(),
                b.customer_phone.clone(),
                b.event_date.format(DATE_FORMAT).to_string(),
                b.event_venue.clone(),
                b.package_name.clone(),
                b.guest_count.to_string(),
                format_cents(b.total_amount_cents),
                b.status.as_str().to_string(),
                b.payment_status.as_str().to_string(),
                b.payment_deadline
                    .map(|d| d.format(DATETIME_FORMAT).to_string())
                    .unwrap_or_default(),
                b.paid_at
                    .map(|d| d.format(DATETIME_FORMAT).to_string())
                    .unwrap_or_default(),
                b.payment_reference.clone().unwrap_or_default(),
                reason.to_string(),
                b.created_at.format(DATETIME_FORMAT).to_string(),
            ],
        );
    }
    out
}

pub fn staff_csv(staff: &[Staff]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &["id", "full_name", "email", "phone", "role", "status", "status_reason", "created_at"]
            .map(String::from),
    );

    for s in staff {
        push_row(
            &mut out,
            &[
                s.id.clone(),
                s.full_name.clone(),
                s.email.clone(),
                s.phone.clone().unwrap_or_default(),
                s.role.as_str().to_string(),
                s.status.as_str().to_string(),
                s.status_reason.clone().unwrap_or_default(),
                s.created_at.format(DATETIME_FORMAT).to_string(),
            ],
        );
    }
    out
}
