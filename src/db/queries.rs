use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use super::{DATETIME_FORMAT, DATE_FORMAT};
use crate::models::booking::EXPIRED_REASON;
use crate::models::{
    Booking, BookingStatus, PaymentStatus, Staff, StaffRole, StaffStatus, User, UserStatus,
};

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn parse_dt(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .with_context(|| format!("invalid stored datetime: {s}"))
}

fn parse_opt_dt(s: Option<String>) -> anyhow::Result<Option<NaiveDateTime>> {
    s.as_deref().map(parse_dt).transpose()
}

fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim().to_lowercase())
}

fn collect<T>(
    rows: impl Iterator<Item = rusqlite::Result<anyhow::Result<T>>>,
) -> anyhow::Result<Vec<T>> {
    let mut out = vec![];
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, user_id, customer_name, customer_email, customer_phone, event_date, \
     event_venue, package_name, guest_count, price_per_guest_cents, additional_fees_cents, \
     total_amount_cents, status, payment_status, payment_deadline, paid_at, payment_reference, \
     rejection_reason, cancellation_reason, notes, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
        ),
        params![
            booking.id,
            booking.user_id,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.event_date.format(DATE_FORMAT).to_string(),
            booking.event_venue,
            booking.package_name,
            booking.guest_count,
            booking.price_per_guest_cents,
            booking.additional_fees_cents,
            booking.total_amount_cents,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.payment_deadline.as_ref().map(fmt_dt),
            booking.paid_at.as_ref().map(fmt_dt),
            booking.payment_reference,
            booking.rejection_reason,
            booking.cancellation_reason,
            booking.notes,
            fmt_dt(&booking.created_at),
            fmt_dt(&booking.updated_at),
        ],
    )
    .context("failed to insert booking")?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE 1 = 1");
    let mut values: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.as_str()));
    }
    if let Some(payment_status) = filter.payment_status {
        sql.push_str(" AND payment_status = ?");
        values.push(Box::new(payment_status.as_str()));
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        sql.push_str(
            " AND (lower(customer_name) LIKE ? OR lower(customer_email) LIKE ? OR lower(event_venue) LIKE ?)",
        );
        let pattern = like_pattern(search);
        values.push(Box::new(pattern.clone()));
        values.push(Box::new(pattern.clone()));
        values.push(Box::new(pattern));
    }

    sql.push_str(" ORDER BY event_date DESC, created_at DESC LIMIT ? OFFSET ?");
    values.push(Box::new(filter.limit.unwrap_or(100)));
    values.push(Box::new(filter.offset.unwrap_or(0)));

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(refs.as_slice(), |row| Ok(parse_booking_row(row)))?;
    collect(rows)
}

pub fn approve_booking(
    conn: &Connection,
    id: &str,
    payment_deadline: &NaiveDateTime,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'approved', payment_deadline = ?1, updated_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![fmt_dt(payment_deadline), fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

pub fn reject_booking(
    conn: &Connection,
    id: &str,
    reason: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'rejected', rejection_reason = ?1, updated_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![reason, fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

pub fn cancel_booking(
    conn: &Connection,
    id: &str,
    reason: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'cancelled', cancellation_reason = ?1, updated_at = ?2
         WHERE id = ?3 AND status IN ('pending', 'approved')",
        params![reason, fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

pub fn record_payment(
    conn: &Connection,
    id: &str,
    reference: Option<&str>,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let now = fmt_dt(now);
    let count = conn.execute(
        "UPDATE bookings SET payment_status = 'paid', paid_at = ?1, payment_reference = ?2, updated_at = ?1
         WHERE id = ?3 AND status = 'approved' AND payment_status = 'unpaid' AND payment_deadline >= ?1",
        params![now, reference, id],
    )?;
    Ok(count > 0)
}

pub fn complete_booking(conn: &Connection, id: &str, now: &NaiveDateTime) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'completed', updated_at = ?1
         WHERE id = ?2 AND status = 'approved' AND payment_status = 'paid'",
        params![fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

pub fn list_overdue_bookings(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE status = 'approved' AND payment_status = 'unpaid'
           AND payment_deadline IS NOT NULL AND payment_deadline < ?1
         ORDER BY payment_deadline ASC"
    ))?;
    let rows = stmt.query_map(params![fmt_dt(now)], |row| Ok(parse_booking_row(row)))?;
    collect(rows)
}

pub fn expire_booking(conn: &Connection, id: &str, now: &NaiveDateTime) -> anyhow::Result<bool> {
    let now = fmt_dt(now);
    let count = conn.execute(
        "UPDATE bookings SET status = 'cancelled', cancellation_reason = ?1, updated_at = ?2
         WHERE id = ?3 AND status = 'approved' AND payment_status = 'unpaid' AND payment_deadline < ?2",
        params![EXPIRED_REASON, now, id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let event_date_str: String = row.get(5)?;
    let status_str: String = row.get(12)?;
    let payment_status_str: String = row.get(13)?;
    let created_at_str: String = row.get(20)?;
    let updated_at_str: String = row.get(21)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        customer_phone: row.get(4)?,
        event_date: NaiveDate::parse_from_str(&event_date_str, DATE_FORMAT)
            .with_context(|| format!("invalid stored event date: {event_date_str}"))?,
        event_venue: row.get(6)?,
        package_name: row.get(7)?,
        guest_count: row.get(8)?,
        price_per_guest_cents: row.get(9)?,
        additional_fees_cents: row.get(10)?,
        total_amount_cents: row.get(11)?,
        status: BookingStatus::parse(&status_str)
            .with_context(|| format!("invalid stored booking status: {status_str}"))?,
        payment_status: PaymentStatus::parse(&payment_status_str)
            .with_context(|| format!("invalid stored payment status: {payment_status_str}"))?,
        payment_deadline: parse_opt_dt(row.get(14)?)?,
        paid_at: parse_opt_dt(row.get(15)?)?,
        payment_reference: row.get(16)?,
        rejection_reason: row.get(17)?,
        cancellation_reason: row.get(18)?,
        notes: row.get(19)?,
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

// ── Users ──

const USER_COLUMNS: &str =
    "id, full_name, email, phone, status, blocked_reason, created_at, updated_at";

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            user.id,
            user.full_name,
            user.email,
            user.phone,
            user.status.as_str(),
            user.blocked_reason,
            fmt_dt(&user.created_at),
            fmt_dt(&user.updated_at),
        ],
    )
    .context("failed to insert user")?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        |row| Ok(parse_user_row(row)),
    )
    .optional()?
    .transpose()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        |row| Ok(parse_user_row(row)),
    )
    .optional()?
    .transpose()
}

pub fn list_users(
    conn: &Connection,
    status: Option<UserStatus>,
    search: Option<&str>,
) -> anyhow::Result<Vec<User>> {
    let mut sql = format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1");
    let mut values: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.as_str()));
    }
    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        sql.push_str(" AND (lower(full_name) LIKE ? OR email LIKE ?)");
        let pattern = like_pattern(search);
        values.push(Box::new(pattern.clone()));
        values.push(Box::new(pattern));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(refs.as_slice(), |row| Ok(parse_user_row(row)))?;
    collect(rows)
}

/// Moves a user between statuses. Returns false if the user was not in `from`.
pub fn set_user_status(
    conn: &Connection,
    id: &str,
    from: UserStatus,
    to: UserStatus,
    reason: Option<&str>,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET status = ?1, blocked_reason = ?2, updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![to.as_str(), reason, fmt_dt(now), id, from.as_str()],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let status_str: String = row.get(4)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    Ok(User {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        status: UserStatus::parse(&status_str)
            .with_context(|| format!("invalid stored user status: {status_str}"))?,
        blocked_reason: row.get(5)?,
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

// ── Staff ──

const STAFF_COLUMNS: &str =
    "id, full_name, email, phone, role, status, status_reason, created_at, updated_at";

pub fn create_staff(conn: &Connection, staff: &Staff) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO staff ({STAFF_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            staff.id,
            staff.full_name,
            staff.email,
            staff.phone,
            staff.role.as_str(),
            staff.status.as_str(),
            staff.status_reason,
            fmt_dt(&staff.created_at),
            fmt_dt(&staff.updated_at),
        ],
    )
    .context("failed to insert staff")?;
    Ok(())
}

pub fn get_staff(conn: &Connection, id: &str) -> anyhow::Result<Option<Staff>> {
    conn.query_row(
        &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
        params![id],
        |row| Ok(parse_staff_row(row)),
    )
    .optional()?
    .transpose()
}

pub fn get_staff_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Staff>> {
    conn.query_row(
        &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE email = ?1"),
        params![email],
        |row| Ok(parse_staff_row(row)),
    )
    .optional()?
    .transpose()
}

pub fn list_staff(
    conn: &Connection,
    status: Option<StaffStatus>,
    role: Option<StaffRole>,
) -> anyhow::Result<Vec<Staff>> {
    let mut sql = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE 1 = 1");
    let mut values: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.as_str()));
    }
    if let Some(role) = role {
        sql.push_str(" AND role = ?");
        values.push(Box::new(role.as_str()));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(refs.as_slice(), |row| Ok(parse_staff_row(row)))?;
    collect(rows)
}

pub fn set_staff_status(
    conn: &Connection,
    id: &str,
    from: StaffStatus,
    to: StaffStatus,
    reason: Option<&str>,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE staff SET status = ?1, status_reason = ?2, updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![to.as_str(), reason, fmt_dt(now), id, from.as_str()],
    )?;
    Ok(count > 0)
}

pub fn update_staff_role(
    conn: &Connection,
    id: &str,
    role: StaffRole,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE staff SET role = ?1, updated_at = ?2 WHERE id = ?3 AND status != 'rejected'",
        params![role.as_str(), fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

fn parse_staff_row(row: &rusqlite::Row) -> anyhow::Result<Staff> {
    let role_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;

    Ok(Staff {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role: StaffRole::parse(&role_str)
            .with_context(|| format!("invalid stored staff role: {role_str}"))?,
        status: StaffStatus::parse(&status_str)
            .with_context(|| format!("invalid stored staff status: {status_str}"))?,
        status_reason: row.get(6)?,
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

// ── Dashboard ──

#[derive(Debug, Default, serde::Serialize)]
pub struct DashboardStats {
    pub pending_bookings: i64,
    pub approved_bookings: i64,
    pub rejected_bookings: i64,
    pub cancelled_bookings: i64,
    pub completed_bookings: i64,
    pub awaiting_payment: i64,
    pub paid_revenue_cents: i64,
    pub pending_staff: i64,
    pub blocked_users: i64,
}

pub fn get_dashboard_stats(conn: &Connection) -> anyhow::Result<DashboardStats> {
    let mut stats = DashboardStats::default();

    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (status, count) = row?;
        match BookingStatus::parse(&status) {
            Some(BookingStatus::Pending) => stats.pending_bookings = count,
            Some(BookingStatus::Approved) => stats.approved_bookings = count,
            Some(BookingStatus::Rejected) => stats.rejected_bookings = count,
            Some(BookingStatus::Cancelled) => stats.cancelled_bookings = count,
            Some(BookingStatus::Completed) => stats.completed_bookings = count,
            None => tracing::warn!(status = %status, "unknown booking status in stats"),
        }
    }

    stats.awaiting_payment = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE status = 'approved' AND payment_status = 'unpaid'",
        [],
        |row| row.get(0),
    )?;

    stats.paid_revenue_cents = conn.query_row(
        "SELECT COALESCE(SUM(total_amount_cents), 0) FROM bookings
         WHERE payment_status = 'paid' AND status IN ('approved', 'completed')",
        [],
        |row| row.get(0),
    )?;

    stats.pending_staff = conn.query_row(
        "SELECT COUNT(*) FROM staff WHERE status = 'pending'",
        [],
        |row| row.get(0),
    )?;

    stats.blocked_users = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE status = 'blocked'",
        [],
        |row| row.get(0),
    )?;

    Ok(stats)
}
