use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::models::booking::format_cents;
use crate::models::{Booking, BookingStatus, PaymentStatus, Staff};

use super::EmailMessage;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Paragraphs are plain text; they are escaped here.
fn render(
    business: &str,
    to: &str,
    to_name: Option<&str>,
    subject: String,
    paragraphs: &[String],
) -> EmailMessage {
    let greeting = match to_name {
        Some(name) => format!("Hi {name},"),
        None => "Hello,".to_string(),
    };

    let mut html = format!(
        "<!DOCTYPE html><html><body style=\"font-family:Arial,sans-serif;color:#333\">\
         <div style=\"max-width:560px;margin:0 auto;padding:24px\">\
         <h2 style=\"color:#8b4513\">{}</h2><p>{}</p>",
        escape_html(business),
        escape_html(&greeting)
    );
    for p in paragraphs {
        html.push_str(&format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")));
    }
    html.push_str(&format!(
        "<p style=\"color:#888;font-size:12px\">{}</p></div></body></html>",
        escape_html(business)
    ));

    let mut text = format!("{greeting}\n\n");
    for p in paragraphs {
        text.push_str(p);
        text.push_str("\n\n");
    }
    text.push_str(business);

    EmailMessage {
        to: to.to_string(),
        to_name: to_name.map(str::to_string),
        subject,
        html,
        text,
    }
}

fn booking_summary(booking: &Booking) -> String {
    format!(
        "Event date: {}\nVenue: {}\nPackage: {} for {} guests\nTotal: {}",
        booking.event_date.format(DATE_FORMAT),
        booking.event_venue,
        booking.package_name,
        booking.guest_count,
        format_cents(booking.total_amount_cents),
    )
}

fn to_booking_customer(business: &str, booking: &Booking, subject: String, paragraphs: &[String]) -> EmailMessage {
    render(
        business,
        &booking.customer_email,
        Some(&booking.customer_name),
        subject,
        paragraphs,
    )
}

// ── Admin login ──

pub fn otp_code(business: &str, to: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    render(
        business,
        to,
        None,
        format!("{business} admin login code"),
        &[
            format!("Your login code is {code}."),
            format!("It is valid for {ttl_minutes} minutes and can be used once. If you did not request it, ignore this email."),
        ],
    )
}

// ── Bookings ──

pub fn booking_received(business: &str, booking: &Booking) -> EmailMessage {
    to_booking_customer(
        business,
        booking,
        format!("We received your booking request ({})", booking.event_date.format(DATE_FORMAT)),
        &[
            "Thank you for your booking request. Our team will review it and get back to you shortly.".to_string(),
            booking_summary(booking),
        ],
    )
}

pub fn booking_approved(business: &str, booking: &Booking) -> EmailMessage {
    let deadline = booking
        .payment_deadline
        .map(|d| format!("{} UTC", d.format(DATETIME_FORMAT)))
        .unwrap_or_else(|| "as soon as possible".to_string());

    to_booking_customer(
        business,
        booking,
        "Your booking has been approved".to_string(),
        &[
            "Good news! Your booking has been approved.".to_string(),
            booking_summary(booking),
            format!(
                "Please complete your payment of {} before {deadline}. Unpaid bookings are cancelled automatically once the deadline passes.",
                format_cents(booking.total_amount_cents)
            ),
        ],
    )
}

pub fn booking_rejected(business: &str, booking: &Booking) -> EmailMessage {
    let reason = booking.rejection_reason.as_deref().unwrap_or("No reason given");
    to_booking_customer(
        business,
        booking,
        "Update on your booking request".to_string(),
        &[
            "We are sorry, but we are unable to accept your booking request.".to_string(),
            format!("Reason: {reason}"),
            booking_summary(booking),
        ],
    )
}

pub fn booking_cancelled(business: &str, booking: &Booking) -> EmailMessage {
    let reason = booking.cancellation_reason.as_deref().unwrap_or("No reason given");
    to_booking_customer(
        business,
        booking,
        "Your booking has been cancelled".to_string(),
        &[
            "Your booking has been cancelled.".to_string(),
            format!("Reason: {reason}"),
            booking_summary(booking),
        ],
    )
}

pub fn booking_expired(business: &str, booking: &Booking) -> EmailMessage {
    to_booking_customer(
        business,
        booking,
        "Your booking has expired".to_string(),
        &[
            "We did not receive payment before the deadline, so your booking has been cancelled.".to_string(),
            booking_summary(booking),
            "You are welcome to submit a new booking request at any time.".to_string(),
        ],
    )
}

pub fn payment_received(business: &str, booking: &Booking) -> EmailMessage {
    let mut paragraphs = vec![
        format!(
            "We received your payment of {}. Your booking is confirmed.",
            format_cents(booking.total_amount_cents)
        ),
        booking_summary(booking),
    ];
    if let Some(reference) = &booking.payment_reference {
        paragraphs.push(format!("Payment reference: {reference}"));
    }
    to_booking_customer(business, booking, "Payment received".to_string(), &paragraphs)
}

pub fn booking_completed(business: &str, booking: &Booking) -> EmailMessage {
    to_booking_customer(
        business,
        booking,
        "Thank you for celebrating with us".to_string(),
        &[
            "Thank you for choosing us for your event. We hope you and your guests enjoyed it.".to_string(),
            booking_summary(booking),
        ],
    )
}

/// Picks the notification matching the booking's current state.
pub fn for_booking(business: &str, booking: &Booking) -> EmailMessage {
    match booking.status {
        BookingStatus::Pending => booking_received(business, booking),
        BookingStatus::Approved if booking.payment_status == PaymentStatus::Paid => {
            payment_received(business, booking)
        }
        BookingStatus::Approved => booking_approved(business, booking),
        BookingStatus::Rejected => booking_rejected(business, booking),
        BookingStatus::Cancelled
            if booking.cancellation_reason.as_deref()
                == Some(crate::models::booking::EXPIRED_REASON) =>
        {
            booking_expired(business, booking)
        }
        BookingStatus::Cancelled => booking_cancelled(business, booking),
        BookingStatus::Completed => booking_completed(business, booking),
    }
}

// ── Staff ──

fn to_staff(business: &str, staff: &Staff, subject: String, paragraphs: &[String]) -> EmailMessage {
    render(business, &staff.email, Some(&staff.full_name), subject, paragraphs)
}

pub fn staff_approved(business: &str, staff: &Staff) -> EmailMessage {
    to_staff(
        business,
        staff,
        "Your staff application has been approved".to_string(),
        &[format!(
            "Welcome to the team! You have been approved as {}.",
            staff.role.as_str()
        )],
    )
}

pub fn staff_rejected(business: &str, staff: &Staff) -> EmailMessage {
    let reason = staff.status_reason.as_deref().unwrap_or("No reason given");
    to_staff(
        business,
        staff,
        "Update on your staff application".to_string(),
        &[
            "Thank you for applying. Unfortunately we cannot offer you a position at this time.".to_string(),
            format!("Reason: {reason}"),
        ],
    )
}

pub fn staff_suspended(business: &str, staff: &Staff) -> EmailMessage {
    let reason = staff.status_reason.as_deref().unwrap_or("No reason given");
    to_staff(
        business,
        staff,
        "Your staff account has been suspended".to_string(),
        &[
            "Your staff account has been suspended.".to_string(),
            format!("Reason: {reason}"),
        ],
    )
}

pub fn staff_reinstated(business: &str, staff: &Staff) -> EmailMessage {
    to_staff(
        business,
        staff,
        "Your staff account has been reinstated".to_string(),
        &["Your staff account is active again.".to_string()],
    )
}

// ── Free-form ──

pub fn admin_message(business: &str, to: &str, subject: &str, message: &str) -> EmailMessage {
    let paragraphs: Vec<String> = message
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    render(business, to, None, subject.to_string(), &paragraphs)
}
