use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const EXPIRED_REASON: &str = "Payment deadline expired";
pub const MAX_GUEST_COUNT: i64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub event_date: NaiveDate,
    pub event_venue: String,
    pub package_name: String,
    pub guest_count: i64,
    pub price_per_guest_cents: i64,
    pub additional_fees_cents: i64,
    pub total_amount_cents: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_deadline: Option<NaiveDateTime>,
    pub paid_at: Option<NaiveDateTime>,
    pub payment_reference: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn is_awaiting_payment(&self) -> bool {
        self.status == BookingStatus::Approved && self.payment_status == PaymentStatus::Unpaid
    }

    pub fn is_past_deadline(&self, now: NaiveDateTime) -> bool {
        self.payment_deadline.map(|d| d < now).unwrap_or(false)
    }
}

/// Customer-submitted fields for a new booking.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub event_date: NaiveDate,
    pub event_venue: String,
    pub package_name: String,
    pub guest_count: i64,
    pub price_per_guest_cents: i64,
    #[serde(default)]
    pub additional_fees_cents: i64,
    pub notes: Option<String>,
}

impl NewBooking {
    /// `None` when the total does not fit in an `i64`.
    pub fn total_amount_cents(&self) -> Option<i64> {
        self.price_per_guest_cents
            .checked_mul(self.guest_count)?
            .checked_add(self.additional_fees_cents)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "approved" => Some(BookingStatus::Approved),
            "rejected" => Some(BookingStatus::Rejected),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Approved)
                | (BookingStatus::Pending, BookingStatus::Rejected)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Approved, BookingStatus::Cancelled)
                | (BookingStatus::Approved, BookingStatus::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// Formats cents as a plain decimal amount, e.g. `125050` -> `1250.50`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("expired"), None);
    }

    #[test]
    fn test_allowed_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_states_go_nowhere() {
        for from in [BookingStatus::Rejected, BookingStatus::Cancelled, BookingStatus::Completed] {
            assert!(from.is_terminal());
            for to in BookingStatus::ALL {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_total_amount() {
        let new = NewBooking {
            customer_name: "Ana".to_string(),
            customer_email: "ana@example.com".to_string(),
            customer_phone: "0917".to_string(),
            event_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            event_venue: "Hall".to_string(),
            package_name: "Silver".to_string(),
            guest_count: 50,
            price_per_guest_cents: 45_000,
            additional_fees_cents: 150_000,
            notes: None,
        };
        assert_eq!(new.total_amount_cents(), Some(2_400_000));

        let huge = NewBooking {
            guest_count: 10_000_000_000,
            price_per_guest_cents: 10_000_000_000,
            ..new
        };
        assert_eq!(huge.total_amount_cents(), None);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(125_050), "1250.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-250), "-2.50");
    }
}
