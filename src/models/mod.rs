pub mod booking;
pub mod staff;
pub mod user;

pub use booking::{Booking, BookingStatus, NewBooking, PaymentStatus};
pub use staff::{Staff, StaffRole, StaffStatus};
pub use user::{User, UserStatus};
