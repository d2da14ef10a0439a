pub mod bookings;
pub mod email;
pub mod export;
pub mod otp;
pub mod staff;
pub mod sweep;
pub mod users;
