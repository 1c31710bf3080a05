mod email;

pub use email::ReservationMailer;
