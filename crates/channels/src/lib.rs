//! Outbound SMS providers.
//!
//! The dispatch engine only sees `SmsSender`; which provider sits behind it
//! (Twilio or the in-memory simulator) is decided at startup.

pub mod segments;
pub mod sender;
pub mod simulated;
pub mod twilio;

pub use segments::calculate_segments;
pub use sender::SmsSender;
pub use simulated::{SimulatedSmsSender, SmsMessage};
pub use twilio::TwilioSmsSender;
