pub mod account;
pub mod otp;
pub mod sms;

pub use account::AccountService;
pub use otp::OtpService;
pub use sms::SmsGateway;
