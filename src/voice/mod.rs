//! Telephony provider plumbing: call status vocabulary and TwiML replies.

pub mod twiml;

use strum::{AsRefStr, Display, EnumString};

use crate::models::CallStatus;

pub use twiml::Twiml;

/// Call status as reported by the telephony provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ProviderCallStatus {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
}

impl From<ProviderCallStatus> for CallStatus {
    fn from(status: ProviderCallStatus) -> Self {
        match status {
            ProviderCallStatus::Queued
            | ProviderCallStatus::Initiated
            | ProviderCallStatus::Ringing
            | ProviderCallStatus::InProgress => CallStatus::Active,
            ProviderCallStatus::Completed => CallStatus::Completed,
            ProviderCallStatus::Busy => CallStatus::Busy,
            ProviderCallStatus::Failed | ProviderCallStatus::NoAnswer | ProviderCallStatus::Canceled => {
                CallStatus::Failed
            }
        }
    }
}

/// TwiML answering a status callback.
pub fn reply_for(status: Option<ProviderCallStatus>) -> Twiml {
    match status {
        Some(ProviderCallStatus::Ringing) => Twiml::new()
            .say("Hello! Thank you for answering our call.")
            .say("An agent will be with you shortly."),
        Some(ProviderCallStatus::InProgress) => {
            Twiml::new().say("Your call is now connected. How can we help you today?")
        }
        Some(ProviderCallStatus::Completed) => Twiml::new(),
        _ => Twiml::new().say("Thank you for your call."),
    }
}
