//! Telephony status callback.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::AppState;
use crate::config::Config;
use crate::error::{AuthError, Result};
use crate::metrics;
use crate::schemas::ErrorResponse;
use crate::security::webhook::{verify_twilio_signature, SIGNATURE_HEADER};
use crate::voice::{self, twiml, ProviderCallStatus};

/// Form fields the provider posts on every status change.
#[derive(Debug, Default)]
struct CallEvent {
    call_sid: Option<String>,
    call_status: Option<String>,
    call_duration: Option<i32>,
}

impl CallEvent {
    fn from_params(params: &[(String, String)]) -> Self {
        let mut event = Self::default();
        for (name, value) in params {
            match name.as_str() {
                "CallSid" => event.call_sid = Some(value.clone()),
                "CallStatus" => event.call_status = Some(value.clone()),
                "CallDuration" => {
                    event.call_duration = value.trim().parse().ok().filter(|d: &i32| *d >= 0)
                }
                _ => {}
            }
        }
        event
    }
}

/// URL the provider signed: the public base URL followed by path and query.
fn signed_url(config: &Config, uri: &Uri) -> String {
    let base = config
        .public_base_url
        .as_deref()
        .unwrap_or_default()
        .trim_end_matches('/');
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{base}{path}")
}

fn verify_signature(
    config: &Config,
    headers: &HeaderMap,
    uri: &Uri,
    params: &[(String, String)],
) -> std::result::Result<(), AuthError> {
    let Some(auth_token) = config.twilio_auth_token.as_deref() else {
        return Ok(());
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::InvalidSignature)?;

    if verify_twilio_signature(auth_token, &signed_url(config, uri), params, signature) {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature)
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/voice/webhook/call-events",
    tag = "voice",
    request_body(content = String, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "TwiML reply", body = String, content_type = "application/xml"),
        (status = 403, description = "Signature missing or wrong", body = ErrorResponse)
    )
)]
pub async fn call_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Result<Response> {
    let params: Vec<(String, String)> = url::form_urlencoded::parse(&body).into_owned().collect();
    if let Err(e) = verify_signature(&state.config, &headers, &uri, &params) {
        warn!("Rejected call event with bad signature");
        return Err(e.into());
    }

    let event = CallEvent::from_params(&params);
    let raw_status = event.call_status.as_deref().unwrap_or("unknown");
    metrics::inc_webhook_events(raw_status);
    debug!(call_sid = ?event.call_sid, status = raw_status, "Call event received");

    let provider_status = event
        .call_status
        .as_deref()
        .and_then(|s| s.parse::<ProviderCallStatus>().ok());

    match (&event.call_sid, provider_status) {
        (Some(call_sid), Some(status)) => {
            state
                .services
                .calls
                .apply_provider_status(call_sid, status.into(), event.call_duration)
                .await?;
        }
        (_, None) => warn!(status = raw_status, "Unrecognised call status"),
        (None, Some(_)) => warn!("Call event without CallSid"),
    }

    let reply = voice::reply_for(provider_status);
    Ok(([(header::CONTENT_TYPE, twiml::CONTENT_TYPE)], reply.to_string()).into_response())
}
