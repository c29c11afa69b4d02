use crypto::hmac::Hmac;
use crypto::mac::Mac;
use crypto::sha2::Sha256;
use crypto::util::fixed_time_eq;
use mongodb::Database;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::State;
use serde::Deserialize;

use crate::config::Config;
use crate::data::org::db::OrgDbExt;
use crate::data::org::SubscriptionStatus;
use crate::resp::fail::{self, ApiError};

pub static SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Raw `Stripe-Signature` header value. Extracted as a guard so the route
/// can't be mounted without it.
pub struct StripeSignature(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StripeSignature {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.headers().get_one(SIGNATURE_HEADER) {
            Some(value) => Outcome::Success(StripeSignature(value.to_string())),
            None => {
                let e = fail::validation("Missing webhook signature header.");
                Outcome::Error((e.status(), e))
            }
        }
    }
}

/// Parsed `t=...,v1=...` pieces of the signature header.
fn parse_signature(header: &str) -> Option<(&str, &str)> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    timestamp.zip(signature)
}

fn hex_decode(value: &str) -> Option<Vec<u8>> {
    // Header values are attacker-controlled; work on bytes so a multi-byte
    // character can't land mid-slice.
    if value.len() % 2 != 0 || !value.is_ascii() {
        return None;
    }
    value
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

/// Verifies `HMAC-SHA256(secret, "{t}.{body}")` against the `v1` signature
/// using a constant-time comparison.
pub fn verify_signature(secret: &str, header: &str, body: &str) -> bool {
    let Some((timestamp, signature)) = parse_signature(header) else {
        return false;
    };
    let Some(expected) = hex_decode(signature) else {
        return false;
    };

    let mut mac = Hmac::new(Sha256::new(), secret.as_bytes());
    mac.input(format!("{}.{}", timestamp, body).as_bytes());

    let computed = mac.result();
    let computed = computed.code();

    computed.len() == expected.len() && fixed_time_eq(computed, &expected)
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    #[serde(default)]
    metadata: WebhookMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookMetadata {
    domain: Option<String>,
}

/// Billing provider callback. The body stays a raw string until the signature
/// is verified; parsing unverified payloads is off the table.
#[post("/webhook", data = "<body>")]
#[tracing::instrument(skip_all)]
pub async fn stripe_webhook(
    body: String,
    signature: StripeSignature,
    config: &State<Config>,
    db: &State<Database>,
) -> Result<Status, ApiError> {
    let secret = config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| fail::validation("Webhook processing is not configured."))?;

    if !verify_signature(secret, &signature.0, &body) {
        tracing::warn!("webhook signature verification failed");
        return Err(fail::validation("Invalid webhook signature."));
    }

    let event: WebhookEvent =
        serde_json::from_str(&body).map_err(|_| fail::validation("Malformed webhook payload."))?;

    let status = match event.kind.as_str() {
        "payment_intent.succeeded" => SubscriptionStatus::Active,
        "payment_intent.payment_failed" | "charge.refunded" => SubscriptionStatus::Inactive,
        other => {
            // Unhandled event kinds are acknowledged so the provider stops
            // retrying them.
            tracing::debug!("ignoring webhook event kind '{}'", other);
            return Ok(Status::Ok);
        }
    };

    let domain = event
        .data
        .object
        .metadata
        .domain
        .ok_or_else(|| fail::validation("Webhook payload names no organization."))?;

    match db.set_subscription_status(&domain, status).await? {
        Some(org) => {
            tracing::info!(
                "subscription for '{}' set to {:?} by webhook",
                org.domain,
                status
            );
            Ok(Status::Ok)
        }
        None => Err(fail::not_found("Organization")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, body: &str) -> String {
        let mut mac = Hmac::new(Sha256::new(), secret.as_bytes());
        mac.input(format!("{}.{}", timestamp, body).as_bytes());
        let result = mac.result();
        let hex: String = result.code().iter().map(|b| format!("{:02x}", b)).collect();
        format!("t={},v1={}", timestamp, hex)
    }

    #[test]
    fn valid_signature_verifies() {
        let body = r#"{"type":"payment_intent.succeeded"}"#;
        let header = sign("whsec_test", "1693400000", body);
        assert!(verify_signature("whsec_test", &header, body));
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign("whsec_test", "1693400000", "original");
        assert!(!verify_signature("whsec_test", &header, "tampered"));
    }

    #[test]
    fn wrong_secret_fails() {
        let body = "payload";
        let header = sign("whsec_test", "1693400000", body);
        assert!(!verify_signature("whsec_other", &header, body));
    }

    #[test]
    fn malformed_header_fails() {
        assert!(!verify_signature("whsec_test", "nonsense", "payload"));
        assert!(!verify_signature("whsec_test", "t=123", "payload"));
        assert!(!verify_signature("whsec_test", "t=123,v1=zz", "payload"));
    }

    #[test]
    fn non_ascii_signature_is_rejected_without_panicking() {
        // Even-length value whose second byte sits inside a multi-byte
        // character; must decode to None, not slice mid-character.
        assert!(!verify_signature("whsec_test", "t=123,v1=aéz", "payload"));
        assert!(!verify_signature("whsec_test", "t=123,v1=éé", "payload"));
        assert_eq!(hex_decode("aéz"), None);
    }

    #[test]
    fn signature_timestamp_is_part_of_the_mac() {
        let body = "payload";
        let header = sign("whsec_test", "1693400000", body);
        let shifted = header.replace("t=1693400000", "t=1693400001");
        assert!(!verify_signature("whsec_test", &shifted, body));
    }
}
