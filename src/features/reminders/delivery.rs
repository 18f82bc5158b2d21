//! # Direct Message Delivery
//!
//! Serenity-backed delivery channel: a reminder is pushed to the recipient's
//! DM channel. Discord JSON error codes decide whether a failure is permanent
//! (recipient gone or unreachable) or transient (everything else).
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.9.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation with error-code classification

use async_trait::async_trait;
use log::debug;
use serenity::http::{Http, HttpError};
use serenity::model::id::UserId;
use std::sync::Arc;

use super::{DeliveryChannel, DeliveryFailure};

/// Discord JSON error: cannot send messages to this user (DMs closed or bot
/// blocked).
const CANNOT_MESSAGE_USER: isize = 50007;
/// Discord JSON error: unknown user.
const UNKNOWN_USER: isize = 10013;

/// Delivers reminder texts over the user's DM channel.
pub struct DirectMessages {
    http: Arc<Http>,
}

impl DirectMessages {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DeliveryChannel for DirectMessages {
    async fn send(&self, owner_id: &str, text: &str) -> Result<(), DeliveryFailure> {
        let user_id: u64 = owner_id.parse().map_err(|_| {
            // Not a Discord snowflake; no retry will ever fix this.
            DeliveryFailure::permanent(format!("malformed user id {owner_id:?}"))
        })?;

        let dm = UserId(user_id)
            .create_dm_channel(&self.http)
            .await
            .map_err(classify)?;
        dm.id.say(&self.http, text).await.map_err(classify)?;

        debug!("Delivered reminder DM to user {owner_id}");
        Ok(())
    }
}

/// Map a serenity error onto the failure taxonomy.
fn classify(err: serenity::Error) -> DeliveryFailure {
    if let serenity::Error::Http(http_err) = &err {
        if let HttpError::UnsuccessfulRequest(response) = http_err.as_ref() {
            if response.error.code == CANNOT_MESSAGE_USER || response.error.code == UNKNOWN_USER {
                return DeliveryFailure::permanent(format!(
                    "recipient unreachable: {}",
                    response.error.message
                ));
            }
        }
    }
    DeliveryFailure::transient(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::FailureKind;

    #[test]
    fn test_non_http_errors_are_transient() {
        let failure = classify(serenity::Error::Other("gateway hiccup"));
        assert_eq!(failure.kind, FailureKind::Transient);
    }

    #[tokio::test]
    async fn test_malformed_user_id_is_permanent() {
        let channel = DirectMessages::new(Arc::new(Http::new("unused-token")));
        let failure = channel
            .send("not-a-snowflake", "текст")
            .await
            .expect_err("send must fail before any network call");
        assert_eq!(failure.kind, FailureKind::Permanent);
    }
}
