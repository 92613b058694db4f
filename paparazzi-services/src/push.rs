//! Push notification delivery
//!
//! Maintains Web Push subscriptions and broadcasts a daily digest built from
//! the freshest story in each category. Endpoints that the push service
//! reports as gone are pruned from storage.

use chrono::Utc;
use paparazzi_core::{Category, PaparazziError, PaparazziResult, PushPayload, PushSubscription};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use crate::store::NewsStore;

const DIGEST_TITLE: &str = "• It's Paparazzi time 😊 •";
const DIGEST_FALLBACK_BODY: &str = "Your daily entertainment highlights are here!";
const DIGEST_ICON: &str =
    "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/svg/1f4f0.svg";
const DIGEST_TAG: &str = "paparazzi-daily";

const MESSAGE_TTL: Duration = Duration::from_secs(3600);

/// VAPID key material for signing push messages
#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub public_key: String,
    pub private_key: String,
    pub subject: String,
}

impl VapidConfig {
    pub fn from_env() -> PaparazziResult<Self> {
        let public_key = std::env::var("VAPID_PUBLIC_KEY")
            .map_err(|_| PaparazziError::config("VAPID_PUBLIC_KEY environment variable not set"))?;
        let private_key = std::env::var("VAPID_PRIVATE_KEY").map_err(|_| {
            PaparazziError::config("VAPID_PRIVATE_KEY environment variable not set")
        })?;
        let subject = std::env::var("VAPID_SUBJECT")
            .unwrap_or_else(|_| "mailto:admin@example.com".to_string());
        Ok(Self {
            public_key,
            private_key,
            subject,
        })
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastSummary {
    pub message: String,
    pub sent: usize,
    pub failed: usize,
    pub timestamp: chrono::DateTime<Utc>,
}

pub struct PushService {
    store: Arc<NewsStore>,
    client: HyperWebPushClient,
    vapid: VapidConfig,
}

impl PushService {
    pub fn new(store: Arc<NewsStore>, vapid: VapidConfig) -> Self {
        Self {
            store,
            client: HyperWebPushClient::new(),
            vapid,
        }
    }

    /// Register or refresh a subscription
    pub fn subscribe(&self, subscription: PushSubscription) -> PaparazziResult<()> {
        self.store
            .upsert_subscription(&subscription)
            .map_err(|e| PaparazziError::store(e.to_string()))
    }

    /// Build the digest and send it to every subscriber. Dead endpoints are
    /// removed along the way.
    #[instrument(skip(self))]
    pub async fn broadcast_digest(&self) -> PaparazziResult<BroadcastSummary> {
        let payload = self.build_digest()?;
        let subscriptions = self
            .store
            .list_subscriptions()
            .map_err(|e| PaparazziError::store(e.to_string()))?;
        info!("Broadcasting digest to {} subscriptions", subscriptions.len());

        let body = serde_json::to_vec(&payload)
            .map_err(|e| PaparazziError::internal(format!("Failed to encode payload: {}", e)))?;

        let mut sent = 0;
        let mut failed = 0;
        for subscription in &subscriptions {
            match self.send_to(subscription, &body).await {
                Ok(_) => sent += 1,
                // 404 maps to EndpointNotFound, 410 Gone to EndpointNotValid
                Err(WebPushError::EndpointNotFound) | Err(WebPushError::EndpointNotValid) => {
                    failed += 1;
                    if let Err(e) = self.store.delete_subscription(&subscription.endpoint) {
                        warn!("Failed to prune dead subscription: {}", e);
                    } else {
                        info!("Pruned dead subscription {}", short_endpoint(&subscription.endpoint));
                    }
                }
                Err(e) => {
                    failed += 1;
                    warn!(
                        "Push to {} failed: {}",
                        short_endpoint(&subscription.endpoint),
                        e
                    );
                }
            }
        }

        info!("Broadcast summary: sent={} failed={}", sent, failed);
        Ok(BroadcastSummary {
            message: "Push notifications sent".to_string(),
            sent,
            failed,
            timestamp: Utc::now(),
        })
    }

    async fn send_to(
        &self,
        subscription: &PushSubscription,
        body: &[u8],
    ) -> Result<(), WebPushError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone().unwrap_or_default(),
            subscription.auth.clone().unwrap_or_default(),
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.vapid.private_key, URL_SAFE_NO_PAD, &info)?;
        signature.add_claim("sub", self.vapid.subject.as_str());

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, body);
        builder.set_vapid_signature(signature.build()?);
        builder.set_ttl(MESSAGE_TTL.as_secs() as u32);

        self.client.send(builder.build()?).await
    }

    /// Digest payload from the freshest story per category. Any category may
    /// be empty; an entirely empty terminal still sends a greeting.
    fn build_digest(&self) -> PaparazziResult<PushPayload> {
        let mut blocks = Vec::new();
        let mut image = None;

        // Bollywood leads, then Hollywood, then TV
        for (category, emoji) in [
            (Category::Bollywood, "🎬"),
            (Category::Hollywood, "🌟"),
            (Category::Tv, "📺"),
        ] {
            let top = self
                .store
                .latest(category, 1)
                .map_err(|e| PaparazziError::store(e.to_string()))?
                .into_iter()
                .next();
            if let Some(record) = top {
                blocks.push(format!(
                    "{} {}\n• {} — {}",
                    emoji,
                    category.display_name(),
                    record.person_name,
                    record.news_text
                ));
                if image.is_none() && !record.image_url.is_empty() {
                    image = Some(record.image_url);
                }
            }
        }

        let body = if blocks.is_empty() {
            DIGEST_FALLBACK_BODY.to_string()
        } else {
            blocks.join("\n\n")
        };

        Ok(PushPayload {
            title: DIGEST_TITLE.to_string(),
            body,
            url: "/".to_string(),
            icon: DIGEST_ICON.to_string(),
            image,
            tag: Some(DIGEST_TAG.to_string()),
        })
    }
}

fn short_endpoint(endpoint: &str) -> String {
    let chars: Vec<char> = endpoint.chars().collect();
    if chars.len() > 32 {
        let head: String = chars[..16].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        endpoint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use paparazzi_core::{NewsDraft, NewsRecord};

    fn vapid() -> VapidConfig {
        VapidConfig {
            public_key: "pub".to_string(),
            private_key: "priv".to_string(),
            subject: "mailto:test@example.com".to_string(),
        }
    }

    fn record(category: Category, person: &str, text: &str) -> NewsRecord {
        NewsRecord::from_draft(
            NewsDraft::new(person, text),
            category,
            "https://img.example/top.jpg".to_string(),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_digest_orders_categories_and_picks_image() {
        let store = Arc::new(NewsStore::new_in_memory().unwrap());
        store
            .insert_records(
                Category::Hollywood,
                &[record(Category::Hollywood, "Star H", "Hollywood headline")],
            )
            .unwrap();
        store
            .insert_records(
                Category::Bollywood,
                &[record(Category::Bollywood, "Star B", "Bollywood headline")],
            )
            .unwrap();

        let service = PushService::new(store, vapid());
        let payload = service.build_digest().unwrap();

        assert_eq!(payload.title, DIGEST_TITLE);
        let bollywood_at = payload.body.find("Star B").unwrap();
        let hollywood_at = payload.body.find("Star H").unwrap();
        assert!(bollywood_at < hollywood_at);
        assert_eq!(payload.image.as_deref(), Some("https://img.example/top.jpg"));
        assert_eq!(payload.tag.as_deref(), Some(DIGEST_TAG));
    }

    #[test]
    fn test_digest_with_empty_store_uses_greeting() {
        let store = Arc::new(NewsStore::new_in_memory().unwrap());
        let service = PushService::new(store, vapid());
        let payload = service.build_digest().unwrap();
        assert_eq!(payload.body, DIGEST_FALLBACK_BODY);
        assert!(payload.image.is_none());
    }

    #[test]
    fn test_subscribe_persists() {
        let store = Arc::new(NewsStore::new_in_memory().unwrap());
        let service = PushService::new(store.clone(), vapid());
        service
            .subscribe(PushSubscription {
                endpoint: "https://push.example/ep".to_string(),
                p256dh: Some("k".to_string()),
                auth: Some("a".to_string()),
                user_agent: None,
                created_at: Utc::now(),
            })
            .unwrap();
        assert_eq!(store.list_subscriptions().unwrap().len(), 1);
    }

    #[test]
    fn test_short_endpoint() {
        assert_eq!(short_endpoint("short"), "short");
        let long = "https://push.example/very-long-endpoint-identifier-0123456789";
        let shortened = short_endpoint(long);
        assert!(shortened.starts_with("https://push.exa"));
        assert!(shortened.contains('…'));
    }

    #[test]
    fn test_short_endpoint_multibyte() {
        // Truncation must not split a multi-byte character
        let long = "https://push.exämple/ünicode-endpoint-identifier-0123456789";
        let shortened = short_endpoint(long);
        assert!(shortened.contains('…'));
        assert!(shortened.chars().count() < long.chars().count());
    }
}
