//! Operator notification for verified screening reviews.
//!
//! When configured via `OPS_NOTIFY_URL`, Rentfolio posts a work-item summary
//! to the operations webhook whenever a verified-tier order enters the review
//! queue. Exactly one attempt is made per queue entry (bounded timeout, one
//! retry on 5xx); the outcome is recorded on the entry, never retried later.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::models::QueueEntry;

/// Per-request timeout for the notification POST.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification payload for a queued verified review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewNotification {
    /// Always "verified_screening_review"
    pub event: &'static str,
    pub queue_id: String,
    pub order_id: String,
    pub application_id: String,
    pub landlord_id: String,
    pub applicant_name: String,
    pub service_level: String,
    pub timestamp: i64,
}

impl ReviewNotification {
    pub fn for_entry(entry: &QueueEntry) -> Self {
        Self {
            event: "verified_screening_review",
            queue_id: entry.id.clone(),
            order_id: entry.order_id.clone(),
            application_id: entry.application_id.clone(),
            landlord_id: entry.landlord_id.clone(),
            applicant_name: entry.applicant_name.clone(),
            service_level: entry.service_level.clone(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Clone)]
pub struct OpsNotifier {
    client: Client,
    url: Option<String>,
}

impl OpsNotifier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    /// Send one review notification. Returns Err with a stable code string on
    /// failure; the caller records it on the queue entry and moves on.
    pub async fn notify_review(&self, notification: &ReviewNotification) -> Result<(), String> {
        let Some(url) = &self.url else {
            return Err("notify_not_configured".to_string());
        };

        // One retry on 5xx only - 4xx means the payload is wrong and a retry
        // cannot help.
        for attempt in 0..2 {
            match self
                .client
                .post(url)
                .json(notification)
                .timeout(NOTIFY_TIMEOUT)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    if attempt > 0 {
                        tracing::debug!("Ops notification succeeded on retry");
                    }
                    return Ok(());
                }
                Ok(resp) if resp.status().is_server_error() && attempt == 0 => {
                    tracing::debug!("Ops notification returned {}, retrying once", resp.status());
                }
                Ok(resp) => {
                    return Err(format!("notify_http_{}", resp.status().as_u16()));
                }
                Err(e) if e.is_timeout() => {
                    return Err("notify_timeout".to_string());
                }
                Err(e) => {
                    return Err(format!("notify_error: {}", e));
                }
            }
        }

        Err("notify_http_5xx".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_entry() -> QueueEntry {
        QueueEntry {
            id: "rf_vsq_0".to_string(),
            order_id: "rf_ord_0".to_string(),
            application_id: "rf_app_0".to_string(),
            landlord_id: "rf_lld_0".to_string(),
            applicant_name: "Jordan Tester".to_string(),
            applicant_email: "jordan@example.com".to_string(),
            service_level: "verified".to_string(),
            status: "pending".to_string(),
            notify_sent: false,
            notify_error: None,
            notified_at: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_notification_serialization() {
        let n = ReviewNotification::for_entry(&test_entry());
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"event\":\"verified_screening_review\""));
        assert!(json.contains("\"order_id\":\"rf_ord_0\""));
        assert!(json.contains("\"service_level\":\"verified\""));
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_reports_stable_code() {
        let notifier = OpsNotifier::new(None);
        let err = notifier
            .notify_review(&ReviewNotification::for_entry(&test_entry()))
            .await
            .unwrap_err();
        assert_eq!(err, "notify_not_configured");
    }
}
