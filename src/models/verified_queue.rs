use serde::{Deserialize, Serialize};

/// Human-review work item, created at most once per order when the purchased
/// service level requires verification.
///
/// The notify sub-record captures whether operations staff were successfully
/// emailed; a failed notification is recorded, not retried, and never rolls
/// back the queue entry itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub order_id: String,
    pub application_id: String,
    pub landlord_id: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub service_level: String,
    pub status: String,
    pub notify_sent: bool,
    pub notify_error: Option<String>,
    pub notified_at: Option<i64>,
    pub created_at: i64,
}
