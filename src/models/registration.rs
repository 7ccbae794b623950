//! Registration model and state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Registration lifecycle states
///
/// Paid instances start at `PendingPayment`; free instances start at
/// `Registered`. Only `Registered` rows hold a claimed seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    PendingPayment,
    Registered,
    Cancelled,
    Abandoned,
}

impl RegistrationStatus {
    /// Active registrations block a duplicate for the same (instance, user)
    pub fn is_active(&self) -> bool {
        matches!(self, RegistrationStatus::PendingPayment | RegistrationStatus::Registered)
    }

    /// Whether a seat is currently counted for this registration
    pub fn holds_seat(&self) -> bool {
        matches!(self, RegistrationStatus::Registered)
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegistrationStatus::PendingPayment => "pending_payment",
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Abandoned => "abandoned",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub user_id: i64,
    pub status: RegistrationStatus,
    pub payment_reference: Option<String>,
    pub amount_minor: i64,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Request for a registration that starts in `pending_payment`
///
/// The status is not part of the request: state transitions are owned
/// by the repository lifecycle methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegistrationRequest {
    pub instance_id: Uuid,
    pub user_id: i64,
    pub payment_reference: Option<String>,
    pub amount_minor: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_states() {
        assert!(RegistrationStatus::PendingPayment.is_active());
        assert!(RegistrationStatus::Registered.is_active());
        assert!(!RegistrationStatus::Cancelled.is_active());
        assert!(!RegistrationStatus::Abandoned.is_active());
    }

    #[test]
    fn test_only_registered_holds_seat() {
        assert!(RegistrationStatus::Registered.holds_seat());
        assert!(!RegistrationStatus::PendingPayment.holds_seat());
        assert!(!RegistrationStatus::Cancelled.holds_seat());
        assert!(!RegistrationStatus::Abandoned.holds_seat());
    }

    #[test]
    fn test_status_serde_names_match_database_enum() {
        assert_eq!(
            serde_json::to_value(RegistrationStatus::PendingPayment).unwrap(),
            serde_json::json!("pending_payment")
        );
        assert_eq!(RegistrationStatus::PendingPayment.to_string(), "pending_payment");
        assert_eq!(RegistrationStatus::Abandoned.to_string(), "abandoned");
    }
}
