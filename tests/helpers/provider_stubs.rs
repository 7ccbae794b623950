//! In-process stand-ins for the payment gateway and identity provider
//!
//! The stubs answer from preloaded state and record every call, so tests
//! can drive paid registration and archival flows without a network.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reprise::services::identity::IdentityProvider;
use reprise::services::payment::{
    PaymentGateway, PaymentInitiation, PaymentStatus, SubscriptionStanding,
};
use reprise::utils::errors::{IdentityError, IdentityResult, PaymentError, PaymentResult};

/// Scripted payment gateway
pub struct StubGateway {
    inner: Mutex<StubGatewayState>,
}

struct StubGatewayState {
    fail_initialize: bool,
    verifications: HashMap<String, PaymentStatus>,
    subscriptions: HashMap<String, SubscriptionStanding>,
    unreachable_subscriptions: HashSet<String>,
    initialized: Vec<String>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StubGatewayState {
                fail_initialize: false,
                verifications: HashMap::new(),
                subscriptions: HashMap::new(),
                unreachable_subscriptions: HashSet::new(),
                initialized: Vec::new(),
            }),
        }
    }

    /// Make `initialize_payment` fail with a gateway error
    pub fn fail_initialize(&self) {
        self.inner.lock().unwrap().fail_initialize = true;
    }

    /// Script the verification result for a payment reference
    pub fn set_verification(&self, reference: &str, status: PaymentStatus) {
        self.inner
            .lock()
            .unwrap()
            .verifications
            .insert(reference.to_string(), status);
    }

    /// Script the standing returned for a subscription customer reference
    pub fn set_subscription(&self, customer_reference: &str, standing: SubscriptionStanding) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(customer_reference.to_string(), standing);
    }

    /// Make `verify_subscription` fail for one customer reference
    pub fn fail_subscription(&self, customer_reference: &str) {
        self.inner
            .lock()
            .unwrap()
            .unreachable_subscriptions
            .insert(customer_reference.to_string());
    }

    /// References passed to `initialize_payment`, in call order
    pub fn initialized_references(&self) -> Vec<String> {
        self.inner.lock().unwrap().initialized.clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn initialize_payment(
        &self,
        _email: &str,
        _amount_minor: i64,
        reference: &str,
    ) -> PaymentResult<PaymentInitiation> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_initialize {
            return Err(PaymentError::ServiceUnavailable);
        }
        state.initialized.push(reference.to_string());
        Ok(PaymentInitiation {
            payment_url: format!("https://checkout.test/{}", reference),
            reference: reference.to_string(),
        })
    }

    async fn verify_payment(&self, reference: &str) -> PaymentResult<PaymentStatus> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .verifications
            .get(reference)
            .copied()
            .unwrap_or(PaymentStatus::Pending))
    }

    async fn verify_subscription(
        &self,
        customer_reference: &str,
    ) -> PaymentResult<SubscriptionStanding> {
        let state = self.inner.lock().unwrap();
        if state.unreachable_subscriptions.contains(customer_reference) {
            return Err(PaymentError::ServiceUnavailable);
        }
        Ok(state
            .subscriptions
            .get(customer_reference)
            .copied()
            .unwrap_or(SubscriptionStanding::Lapsed))
    }
}

/// Identity provider that records deletions
pub struct RecordingIdentity {
    inner: Mutex<RecordingIdentityState>,
}

struct RecordingIdentityState {
    fail: bool,
    deleted: Vec<String>,
}

impl RecordingIdentity {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RecordingIdentityState {
                fail: false,
                deleted: Vec::new(),
            }),
        }
    }

    /// Make `delete_identity` fail with a provider error
    pub fn fail_deletions(&self) {
        self.inner.lock().unwrap().fail = true;
    }

    /// External ids deleted so far, in call order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl IdentityProvider for RecordingIdentity {
    async fn delete_identity(&self, external_id: &str) -> IdentityResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail {
            return Err(IdentityError::ServiceUnavailable);
        }
        state.deleted.push(external_id.to_string());
        Ok(())
    }
}
