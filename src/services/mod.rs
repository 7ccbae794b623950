//! Services module
//!
//! This module contains business logic services

pub mod identity;
pub mod materializer;
pub mod payment;
pub mod registration;

// Re-export commonly used services
pub use identity::{IdentityProvider, HttpIdentityProvider, NoopIdentityProvider};
pub use materializer::{InstanceMaterializer, MaterializationReport, PatternConflictPolicy};
pub use payment::{PaymentGateway, HttpPaymentGateway, PaymentInitiation, PaymentStatus, SubscriptionStanding};
pub use registration::{RegistrationService, RegistrationOutcome};

use std::sync::Arc;
use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub materializer: InstanceMaterializer,
    pub registration_service: RegistrationService,
    pub gateway: Arc<dyn PaymentGateway>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, db: &DatabaseService) -> Result<Self> {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(&settings.payment)?);
        let identity: Arc<dyn IdentityProvider> = match HttpIdentityProvider::from_config(&settings.identity)? {
            Some(provider) => Arc::new(provider),
            None => Arc::new(NoopIdentityProvider),
        };

        Ok(Self::with_providers(settings, db, gateway, identity))
    }

    /// Assemble the factory around externally built providers
    ///
    /// Integration tests use this to swap in stub gateways.
    pub fn with_providers(
        settings: &Settings,
        db: &DatabaseService,
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let materializer = InstanceMaterializer::new(
            db.templates.clone(),
            db.instances.clone(),
            db.registrations.clone(),
            &settings.engine,
        );
        let registration_service = RegistrationService::new(
            db.instances.clone(),
            db.registrations.clone(),
            gateway.clone(),
        );

        Self {
            materializer,
            registration_service,
            gateway,
            identity,
        }
    }
}
