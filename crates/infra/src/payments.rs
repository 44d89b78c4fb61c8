//! Subscription payments.
//!
//! The card processor is an external collaborator behind [`PaymentProvider`];
//! this module only validates amounts and turns a charge the provider confirms
//! into a subscription flag on the caller's user record. The client never
//! asserts success itself: it names the intent and the provider is asked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use discoverly_auth::{Gate, Principal, User};
use discoverly_core::Email;

use crate::access::AccessControl;
use crate::error::{ServiceError, ServiceResult};

pub const CURRENCY: &str = "usd";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount_cents: u64,
    pub currency: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),

    #[error("payment provider rejected the request: {0}")]
    Rejected(String),
}

impl From<PaymentError> for ServiceError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Unavailable(msg) => ServiceError::Transient(msg),
            PaymentError::Rejected(msg) => ServiceError::Validation(msg),
        }
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open an intent on behalf of `customer`.
    async fn create_intent(
        &self,
        customer: &Email,
        amount_cents: u64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Whether `intent_id` belongs to `customer` and its charge went through.
    async fn charge_succeeded(&self, customer: &Email, intent_id: &str) -> Result<bool, PaymentError>;
}

/// Offline provider. Intents it issued count as paid; anything else does not.
#[derive(Debug, Default)]
pub struct DevPaymentProvider {
    issued: Mutex<HashMap<String, Email>>,
}

impl DevPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentProvider for DevPaymentProvider {
    async fn create_intent(
        &self,
        customer: &Email,
        amount_cents: u64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let id = format!("pi_{}", uuid::Uuid::now_v7().simple());
        self.issued
            .lock()
            .map_err(|_| PaymentError::Unavailable("intent registry poisoned".to_string()))?
            .insert(id.clone(), customer.clone());
        Ok(PaymentIntent {
            client_secret: format!("{id}_secret_dev"),
            id,
            amount_cents,
            currency: currency.to_string(),
        })
    }

    async fn charge_succeeded(&self, customer: &Email, intent_id: &str) -> Result<bool, PaymentError> {
        let issued = self
            .issued
            .lock()
            .map_err(|_| PaymentError::Unavailable("intent registry poisoned".to_string()))?;
        Ok(issued.get(intent_id) == Some(customer))
    }
}

/// Parse a price given as a JSON number or numeric string into cents.
///
/// Rejects non-numeric, non-finite and non-positive values.
pub fn parse_amount(price: &serde_json::Value) -> ServiceResult<u64> {
    let value = match price {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| ServiceError::Validation("price must be numeric".to_string()))?;

    let cents = (value * 100.0).round();
    if cents < 1.0 || cents > u64::MAX as f64 {
        return Err(ServiceError::Validation(
            "price must be a positive amount".to_string(),
        ));
    }
    Ok(cents as u64)
}

#[derive(Clone)]
pub struct Payments {
    provider: Arc<dyn PaymentProvider>,
    access: AccessControl,
}

impl Payments {
    pub fn new(provider: Arc<dyn PaymentProvider>, access: AccessControl) -> Self {
        Self { provider, access }
    }

    #[instrument(skip(self, principal, price), fields(caller = %principal.email), err)]
    pub async fn create_intent(&self, principal: &Principal, price: &serde_json::Value) -> ServiceResult<PaymentIntent> {
        Gate::authenticated().check(principal)?;
        let amount_cents = parse_amount(price)?;
        let intent = self
            .provider
            .create_intent(&principal.email, amount_cents, CURRENCY)
            .await?;
        info!(intent_id = %intent.id, amount_cents, "payment intent created");
        Ok(intent)
    }

    /// Subscribe the caller once the provider confirms the intent was paid.
    /// Idempotent for an already confirmed intent.
    #[instrument(skip(self, principal), fields(caller = %principal.email), err)]
    pub async fn confirm_subscription(&self, principal: &Principal, intent_id: &str) -> ServiceResult<User> {
        Gate::authenticated().check(principal)?;
        let intent_id = intent_id.trim();
        if intent_id.is_empty() {
            return Err(ServiceError::Validation("intentId is required".to_string()));
        }
        if !self.provider.charge_succeeded(&principal.email, intent_id).await? {
            warn!(intent_id, "subscription requested without a confirmed charge");
            return Err(ServiceError::PaymentNotConfirmed);
        }
        self.access
            .mark_subscribed(principal, principal.email.as_str())
            .await
    }
}

impl core::fmt::Debug for Payments {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Payments").finish_non_exhaustive()
    }
}
