//! Admin-managed discount coupons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use discoverly_core::{CouponId, DomainError, Entity};

/// Coupon codes are unique case-insensitively; they are stored upper-cased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub expiry: DateTime<Utc>,
    pub description: String,
    /// Percentage off, in `(0, 100]`.
    pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CouponPatch {
    pub code: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub discount: Option<f64>,
}

pub fn normalize_code(raw: &str) -> Result<String, DomainError> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() || code.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("coupon code must be a single non-empty word"));
    }
    Ok(code)
}

fn check_discount(discount: f64) -> Result<f64, DomainError> {
    if discount.is_finite() && discount > 0.0 && discount <= 100.0 {
        Ok(discount)
    } else {
        Err(DomainError::validation("discount must be a percentage in (0, 100]"))
    }
}

impl Coupon {
    pub fn create(id: CouponId, new: NewCoupon) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            code: normalize_code(&new.code)?,
            expiry: new.expiry,
            description: new.description.trim().to_string(),
            discount: check_discount(new.discount)?,
        })
    }

    /// Validates every supplied field before touching any of them.
    pub fn apply(&mut self, patch: &CouponPatch) -> Result<(), DomainError> {
        let code = patch.code.as_deref().map(normalize_code).transpose()?;
        let discount = patch.discount.map(check_discount).transpose()?;

        if let Some(code) = code {
            self.code = code;
        }
        if let Some(discount) = discount {
            self.discount = discount;
        }
        if let Some(expiry) = patch.expiry {
            self.expiry = expiry;
        }
        if let Some(description) = &patch.description {
            self.description = description.trim().to_string();
        }
        Ok(())
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }
}

impl Entity for Coupon {
    type Id = CouponId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_coupon(code: &str, discount: f64) -> NewCoupon {
        NewCoupon {
            code: code.to_string(),
            expiry: Utc::now() + Duration::days(7),
            description: "launch week".to_string(),
            discount,
        }
    }

    #[test]
    fn code_is_upper_cased() {
        let c = Coupon::create(CouponId::new(), new_coupon(" launch10 ", 10.0)).unwrap();
        assert_eq!(c.code, "LAUNCH10");
        assert!(c.is_active(Utc::now()));
    }

    #[test]
    fn discount_must_be_a_percentage() {
        assert!(Coupon::create(CouponId::new(), new_coupon("A", 0.0)).is_err());
        assert!(Coupon::create(CouponId::new(), new_coupon("A", 100.5)).is_err());
        assert!(Coupon::create(CouponId::new(), new_coupon("A", f64::NAN)).is_err());
        assert!(Coupon::create(CouponId::new(), new_coupon("A", 100.0)).is_ok());
    }

    #[test]
    fn invalid_patch_changes_nothing() {
        let mut c = Coupon::create(CouponId::new(), new_coupon("SAVE", 20.0)).unwrap();
        let before = c.clone();
        let err = c
            .apply(&CouponPatch {
                code: Some("NEW".to_string()),
                discount: Some(-1.0),
                ..CouponPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(c, before);
    }

    #[test]
    fn expired_coupon_is_inactive() {
        let mut c = Coupon::create(CouponId::new(), new_coupon("OLD", 5.0)).unwrap();
        c.expiry = Utc::now() - Duration::days(1);
        assert!(!c.is_active(Utc::now()));
    }
}
