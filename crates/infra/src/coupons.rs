//! Admin-managed coupon book.

use chrono::Utc;
use tracing::{info, instrument};

use discoverly_auth::{Gate, Principal, Role};
use discoverly_catalog::{Coupon, CouponPatch, NewCoupon};
use discoverly_core::CouponId;

use crate::error::{ServiceError, ServiceResult};
use crate::store::{CouponWrite, StoreHandle};

#[derive(Debug, Clone)]
pub struct CouponBook {
    store: StoreHandle,
}

impl CouponBook {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Unexpired coupons, soonest expiry first.
    pub async fn list_active(&self) -> ServiceResult<Vec<Coupon>> {
        let now = Utc::now();
        let coupons = self
            .store
            .run("list_coupons", self.store.get().list_coupons())
            .await?;
        Ok(coupons.into_iter().filter(|c| c.is_active(now)).collect())
    }

    pub async fn list_all(&self, principal: &Principal) -> ServiceResult<Vec<Coupon>> {
        Gate::role(Role::Admin).check(principal)?;
        Ok(self
            .store
            .run("list_coupons", self.store.get().list_coupons())
            .await?)
    }

    #[instrument(skip(self, principal, new), fields(admin = %principal.email), err)]
    pub async fn create(&self, principal: &Principal, new: NewCoupon) -> ServiceResult<Coupon> {
        Gate::role(Role::Admin).check(principal)?;
        let coupon = Coupon::create(CouponId::new(), new)?;
        let inserted = self
            .store
            .run("insert_coupon", self.store.get().insert_coupon(coupon.clone()))
            .await?;
        if !inserted {
            return Err(ServiceError::CouponCodeTaken);
        }
        info!(code = %coupon.code, "coupon created");
        Ok(coupon)
    }

    #[instrument(skip(self, principal, patch), fields(coupon_id = %id, admin = %principal.email), err)]
    pub async fn update(&self, principal: &Principal, id: CouponId, patch: CouponPatch) -> ServiceResult<Coupon> {
        Gate::role(Role::Admin).check(principal)?;
        let mut coupon = self
            .store
            .run("find_coupon", self.store.get().find_coupon(id))
            .await?
            .ok_or(ServiceError::NotFound("coupon"))?;
        coupon.apply(&patch)?;

        match self
            .store
            .run("replace_coupon", self.store.get().replace_coupon(&coupon))
            .await?
        {
            CouponWrite::Written => {
                info!(code = %coupon.code, "coupon updated");
                Ok(coupon)
            }
            CouponWrite::NotFound => Err(ServiceError::NotFound("coupon")),
            CouponWrite::CodeTaken => Err(ServiceError::CouponCodeTaken),
        }
    }

    #[instrument(skip(self, principal), fields(coupon_id = %id, admin = %principal.email), err)]
    pub async fn delete(&self, principal: &Principal, id: CouponId) -> ServiceResult<()> {
        Gate::role(Role::Admin).check(principal)?;
        let deleted = self
            .store
            .run("delete_coupon", self.store.get().delete_coupon(id))
            .await?;
        if !deleted {
            return Err(ServiceError::NotFound("coupon"));
        }
        info!("coupon deleted");
        Ok(())
    }
}
