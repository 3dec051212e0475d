//! Read-only data access used by flows and tools.
//!
//! `DataSource` is the boundary between the AI flow layer and wherever the
//! booking data actually lives. `InMemoryStore` serves a fixed `Dataset`
//! and is what the service runs on by default.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{
    Booking, Facility, MembershipPlan, PricingRule, PromotionRule, SiteSettings, SportEvent, User,
};

/// Read-only access to the booking collections.
///
/// An implementation that cannot reach its backing store must return
/// `CourtsideError::DataUnavailable` rather than an empty collection.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn facilities(&self) -> Result<Vec<Facility>>;
    async fn users(&self) -> Result<Vec<User>>;
    async fn bookings(&self) -> Result<Vec<Booking>>;
    async fn site_settings(&self) -> Result<SiteSettings>;
    async fn event(&self, id: &str) -> Result<Option<SportEvent>>;
    async fn membership_plan(&self, id: &str) -> Result<Option<MembershipPlan>>;
    async fn pricing_rule(&self, id: &str) -> Result<Option<PricingRule>>;
    async fn promotion_rule(&self, id: &str) -> Result<Option<PromotionRule>>;
}

/// A complete snapshot of every collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub facilities: Vec<Facility>,
    pub users: Vec<User>,
    pub bookings: Vec<Booking>,
    pub settings: SiteSettings,
    pub events: Vec<SportEvent>,
    pub membership_plans: Vec<MembershipPlan>,
    pub pricing_rules: Vec<PricingRule>,
    pub promotion_rules: Vec<PromotionRule>,
}

/// `DataSource` over an immutable in-memory `Dataset`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Dataset,
}

impl InMemoryStore {
    pub fn new(data: Dataset) -> Self {
        Self { data }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }
}

#[async_trait]
impl DataSource for InMemoryStore {
    async fn facilities(&self) -> Result<Vec<Facility>> {
        Ok(self.data.facilities.clone())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.data.users.clone())
    }

    async fn bookings(&self) -> Result<Vec<Booking>> {
        Ok(self.data.bookings.clone())
    }

    async fn site_settings(&self) -> Result<SiteSettings> {
        Ok(self.data.settings.clone())
    }

    async fn event(&self, id: &str) -> Result<Option<SportEvent>> {
        Ok(self.data.events.iter().find(|e| e.id == id).cloned())
    }

    async fn membership_plan(&self, id: &str) -> Result<Option<MembershipPlan>> {
        Ok(self
            .data
            .membership_plans
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn pricing_rule(&self, id: &str) -> Result<Option<PricingRule>> {
        Ok(self.data.pricing_rules.iter().find(|r| r.id == id).cloned())
    }

    async fn promotion_rule(&self, id: &str) -> Result<Option<PromotionRule>> {
        Ok(self
            .data
            .promotion_rules
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }
}
