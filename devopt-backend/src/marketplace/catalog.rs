//! Subscription tiers and the premium agent catalog

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::load_ron_config;
use crate::error::{AppError, AppResult};
use crate::models::SubscriptionTier;

const CATALOG_FILE: &str = "marketplace_catalog.ron";
const BUILTIN_CATALOG: &str = include_str!("../../config/marketplace_catalog.ron");

/// Percent off the monthly price when billed yearly
pub const ANNUAL_DISCOUNT_PERCENT: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    pub tier: SubscriptionTier,
    pub name: String,
    pub monthly_price: f64,
    pub annual_price: f64,
    pub features: Vec<String>,
    /// Monthly API calls; None is unlimited
    pub api_calls: Option<u64>,
    /// Deployed agents; None is unlimited
    pub agents: Option<u64>,
    pub priority_support: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub name: String,
    pub agents: Vec<String>,
    pub tier: SubscriptionTier,
    pub monthly_price: f64,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenuePotential {
    pub monthly_revenue_potential: f64,
    pub annual_revenue_potential: f64,
    pub premium_tier_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: CatalogCategory,
    pub annual_discount: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PremiumCatalog {
    pub categories: Vec<CategoryView>,
    pub total_agents: usize,
    pub revenue_potential: RevenuePotential,
}

/// Result of checking usage against a tier's limits
#[derive(Debug, Clone, Serialize)]
pub struct UsageCheck {
    pub tier: SubscriptionTier,
    pub within_limits: bool,
    /// None when the tier has no limit
    pub api_calls_remaining: Option<u64>,
    pub agents_remaining: Option<u64>,
    pub exceeded: Vec<&'static str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceCatalog {
    tiers: Vec<PricingTier>,
    categories: Vec<CatalogCategory>,
}

impl MarketplaceCatalog {
    pub fn load(config_dir: Option<&Path>) -> AppResult<Self> {
        let catalog: Self = load_ron_config(config_dir, CATALOG_FILE, BUILTIN_CATALOG)?;
        for tier in [
            SubscriptionTier::Starter,
            SubscriptionTier::Professional,
            SubscriptionTier::Enterprise,
        ] {
            if catalog.tier(tier).is_none() {
                return Err(AppError::config(format!("{} has no '{}' tier", CATALOG_FILE, tier)));
            }
        }
        log::info!(
            "[MARKETPLACE] Loaded {} tiers and {} catalog categories",
            catalog.tiers.len(),
            catalog.categories.len()
        );
        Ok(catalog)
    }

    pub fn builtin() -> AppResult<Self> {
        Self::load(None)
    }

    pub fn tiers(&self) -> &[PricingTier] {
        &self.tiers
    }

    pub fn tier(&self, tier: SubscriptionTier) -> Option<&PricingTier> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn revenue_potential(&self) -> RevenuePotential {
        let monthly: f64 = self.categories.iter().map(|c| c.monthly_price).sum();
        RevenuePotential {
            monthly_revenue_potential: monthly,
            annual_revenue_potential: monthly * 12.0 * (100 - ANNUAL_DISCOUNT_PERCENT) as f64 / 100.0,
            premium_tier_value: monthly * 0.6,
        }
    }

    pub fn premium_catalog(&self) -> PremiumCatalog {
        PremiumCatalog {
            categories: self
                .categories
                .iter()
                .cloned()
                .map(|category| CategoryView {
                    category,
                    annual_discount: ANNUAL_DISCOUNT_PERCENT,
                })
                .collect(),
            total_agents: self.categories.iter().map(|c| c.agents.len()).sum(),
            revenue_potential: self.revenue_potential(),
        }
    }

    /// Compare monthly API calls and deployed agents with the tier's limits
    pub fn check_usage(&self, tier: SubscriptionTier, api_calls: u64, agents: u64) -> AppResult<UsageCheck> {
        let limits = self
            .tier(tier)
            .ok_or_else(|| AppError::not_found(format!("Subscription tier '{}'", tier)))?;

        let mut exceeded = Vec::new();
        if limits.api_calls.is_some_and(|limit| api_calls > limit) {
            exceeded.push("api_calls");
        }
        if limits.agents.is_some_and(|limit| agents > limit) {
            exceeded.push("agents");
        }

        Ok(UsageCheck {
            tier,
            within_limits: exceeded.is_empty(),
            api_calls_remaining: limits.api_calls.map(|limit| limit.saturating_sub(api_calls)),
            agents_remaining: limits.agents.map(|limit| limit.saturating_sub(agents)),
            exceeded,
        })
    }
}
