//! Marketplace listings, purchases, reviews and per-day analytics

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    OneTime,
    Subscription,
    UsageBased,
}

impl PricingModel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "one_time" => Some(PricingModel::OneTime),
            "subscription" => Some(PricingModel::Subscription),
            "usage_based" => Some(PricingModel::UsageBased),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::OneTime => "one_time",
            PricingModel::Subscription => "subscription",
            PricingModel::UsageBased => "usage_based",
        }
    }
}

/// An agent offered for sale
#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceAgent {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub industry: String,
    pub pricing_model: PricingModel,
    pub price: f64,
    pub version: String,
    pub developer_id: i64,
    pub is_active: bool,
    pub is_verified: bool,
    pub download_count: i64,
    pub rating: f64,
    pub revenue: f64,
    pub tech_stack: Vec<String>,
    pub compliance_standards: Vec<String>,
    pub security_features: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub name: String,
    pub description: String,
    pub category: String,
    pub industry: String,
    pub pricing_model: PricingModel,
    pub price: f64,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub compliance_standards: Vec<String>,
    #[serde(default)]
    pub security_features: Vec<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Price buckets accepted by listing search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    Free,
    Low,
    Medium,
    High,
}

impl PriceRange {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(PriceRange::Free),
            "low" => Some(PriceRange::Low),
            "medium" => Some(PriceRange::Medium),
            "high" => Some(PriceRange::High),
            _ => None,
        }
    }

    /// Bounds are inclusive except the strict lower bound of High
    pub fn contains(&self, price: f64) -> bool {
        match self {
            PriceRange::Free => price == 0.0,
            PriceRange::Low => (0.01..=1000.0).contains(&price),
            PriceRange::Medium => (1000.0..=10000.0).contains(&price),
            PriceRange::High => price > 10000.0,
        }
    }

    pub(crate) fn sql_clause(&self) -> &'static str {
        match self {
            PriceRange::Free => "price = 0",
            PriceRange::Low => "price BETWEEN 0.01 AND 1000",
            PriceRange::Medium => "price BETWEEN 1000 AND 10000",
            PriceRange::High => "price > 10000",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilter {
    #[serde(default, rename = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub rating_min: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Active,
    Expired,
    Cancelled,
}

impl PurchaseStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PurchaseStatus::Active),
            "expired" => Some(PurchaseStatus::Expired),
            "cancelled" => Some(PurchaseStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Active => "active",
            PurchaseStatus::Expired => "expired",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub id: i64,
    pub buyer_id: i64,
    pub agent_id: i64,
    pub amount_paid: f64,
    /// single, enterprise or unlimited
    pub license_type: String,
    pub status: PurchaseStatus,
    pub payment_reference: Option<String>,
    pub license_key: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i64,
    pub reviewer_id: i64,
    pub agent_id: i64,
    pub rating: i64,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_verified_purchase: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentAnalyticsDay {
    pub agent_id: i64,
    pub date: NaiveDate,
    pub views: i64,
    pub downloads: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceStats {
    pub total_agents: i64,
    pub total_developers: i64,
    pub total_enterprises: i64,
    pub total_downloads: i64,
    pub total_revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_range_bounds() {
        assert!(PriceRange::Free.contains(0.0));
        assert!(!PriceRange::Free.contains(0.5));
        assert!(PriceRange::Low.contains(0.5));
        assert!(PriceRange::Low.contains(1000.0));
        // 1000 sits in both low and medium
        assert!(PriceRange::Medium.contains(1000.0));
        assert!(PriceRange::Medium.contains(10000.0));
        assert!(!PriceRange::High.contains(10000.0));
        assert!(PriceRange::High.contains(12000.0));
    }

    #[test]
    fn test_pricing_model_accepts_hyphens() {
        assert_eq!(PricingModel::from_str("one-time"), Some(PricingModel::OneTime));
        assert_eq!(PricingModel::from_str("usage_based"), Some(PricingModel::UsageBased));
        assert_eq!(PricingModel::from_str("barter"), None);
    }
}
