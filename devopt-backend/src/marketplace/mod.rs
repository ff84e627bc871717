//! Agent marketplace: listings, purchases, reviews and developer analytics

pub mod catalog;
pub mod seed;

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    AgentAnalyticsDay, MarketplaceAgent, MarketplaceStats, NewListing, NewReview, PriceRange, Purchase, Review,
    SearchFilter, User, UserType,
};

pub use catalog::{MarketplaceCatalog, PremiumCatalog, PricingTier, UsageCheck};

const TRENDING_WINDOW_DAYS: i64 = 7;
const DASHBOARD_WINDOW_DAYS: i64 = 30;
const ANALYTICS_ROWS: usize = 30;
const REVIEWS_SHOWN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommissionSplit {
    pub platform_commission: f64,
    pub developer_earnings: f64,
}

pub fn calculate_commission(amount: f64, rate: f64) -> CommissionSplit {
    CommissionSplit {
        platform_commission: amount * rate,
        developer_earnings: amount * (1.0 - rate),
    }
}

/// `AMP-` followed by 16 uppercase hex characters
pub fn generate_license_key() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("AMP-{}", &hex[..16])
}

/// Listing search parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub rating_min: Option<f64>,
}

impl SearchParams {
    pub fn into_filter(self) -> AppResult<SearchFilter> {
        let price_range = match self.price_range.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => Some(PriceRange::from_str(raw).ok_or_else(|| {
                AppError::validation(format!(
                    "price_range must be free, low, medium or high, got '{}'",
                    raw
                ))
            })?),
            None => None,
        };
        Ok(SearchFilter {
            query: self.q,
            category: self.category,
            industry: self.industry,
            price_range,
            rating_min: self.rating_min,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub commission: CommissionSplit,
}

/// Per-day analytics laid out as parallel series, oldest first
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsSeries {
    pub dates: Vec<NaiveDate>,
    pub views: Vec<i64>,
    pub downloads: Vec<i64>,
    pub revenue: Vec<f64>,
}

impl From<Vec<AgentAnalyticsDay>> for AnalyticsSeries {
    fn from(days: Vec<AgentAnalyticsDay>) -> Self {
        let mut series = AnalyticsSeries::default();
        for day in days {
            series.dates.push(day.date);
            series.views.push(day.views);
            series.downloads.push(day.downloads);
            series.revenue.push(day.revenue);
        }
        series
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeveloperDashboard {
    pub agents: Vec<MarketplaceAgent>,
    pub total_revenue: f64,
    pub total_downloads: i64,
    pub recent_analytics: Vec<AgentAnalyticsDay>,
}

pub struct MarketplaceService {
    db: Arc<Database>,
    commission_rate: f64,
    catalog: MarketplaceCatalog,
}

impl MarketplaceService {
    pub fn new(db: Arc<Database>, commission_rate: f64, catalog: MarketplaceCatalog) -> Self {
        Self {
            db,
            commission_rate,
            catalog,
        }
    }

    pub fn catalog(&self) -> &MarketplaceCatalog {
        &self.catalog
    }

    pub fn commission(&self, amount: f64) -> CommissionSplit {
        calculate_commission(amount, self.commission_rate)
    }

    pub fn search(&self, filter: &SearchFilter) -> AppResult<Vec<MarketplaceAgent>> {
        Ok(self.db.search_listings(filter)?)
    }

    /// An active listing; unknown and withdrawn listings are not found
    pub fn listing(&self, agent_id: i64) -> AppResult<MarketplaceAgent> {
        self.db
            .get_listing(agent_id)?
            .filter(|listing| listing.is_active)
            .ok_or_else(|| AppError::not_found(format!("Agent {}", agent_id)))
    }

    /// Show a listing and count the view
    pub fn view_listing(&self, agent_id: i64) -> AppResult<MarketplaceAgent> {
        let listing = self.listing(agent_id)?;
        self.record_view(agent_id)?;
        Ok(listing)
    }

    pub fn record_view(&self, agent_id: i64) -> AppResult<()> {
        Ok(self.db.record_listing_view(agent_id, Utc::now().date_naive())?)
    }

    /// Developers and admins may list agents. Admin listings are verified at once,
    /// everything else waits for review.
    pub fn create_listing(&self, developer: &User, listing: &NewListing) -> AppResult<MarketplaceAgent> {
        if !matches!(developer.user_type, UserType::Developer | UserType::Admin) {
            return Err(AppError::Forbidden("a developer account is required to list agents".into()));
        }
        if listing.name.trim().is_empty() || listing.description.trim().is_empty() {
            return Err(AppError::validation("name and description are required"));
        }
        if listing.category.trim().is_empty() {
            return Err(AppError::validation("category is required"));
        }
        if !listing.price.is_finite() || listing.price < 0.0 {
            return Err(AppError::validation("price must be zero or more"));
        }

        let created = self.db.create_listing(developer.id, listing, developer.is_admin())?;
        log::info!(
            "[MARKETPLACE] '{}' listed agent {} ({})",
            developer.username,
            created.id,
            created.name
        );
        Ok(created)
    }

    pub fn trending(&self, limit: usize) -> AppResult<Vec<MarketplaceAgent>> {
        let since = Utc::now().date_naive() - Duration::days(TRENDING_WINDOW_DAYS);
        Ok(self.db.trending_listings(since, limit)?)
    }

    /// Unknown users get no recommendations
    pub fn recommendations(&self, user_id: i64, limit: usize) -> AppResult<Vec<MarketplaceAgent>> {
        if self.db.get_user(user_id)?.is_none() {
            return Ok(Vec::new());
        }
        Ok(self.db.recommended_listings(user_id, limit)?)
    }

    pub fn process_purchase(
        &self,
        buyer_id: i64,
        agent_id: i64,
        payment_reference: Option<&str>,
    ) -> AppResult<PurchaseReceipt> {
        let license_key = generate_license_key();
        let purchase = self
            .db
            .record_purchase(buyer_id, agent_id, payment_reference, &license_key, Utc::now().date_naive())?
            .ok_or_else(|| AppError::not_found(format!("Buyer {} or agent {}", buyer_id, agent_id)))?;

        let commission = self.commission(purchase.amount_paid);
        log::info!(
            "[MARKETPLACE] User {} bought agent {} for {:.2} (platform {:.2}, developer {:.2})",
            buyer_id,
            agent_id,
            purchase.amount_paid,
            commission.platform_commission,
            commission.developer_earnings
        );
        Ok(PurchaseReceipt { purchase, commission })
    }

    pub fn has_purchased(&self, user_id: i64, agent_id: i64) -> AppResult<bool> {
        Ok(self.db.has_active_purchase(user_id, agent_id)?)
    }

    /// Review a listing. Buyers' reviews are marked as verified purchases.
    pub fn add_review(&self, reviewer: &User, agent_id: i64, review: &NewReview) -> AppResult<Review> {
        if !(1..=5).contains(&review.rating) {
            return Err(AppError::validation("rating must be between 1 and 5"));
        }
        self.listing(agent_id)?;
        let verified = self.has_purchased(reviewer.id, agent_id)?;
        let clean = |text: &Option<String>| text.as_deref().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);

        Ok(self.db.add_review(
            reviewer.id,
            agent_id,
            review.rating,
            clean(&review.title).as_deref(),
            clean(&review.comment).as_deref(),
            verified,
        )?)
    }

    pub fn reviews(&self, agent_id: i64) -> AppResult<Vec<Review>> {
        self.listing(agent_id)?;
        Ok(self.db.list_reviews(agent_id, REVIEWS_SHOWN)?)
    }

    /// Daily analytics for a listing, visible to its developer and to admins
    pub fn listing_analytics(&self, user: &User, agent_id: i64) -> AppResult<AnalyticsSeries> {
        let listing = self
            .db
            .get_listing(agent_id)?
            .ok_or_else(|| AppError::not_found(format!("Agent {}", agent_id)))?;
        if listing.developer_id != user.id && !user.is_admin() {
            return Err(AppError::Forbidden("access denied".into()));
        }
        Ok(self.db.listing_analytics(agent_id, ANALYTICS_ROWS)?.into())
    }

    pub fn developer_dashboard(&self, user: &User) -> AppResult<DeveloperDashboard> {
        if user.user_type != UserType::Developer {
            return Err(AppError::Forbidden("a developer account is required".into()));
        }
        let agents = self.db.listings_for_developer(user.id)?;
        let since = Utc::now().date_naive() - Duration::days(DASHBOARD_WINDOW_DAYS);

        Ok(DeveloperDashboard {
            total_revenue: agents.iter().map(|a| a.revenue).sum(),
            total_downloads: agents.iter().map(|a| a.download_count).sum(),
            recent_analytics: self.db.developer_analytics(user.id, since)?,
            agents,
        })
    }

    pub fn stats(&self) -> AppResult<MarketplaceStats> {
        Ok(self.db.marketplace_stats()?)
    }

    /// Admin review of a developer listing; only verified listings are searchable
    pub fn set_verified(&self, admin: &User, agent_id: i64, verified: bool) -> AppResult<MarketplaceAgent> {
        if !admin.is_admin() {
            return Err(AppError::Forbidden("only administrators can verify listings".into()));
        }
        if !self.db.set_listing_verified(agent_id, verified)? {
            return Err(AppError::not_found(format!("Agent {}", agent_id)));
        }
        log::info!(
            "[MARKETPLACE] '{}' set agent {} verified={}",
            admin.username,
            agent_id,
            verified
        );
        self.listing(agent_id)
    }

    /// A buyer's purchases, newest first
    pub fn purchases(&self, buyer: &User) -> AppResult<Vec<Purchase>> {
        Ok(self.db.purchases_for_buyer(buyer.id)?)
    }
}
