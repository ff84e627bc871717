//! Sample accounts and listings for a fresh marketplace

use crate::auth::{generate_password, hash_password};
use crate::db::Database;
use crate::error::AppResult;
use crate::models::{NewListing, PricingModel, SubscriptionTier, UserType};

struct SampleListing {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    industry: &'static str,
    pricing_model: PricingModel,
    price: f64,
    rating: f64,
    download_count: i64,
    tech_stack: &'static [&'static str],
    compliance_standards: &'static [&'static str],
    security_features: &'static [&'static str],
}

const SAMPLE_LISTINGS: &[SampleListing] = &[
    SampleListing {
        name: "Financial Risk Analyzer Pro",
        description: "Advanced AI agent for real-time financial risk assessment and regulatory compliance monitoring",
        category: "finance",
        industry: "banking",
        pricing_model: PricingModel::Subscription,
        price: 5000.0,
        rating: 4.8,
        download_count: 156,
        tech_stack: &["Python", "TensorFlow", "FastAPI", "PostgreSQL"],
        compliance_standards: &["SOX", "GDPR", "PCI-DSS"],
        security_features: &["End-to-end encryption", "Multi-factor authentication", "Audit logging"],
    },
    SampleListing {
        name: "Healthcare Data Intelligence",
        description: "HIPAA-compliant AI agent for medical record processing and patient outcome prediction",
        category: "healthcare",
        industry: "healthcare",
        pricing_model: PricingModel::OneTime,
        price: 12000.0,
        rating: 4.9,
        download_count: 89,
        tech_stack: &["Python", "PyTorch", "Flask", "MongoDB"],
        compliance_standards: &["HIPAA", "GDPR", "FDA"],
        security_features: &["PHI encryption", "Access controls", "Compliance monitoring"],
    },
    SampleListing {
        name: "Supply Chain Optimizer",
        description: "AI-powered supply chain optimization with predictive analytics and automated procurement",
        category: "operations",
        industry: "manufacturing",
        pricing_model: PricingModel::UsageBased,
        price: 0.50,
        rating: 4.6,
        download_count: 234,
        tech_stack: &["Python", "Scikit-learn", "Django", "Redis"],
        compliance_standards: &["ISO 27001", "GDPR"],
        security_features: &["API authentication", "Data encryption", "Rate limiting"],
    },
];

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Create the sample users and verified listings. Does nothing unless the
/// database has no users yet; returns whether anything was seeded.
pub fn seed_sample_data(db: &Database, admin_password: Option<&str>) -> AppResult<bool> {
    if db.count_users()? > 0 {
        log::debug!("[MARKETPLACE] Users already exist, skipping sample data");
        return Ok(false);
    }

    let admin_password = admin_password.map(str::to_string).unwrap_or_else(generate_password);
    db.create_user(
        "admin",
        "admin@agentmarketplace.com",
        &hash_password(&admin_password),
        None,
        UserType::Admin,
        SubscriptionTier::Enterprise,
    )?;
    let developer = db.create_user(
        "ai_developer",
        "dev@company.com",
        &hash_password(&generate_password()),
        Some("AI Innovations Inc"),
        UserType::Developer,
        SubscriptionTier::Professional,
    )?;
    db.create_user(
        "fortune500",
        "cto@fortune500.com",
        &hash_password(&generate_password()),
        Some("Fortune 500 Corp"),
        UserType::Enterprise,
        SubscriptionTier::Enterprise,
    )?;

    for sample in SAMPLE_LISTINGS {
        let listing = db.create_listing(
            developer.id,
            &NewListing {
                name: sample.name.to_string(),
                description: sample.description.to_string(),
                category: sample.category.to_string(),
                industry: sample.industry.to_string(),
                pricing_model: sample.pricing_model,
                price: sample.price,
                version: "1.0.0".to_string(),
                tech_stack: owned(sample.tech_stack),
                compliance_standards: owned(sample.compliance_standards),
                security_features: owned(sample.security_features),
            },
            true,
        )?;
        db.set_listing_counters(listing.id, sample.rating, sample.download_count)?;
    }

    log::info!(
        "[MARKETPLACE] Seeded 3 sample users and {} listings",
        SAMPLE_LISTINGS.len()
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::db::fixtures::memory_db;
    use crate::models::{PriceRange, SearchFilter};

    #[test]
    fn test_seed_runs_once() {
        let db = memory_db();
        assert!(seed_sample_data(&db, Some("letmein-admin")).unwrap());
        assert!(!seed_sample_data(&db, None).unwrap());
        assert_eq!(db.count_users().unwrap(), 3);

        let admin = db.get_user_by_username("admin").unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(verify_password("letmein-admin", &admin.password_hash));
        assert!(!verify_password("admin123", &admin.password_hash));

        let fortune = db.get_user_by_username("fortune500").unwrap().unwrap();
        assert_eq!(fortune.subscription_tier, SubscriptionTier::Enterprise);
        assert_eq!(fortune.company_name.as_deref(), Some("Fortune 500 Corp"));
    }

    #[test]
    fn test_seeded_listings_are_searchable() {
        let db = memory_db();
        seed_sample_data(&db, None).unwrap();

        let all = db.search_listings(&SearchFilter::default()).unwrap();
        let names: Vec<_> = all.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Healthcare Data Intelligence", "Financial Risk Analyzer Pro", "Supply Chain Optimizer"]
        );

        let high = db
            .search_listings(&SearchFilter {
                price_range: Some(PriceRange::High),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].download_count, 89);
    }

    #[test]
    fn test_seed_skipped_when_users_exist() {
        let db = memory_db();
        crate::db::fixtures::new_user(&db, "someone", UserType::Enterprise);
        assert!(!seed_sample_data(&db, None).unwrap());
        assert!(db.get_user_by_username("admin").unwrap().is_none());
    }
}
