//! Shared builders for database tests

use crate::db::Database;
use crate::models::{AgentType, NewAiAgent, NewListing, NewTrackedApp, PricingModel, SubscriptionTier, User, UserType};

pub(crate) fn memory_db() -> Database {
    Database::new(":memory:").unwrap()
}

pub(crate) fn new_app(repl_id: &str, name: &str, language: &str) -> NewTrackedApp {
    NewTrackedApp {
        repl_id: repl_id.to_string(),
        name: name.to_string(),
        url: None,
        language: Some(language.to_string()),
        description: None,
        file_count: 10,
        size_kb: 128.0,
        last_modified: None,
    }
}

pub(crate) fn new_agent(app_id: i64, agent_type: AgentType, name: &str) -> NewAiAgent {
    NewAiAgent {
        app_id,
        agent_type,
        agent_name: name.to_string(),
        model_name: None,
        role_description: None,
        effectiveness_score: 0.8,
        cost_estimate: 5.0,
        features_used: Vec::new(),
        api_endpoints: Vec::new(),
    }
}

pub(crate) fn new_user(db: &Database, username: &str, user_type: UserType) -> User {
    db.create_user(
        username,
        &format!("{}@example.com", username),
        "salt$hash",
        None,
        user_type,
        SubscriptionTier::Starter,
    )
    .unwrap()
}

pub(crate) fn new_listing(name: &str, category: &str, price: f64) -> NewListing {
    NewListing {
        name: name.to_string(),
        description: format!("{} for enterprise teams", name),
        category: category.to_string(),
        industry: "general".to_string(),
        pricing_model: PricingModel::Subscription,
        price,
        version: "1.0.0".to_string(),
        tech_stack: Vec::new(),
        compliance_standards: Vec::new(),
        security_features: Vec::new(),
    }
}
