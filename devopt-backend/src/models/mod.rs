mod execution;
mod inventory;
mod marketplace;
mod notification;
mod session;
mod user;

pub use execution::{AgentExecution, AgentPerformanceMetrics, CostEfficiency, ExecutionStatus};
pub use inventory::{
    AgentType, AiAgent, AppCredential, MatrixSnapshot, NewAiAgent, NewAppCredential, NewTrackedApp,
    TrackedApp,
};
pub use marketplace::{
    AgentAnalyticsDay, MarketplaceAgent, MarketplaceStats, NewListing, NewReview, PriceRange,
    PricingModel, Purchase, PurchaseStatus, Review, SearchFilter,
};
pub use notification::{Notification, NotificationKind};
pub use session::Session;
pub use user::{SubscriptionTier, User, UserType};
