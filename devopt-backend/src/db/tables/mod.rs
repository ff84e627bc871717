//! Database model modules - extends Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table group.

mod agents;        // ai_agents
mod apps;          // replit_apps
mod auth;          // auth_sessions
mod credentials;   // app_credentials
mod executions;    // agent_executions, agent_performance_metrics
mod listings;      // marketplace_agents
mod notifications; // notifications, system_settings
mod purchases;     // purchases, agent_analytics
mod reviews;       // reviews
mod snapshots;     // matrix_snapshots
mod users;         // users
