//! Marketplace listing database operations

use chrono::{NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{parse_json_list, parse_timestamp, Database};
use crate::models::{MarketplaceAgent, MarketplaceStats, NewListing, PricingModel, SearchFilter, UserType};

pub(super) const LISTING_COLUMNS: &str = "m.id, m.name, m.description, m.category, m.industry, m.pricing_model, \
                                          m.price, m.version, m.developer_id, m.is_active, m.is_verified, \
                                          m.download_count, m.rating, m.revenue, m.tech_stack, \
                                          m.compliance_standards, m.security_features, m.created_at, m.updated_at";

pub(super) fn row_to_listing(row: &Row) -> SqliteResult<MarketplaceAgent> {
    let pricing_model: String = row.get(5)?;
    let tech_stack: String = row.get(14)?;
    let compliance: String = row.get(15)?;
    let security: String = row.get(16)?;
    let created_at: String = row.get(17)?;
    let updated_at: String = row.get(18)?;

    Ok(MarketplaceAgent {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        industry: row.get(4)?,
        pricing_model: PricingModel::from_str(&pricing_model).unwrap_or(PricingModel::OneTime),
        price: row.get(6)?,
        version: row.get(7)?,
        developer_id: row.get(8)?,
        is_active: row.get::<_, i64>(9)? != 0,
        is_verified: row.get::<_, i64>(10)? != 0,
        download_count: row.get(11)?,
        rating: row.get(12)?,
        revenue: row.get(13)?,
        tech_stack: parse_json_list(&tech_stack),
        compliance_standards: parse_json_list(&compliance),
        security_features: parse_json_list(&security),
        created_at: parse_timestamp(17, &created_at)?,
        updated_at: parse_timestamp(18, &updated_at)?,
    })
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

impl Database {
    /// Create a listing. New listings start unverified unless `verified` is set.
    pub fn create_listing(
        &self,
        developer_id: i64,
        listing: &NewListing,
        verified: bool,
    ) -> SqliteResult<MarketplaceAgent> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO marketplace_agents (name, description, category, industry, pricing_model, price,
                                             version, developer_id, is_active, is_verified, tech_stack,
                                             compliance_standards, security_features, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                listing.name,
                listing.description,
                listing.category,
                listing.industry,
                listing.pricing_model.as_str(),
                listing.price,
                listing.version,
                developer_id,
                verified as i64,
                json_list(&listing.tech_stack),
                json_list(&listing.compliance_standards),
                json_list(&listing.security_features),
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM marketplace_agents m WHERE m.id = ?1", LISTING_COLUMNS),
            [id],
            row_to_listing,
        )
    }

    pub fn get_listing(&self, id: i64) -> SqliteResult<Option<MarketplaceAgent>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM marketplace_agents m WHERE m.id = ?1", LISTING_COLUMNS),
            [id],
            row_to_listing,
        )
        .optional()
    }

    /// Overwrite seed-style counters on a listing (rating and downloads)
    pub fn set_listing_counters(&self, id: i64, rating: f64, download_count: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE marketplace_agents SET rating = ?1, download_count = ?2 WHERE id = ?3",
            params![rating, download_count, id],
        )?;
        Ok(rows > 0)
    }

    pub fn set_listing_verified(&self, id: i64, verified: bool) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE marketplace_agents SET is_verified = ?1, updated_at = ?2 WHERE id = ?3",
            params![verified as i64, Utc::now().to_rfc3339(), id],
        )?;
        Ok(rows > 0)
    }

    /// Active, verified listings matching the filter, best rated first
    pub fn search_listings(&self, filter: &SearchFilter) -> SqliteResult<Vec<MarketplaceAgent>> {
        let mut clauses = vec!["m.is_active = 1".to_string(), "m.is_verified = 1".to_string()];
        let mut values: Vec<Value> = Vec::new();

        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            values.push(Value::Text(query.to_string()));
            let n = values.len();
            clauses.push(format!(
                "(m.name LIKE '%' || ?{n} || '%' OR m.description LIKE '%' || ?{n} || '%')"
            ));
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            values.push(Value::Text(category.to_string()));
            clauses.push(format!("m.category = ?{}", values.len()));
        }
        if let Some(industry) = filter.industry.as_deref().filter(|i| !i.is_empty()) {
            values.push(Value::Text(industry.to_string()));
            clauses.push(format!("m.industry = ?{}", values.len()));
        }
        if let Some(rating_min) = filter.rating_min.filter(|r| *r > 0.0) {
            values.push(Value::Real(rating_min));
            clauses.push(format!("m.rating >= ?{}", values.len()));
        }
        if let Some(range) = filter.price_range {
            clauses.push(format!("m.{}", range.sql_clause()));
        }

        let sql = format!(
            "SELECT {} FROM marketplace_agents m WHERE {} ORDER BY m.rating DESC, m.download_count DESC, m.id",
            LISTING_COLUMNS,
            clauses.join(" AND ")
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), row_to_listing)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Listings with the most downloads recorded on or after `since`
    pub fn trending_listings(&self, since: NaiveDate, limit: usize) -> SqliteResult<Vec<MarketplaceAgent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM marketplace_agents m
             JOIN agent_analytics a ON a.agent_id = m.id
             WHERE a.date >= ?1 AND m.is_active = 1 AND m.is_verified = 1
             GROUP BY m.id
             ORDER BY SUM(a.downloads) DESC, m.rating DESC, m.id
             LIMIT ?2",
            LISTING_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                params![since.format("%Y-%m-%d").to_string(), limit as i64],
                row_to_listing,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Personalised picks: unbought listings in categories the user already buys from,
    /// or the top rated listings for users without purchases
    pub fn recommended_listings(&self, user_id: i64, limit: usize) -> SqliteResult<Vec<MarketplaceAgent>> {
        let conn = self.conn.lock().unwrap();
        let has_history: i64 = conn.query_row(
            "SELECT COUNT(*) FROM purchases WHERE buyer_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        let sql = if has_history > 0 {
            format!(
                "SELECT {} FROM marketplace_agents m
                 WHERE m.is_active = 1 AND m.is_verified = 1
                   AND m.category IN (
                       SELECT DISTINCT l.category FROM purchases p
                       JOIN marketplace_agents l ON l.id = p.agent_id
                       WHERE p.buyer_id = ?1)
                   AND m.id NOT IN (SELECT agent_id FROM purchases WHERE buyer_id = ?1)
                 ORDER BY m.rating DESC, m.id
                 LIMIT ?2",
                LISTING_COLUMNS
            )
        } else {
            // SQLite sizes parameters by the highest index, so the unused ?1 still binds
            format!(
                "SELECT {} FROM marketplace_agents m
                 WHERE m.is_active = 1 AND m.is_verified = 1
                 ORDER BY m.rating DESC, m.id
                 LIMIT ?2",
                LISTING_COLUMNS
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], row_to_listing)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn listings_for_developer(&self, developer_id: i64) -> SqliteResult<Vec<MarketplaceAgent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM marketplace_agents m WHERE m.developer_id = ?1 ORDER BY m.id",
            LISTING_COLUMNS
        ))?;
        let rows = stmt
            .query_map([developer_id], row_to_listing)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn marketplace_stats(&self) -> SqliteResult<MarketplaceStats> {
        let (total_agents, total_downloads, total_revenue) = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(download_count), 0), COALESCE(SUM(revenue), 0.0)
                 FROM marketplace_agents WHERE is_active = 1 AND is_verified = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?
        };

        Ok(MarketplaceStats {
            total_agents,
            total_developers: self.count_users_by_type(UserType::Developer)?,
            total_enterprises: self.count_users_by_type(UserType::Enterprise)?,
            total_downloads,
            total_revenue,
        })
    }
}
