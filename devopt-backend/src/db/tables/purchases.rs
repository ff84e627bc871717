//! Purchases and the per-day listing analytics they feed

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{parse_date, parse_timestamp, Database};
use crate::models::{AgentAnalyticsDay, Purchase, PurchaseStatus};

const PURCHASE_COLUMNS: &str =
    "id, buyer_id, agent_id, amount_paid, license_type, status, payment_reference, license_key, purchased_at";

fn row_to_purchase(row: &Row) -> SqliteResult<Purchase> {
    let status: String = row.get(5)?;
    let purchased_at: String = row.get(8)?;
    Ok(Purchase {
        id: row.get(0)?,
        buyer_id: row.get(1)?,
        agent_id: row.get(2)?,
        amount_paid: row.get(3)?,
        license_type: row.get(4)?,
        status: PurchaseStatus::from_str(&status).unwrap_or(PurchaseStatus::Active),
        payment_reference: row.get(6)?,
        license_key: row.get(7)?,
        purchased_at: parse_timestamp(8, &purchased_at)?,
    })
}

fn row_to_analytics(row: &Row) -> SqliteResult<AgentAnalyticsDay> {
    let date: String = row.get(1)?;
    Ok(AgentAnalyticsDay {
        agent_id: row.get(0)?,
        date: parse_date(1, &date)?,
        views: row.get(2)?,
        downloads: row.get(3)?,
        revenue: row.get(4)?,
    })
}

impl Database {
    /// Record a completed sale in one transaction: the purchase row, the listing's
    /// download and revenue counters, and the day's analytics.
    ///
    /// Returns None when the buyer or the listing does not exist. A payment
    /// reference that is already recorded returns the existing purchase unchanged.
    pub fn record_purchase(
        &self,
        buyer_id: i64,
        agent_id: i64,
        payment_reference: Option<&str>,
        license_key: &str,
        day: NaiveDate,
    ) -> SqliteResult<Option<Purchase>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        if let Some(reference) = payment_reference {
            let existing = tx
                .query_row(
                    &format!("SELECT {} FROM purchases WHERE payment_reference = ?1", PURCHASE_COLUMNS),
                    [reference],
                    row_to_purchase,
                )
                .optional()?;
            if existing.is_some() {
                return Ok(existing);
            }
        }

        let buyer_exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            [buyer_id],
            |row| row.get(0),
        )?;
        let price: Option<f64> = tx
            .query_row(
                "SELECT price FROM marketplace_agents WHERE id = ?1 AND is_active = 1",
                [agent_id],
                |row| row.get(0),
            )
            .optional()?;

        let price = match (buyer_exists > 0, price) {
            (true, Some(price)) => price,
            _ => return Ok(None),
        };

        tx.execute(
            "INSERT INTO purchases (buyer_id, agent_id, amount_paid, license_type, status, payment_reference,
                                    license_key, purchased_at)
             VALUES (?1, ?2, ?3, 'enterprise', 'active', ?4, ?5, ?6)",
            params![buyer_id, agent_id, price, payment_reference, license_key, Utc::now().to_rfc3339()],
        )?;
        let purchase_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE marketplace_agents
             SET download_count = download_count + 1, revenue = revenue + ?1, updated_at = ?2
             WHERE id = ?3",
            params![price, Utc::now().to_rfc3339(), agent_id],
        )?;

        tx.execute(
            "INSERT INTO agent_analytics (agent_id, date, views, downloads, revenue) VALUES (?1, ?2, 0, 1, ?3)
             ON CONFLICT(agent_id, date) DO UPDATE SET
                downloads = downloads + 1,
                revenue = revenue + excluded.revenue",
            params![agent_id, day.format("%Y-%m-%d").to_string(), price],
        )?;

        let purchase = tx.query_row(
            &format!("SELECT {} FROM purchases WHERE id = ?1", PURCHASE_COLUMNS),
            [purchase_id],
            row_to_purchase,
        )?;
        tx.commit()?;

        Ok(Some(purchase))
    }

    pub fn has_active_purchase(&self, buyer_id: i64, agent_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM purchases WHERE buyer_id = ?1 AND agent_id = ?2 AND status = 'active'",
            [buyer_id, agent_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn purchases_for_buyer(&self, buyer_id: i64) -> SqliteResult<Vec<Purchase>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM purchases WHERE buyer_id = ?1 ORDER BY purchased_at DESC, id DESC",
            PURCHASE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([buyer_id], row_to_purchase)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Count a detail page view for the day
    pub fn record_listing_view(&self, agent_id: i64, day: NaiveDate) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO agent_analytics (agent_id, date, views, downloads, revenue) VALUES (?1, ?2, 1, 0, 0)
             ON CONFLICT(agent_id, date) DO UPDATE SET views = views + 1",
            params![agent_id, day.format("%Y-%m-%d").to_string()],
        )?;
        Ok(())
    }

    /// Most recent `limit` days of analytics for a listing, oldest first
    pub fn listing_analytics(&self, agent_id: i64, limit: usize) -> SqliteResult<Vec<AgentAnalyticsDay>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT agent_id, date, views, downloads, revenue FROM agent_analytics
             WHERE agent_id = ?1 ORDER BY date DESC LIMIT ?2",
        )?;
        let mut rows = stmt
            .query_map(params![agent_id, limit as i64], row_to_analytics)?
            .collect::<SqliteResult<Vec<_>>>()?;
        rows.reverse();
        Ok(rows)
    }

    /// Analytics rows on or after `since` for every listing a developer owns
    pub fn developer_analytics(&self, developer_id: i64, since: NaiveDate) -> SqliteResult<Vec<AgentAnalyticsDay>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT a.agent_id, a.date, a.views, a.downloads, a.revenue FROM agent_analytics a
             JOIN marketplace_agents m ON m.id = a.agent_id
             WHERE m.developer_id = ?1 AND a.date >= ?2
             ORDER BY a.date, a.agent_id",
        )?;
        let rows = stmt
            .query_map(
                params![developer_id, since.format("%Y-%m-%d").to_string()],
                row_to_analytics,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::{memory_db, new_listing, new_user};
    use crate::models::UserType;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_purchase_updates_counters_and_analytics() {
        let db = memory_db();
        let dev = new_user(&db, "dev", UserType::Developer);
        let buyer = new_user(&db, "corp", UserType::Enterprise);
        let listing = db.create_listing(dev.id, &new_listing("Risk", "finance", 5000.0), true).unwrap();

        let purchase = db
            .record_purchase(buyer.id, listing.id, Some("pi_1"), "AMP-0000000000000001", day(3))
            .unwrap()
            .unwrap();
        assert_eq!(purchase.amount_paid, 5000.0);
        assert_eq!(purchase.license_type, "enterprise");
        db.record_purchase(buyer.id, listing.id, None, "AMP-0000000000000002", day(3))
            .unwrap()
            .unwrap();

        let updated = db.get_listing(listing.id).unwrap().unwrap();
        assert_eq!(updated.download_count, 2);
        assert_eq!(updated.revenue, 10000.0);

        let analytics = db.listing_analytics(listing.id, 30).unwrap();
        assert_eq!(analytics.len(), 1);
        assert_eq!(analytics[0].downloads, 2);
        assert_eq!(analytics[0].revenue, 10000.0);
        assert!(db.has_active_purchase(buyer.id, listing.id).unwrap());
        assert_eq!(db.purchases_for_buyer(buyer.id).unwrap().len(), 2);
    }

    #[test]
    fn test_repeated_payment_reference_recorded_once() {
        let db = memory_db();
        let dev = new_user(&db, "dev", UserType::Developer);
        let buyer = new_user(&db, "corp", UserType::Enterprise);
        let listing = db.create_listing(dev.id, &new_listing("Risk", "finance", 250.0), true).unwrap();

        let first = db
            .record_purchase(buyer.id, listing.id, Some("pi_7"), "AMP-00000000000000A1", day(3))
            .unwrap()
            .unwrap();
        let again = db
            .record_purchase(buyer.id, listing.id, Some("pi_7"), "AMP-00000000000000A2", day(3))
            .unwrap()
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.license_key, "AMP-00000000000000A1");

        let updated = db.get_listing(listing.id).unwrap().unwrap();
        assert_eq!(updated.download_count, 1);
        assert_eq!(updated.revenue, 250.0);
        assert_eq!(db.listing_analytics(listing.id, 30).unwrap()[0].downloads, 1);
    }

    #[test]
    fn test_purchase_unknown_parties() {
        let db = memory_db();
        let dev = new_user(&db, "dev", UserType::Developer);
        let listing = db.create_listing(dev.id, &new_listing("Risk", "finance", 10.0), true).unwrap();
        assert!(db.record_purchase(999, listing.id, None, "AMP-A", day(1)).unwrap().is_none());
        assert!(db.record_purchase(dev.id, 999, None, "AMP-B", day(1)).unwrap().is_none());
        assert_eq!(db.get_listing(listing.id).unwrap().unwrap().download_count, 0);
    }

    #[test]
    fn test_views_and_history_window() {
        let db = memory_db();
        let dev = new_user(&db, "dev", UserType::Developer);
        let listing = db.create_listing(dev.id, &new_listing("Risk", "finance", 10.0), true).unwrap();
        for d in 1..=5 {
            db.record_listing_view(listing.id, day(d)).unwrap();
        }
        db.record_listing_view(listing.id, day(5)).unwrap();

        let last_three = db.listing_analytics(listing.id, 3).unwrap();
        let dates: Vec<u32> = last_three.iter().map(|a| chrono::Datelike::day(&a.date)).collect();
        assert_eq!(dates, vec![3, 4, 5]);
        assert_eq!(last_three[2].views, 2);

        assert_eq!(db.developer_analytics(dev.id, day(4)).unwrap().len(), 2);
    }
}
