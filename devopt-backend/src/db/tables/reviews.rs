//! Listing reviews

use chrono::Utc;
use rusqlite::{params, Result as SqliteResult};

use crate::db::{parse_timestamp, Database};
use crate::models::Review;

impl Database {
    /// Store a review and refresh the listing rating to the mean of all its reviews
    pub fn add_review(
        &self,
        reviewer_id: i64,
        agent_id: i64,
        rating: i64,
        title: Option<&str>,
        comment: Option<&str>,
        verified_purchase: bool,
    ) -> SqliteResult<Review> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO reviews (reviewer_id, agent_id, rating, title, comment, is_verified_purchase, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![reviewer_id, agent_id, rating, title, comment, verified_purchase as i64, now.to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE marketplace_agents
             SET rating = (SELECT ROUND(AVG(rating), 2) FROM reviews WHERE agent_id = ?1)
             WHERE id = ?1",
            [agent_id],
        )?;
        tx.commit()?;

        Ok(Review {
            id,
            reviewer_id,
            agent_id,
            rating,
            title: title.map(str::to_string),
            comment: comment.map(str::to_string),
            is_verified_purchase: verified_purchase,
            created_at: now,
        })
    }

    /// Latest reviews for a listing
    pub fn list_reviews(&self, agent_id: i64, limit: usize) -> SqliteResult<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, reviewer_id, agent_id, rating, title, comment, is_verified_purchase, created_at
             FROM reviews WHERE agent_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![agent_id, limit as i64], |row| {
                let created_at: String = row.get(7)?;
                Ok(Review {
                    id: row.get(0)?,
                    reviewer_id: row.get(1)?,
                    agent_id: row.get(2)?,
                    rating: row.get(3)?,
                    title: row.get(4)?,
                    comment: row.get(5)?,
                    is_verified_purchase: row.get::<_, i64>(6)? != 0,
                    created_at: parse_timestamp(7, &created_at)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::{memory_db, new_listing, new_user};
    use crate::models::UserType;

    #[test]
    fn test_rating_is_mean_of_reviews() {
        let db = memory_db();
        let dev = new_user(&db, "dev", UserType::Developer);
        let reviewer = new_user(&db, "corp", UserType::Enterprise);
        let listing = db.create_listing(dev.id, &new_listing("Risk", "finance", 10.0), true).unwrap();

        db.add_review(reviewer.id, listing.id, 5, Some("Great"), None, true).unwrap();
        db.add_review(reviewer.id, listing.id, 4, None, Some("Solid"), false).unwrap();

        let updated = db.get_listing(listing.id).unwrap().unwrap();
        assert!((updated.rating - 4.5).abs() < 1e-9);

        let reviews = db.list_reviews(listing.id, 10).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].rating, 4);
        assert!(reviews[1].is_verified_purchase);
    }
}
