use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Administrative account seeded by the migrations; it can never be deleted.
pub const OCEAN_MASTER_ID: &str = "OCEAN_MASTER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// A diver account. Passwords are stored and served as-is; the whole row
/// goes back to the client, matching the admin console's expectations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub password: String,
    pub role: Role,
    pub credit: i64,
    pub total_bet: i64,
    pub total_win: i64,
}

/// Subset of columns the PATCH endpoint may touch.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserChanges {
    pub credit: Option<i64>,
    pub total_bet: Option<i64>,
    pub total_win: Option<i64>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.credit.is_none() && self.total_bet.is_none() && self.total_win.is_none()
    }
}

impl User {
    pub async fn list_all(db: &SqlitePool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, password, role, credit, total_bet, total_win
            FROM users
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    pub async fn find_by_id(db: &SqlitePool, id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, password, role, credit, total_bet, total_win
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new account with zero balances. Fails on a duplicate id via
    /// the primary key.
    pub async fn create(
        db: &SqlitePool,
        id: &str,
        password: &str,
        role: Role,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, password, role, credit, total_bet, total_win)
            VALUES ($1, $2, $3, 0, 0, 0)
            RETURNING id, password, role, credit, total_bet, total_win
            "#,
        )
        .bind(id)
        .bind(password)
        .bind(role)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Apply the supplied field changes, then re-read the row. Two round
    /// trips, no transaction; concurrent updates can lose writes.
    pub async fn update_fields(
        db: &SqlitePool,
        id: &str,
        changes: &UserChanges,
    ) -> anyhow::Result<Option<User>> {
        if changes.is_empty() {
            return User::find_by_id(db, id).await;
        }

        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE users SET ");
        let mut fields = qb.separated(", ");
        if let Some(credit) = changes.credit {
            fields.push("credit = ").push_bind_unseparated(credit);
        }
        if let Some(total_bet) = changes.total_bet {
            fields.push("total_bet = ").push_bind_unseparated(total_bet);
        }
        if let Some(total_win) = changes.total_win {
            fields.push("total_win = ").push_bind_unseparated(total_win);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.build().execute(db).await?;

        User::find_by_id(db, id).await
    }

    pub async fn delete(db: &SqlitePool, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    async fn test_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn migration_seeds_ocean_master() {
        let pool = test_pool().await;
        let master = User::find_by_id(&pool, OCEAN_MASTER_ID)
            .await
            .unwrap()
            .expect("seeded admin should exist");
        assert_eq!(master.role, Role::Admin);
        assert_eq!(master.credit, 0);
    }

    #[tokio::test]
    async fn create_and_find_roundtrip() {
        let pool = test_pool().await;
        let created = User::create(&pool, "pearl", "sekrit", Role::User)
            .await
            .unwrap();
        assert_eq!(created.credit, 0);
        assert_eq!(created.total_bet, 0);
        assert_eq!(created.total_win, 0);

        let found = User::find_by_id(&pool, "pearl").await.unwrap().unwrap();
        assert_eq!(found.id, "pearl");
        assert_eq!(found.password, "sekrit");
        assert_eq!(found.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let pool = test_pool().await;
        User::create(&pool, "pearl", "one", Role::User).await.unwrap();
        let err = User::create(&pool, "pearl", "two", Role::User).await;
        assert!(err.is_err());

        let kept = User::find_by_id(&pool, "pearl").await.unwrap().unwrap();
        assert_eq!(kept.password, "one");
    }

    #[tokio::test]
    async fn update_fields_is_partial() {
        let pool = test_pool().await;
        User::create(&pool, "pearl", "pw", Role::User).await.unwrap();

        let changes = UserChanges {
            credit: Some(150),
            total_bet: Some(40),
            ..Default::default()
        };
        let updated = User::update_fields(&pool, "pearl", &changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.credit, 150);
        assert_eq!(updated.total_bet, 40);
        assert_eq!(updated.total_win, 0);
    }

    #[tokio::test]
    async fn credit_may_go_negative() {
        let pool = test_pool().await;
        User::create(&pool, "pearl", "pw", Role::User).await.unwrap();

        let changes = UserChanges {
            credit: Some(-75),
            ..Default::default()
        };
        let updated = User::update_fields(&pool, "pearl", &changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.credit, -75);
    }

    #[tokio::test]
    async fn update_unknown_id_returns_none() {
        let pool = test_pool().await;
        let changes = UserChanges {
            credit: Some(10),
            ..Default::default()
        };
        let updated = User::update_fields(&pool, "ghost", &changes).await.unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went_away() {
        let pool = test_pool().await;
        User::create(&pool, "pearl", "pw", Role::User).await.unwrap();

        assert!(User::delete(&pool, "pearl").await.unwrap());
        assert!(!User::delete(&pool, "pearl").await.unwrap());
        assert!(User::find_by_id(&pool, "pearl").await.unwrap().is_none());
    }
}
