use directories::ProjectDirs;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use std::path::{Path, PathBuf};

use sph_core::{ContactInput, ProfileInput, SmsInput, SmsSettingsInput};

use crate::error::{DbError, Result};
use crate::models::{
    Contact, ContactGroup, FlashLevel, FlashMessage, Profile, Sms, SmsSettings, User,
};
use crate::password;
use crate::schema::SCHEMA;

/// Rows per multi-row INSERT; keeps bound parameters well below SQLite's limit.
const INSERT_CHUNK: usize = 1000;
const SMS_SELECT: &str = "SELECT m.id, m.category_id, g.name AS group_name, m.message, m.created_at
     FROM sph_messages m JOIN contact_groups g ON g.id = m.category_id";

pub struct SphDb {
    pool: Pool<Sqlite>,
}

impl SphDb {
    /// Opens the database in the platform data directory.
    pub async fn new() -> Result<Self> {
        let db_path = Self::default_path()?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Self::new_with_path(&db_path).await?;
        tracing::info!("Database initialized at: {}", db_path.display());
        Ok(db)
    }

    pub async fn new_with_path(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        Self::connect(SqlitePoolOptions::new(), options).await
    }

    /// A private in-memory database. The pool keeps exactly one connection
    /// alive since every new SQLite memory connection is a fresh database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        Self::connect(pool, options).await
    }

    async fn connect(pool: SqlitePoolOptions, options: SqliteConnectOptions) -> Result<Self> {
        let pool = pool.connect_with(options).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "sph", "sph").ok_or(DbError::NoDataDir)?;
        Ok(dirs.data_dir().join("sph.db"))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ── Users ────────────────────────────────────────────────────────────

    pub async fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let hash = password::hash_password(password)?;
        let id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(hash)
        .bind(timestamp())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        tracing::info!(user_id = id, username, "User created");
        self.get_user(id).await
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("user {id}")))
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?)
    }

    /// Returns the user only when the password matches.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_user(username).await? else {
            return Ok(None);
        };
        if password::verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            tracing::debug!(username, "Password mismatch");
            Ok(None)
        }
    }

    pub async fn set_password(&self, user_id: i64, password: &str) -> Result<()> {
        let hash = password::hash_password(password)?;
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
            .bind(is_admin)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("user {user_id}")));
        }
        tracing::info!(user_id, is_admin, "Admin flag changed");
        Ok(())
    }

    // ── Sessions & flash messages ────────────────────────────────────────

    pub async fn create_session(&self, user_id: i64) -> Result<String> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(timestamp())
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    /// Resolves a session token younger than `max_age_secs`.
    pub async fn session_user(&self, token: &str, max_age_secs: i64) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u JOIN sessions s ON s.user_id = u.id
             WHERE s.token = ? AND s.created_at >= ?",
        )
        .bind(token)
        .bind(timestamp() - max_age_secs)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_expired_sessions(&self, max_age_secs: i64) -> Result<u64> {
        Ok(sqlx::query("DELETE FROM sessions WHERE created_at < ?")
            .bind(timestamp() - max_age_secs)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    pub async fn push_flash(&self, token: &str, level: FlashLevel, message: &str) -> Result<()> {
        sqlx::query("INSERT INTO flash_messages (session_token, level, message) VALUES (?, ?, ?)")
            .bind(token)
            .bind(level.as_str())
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns and clears the queued messages, oldest first.
    pub async fn take_flashes(&self, token: &str) -> Result<Vec<FlashMessage>> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT level, message FROM flash_messages WHERE session_token = ? ORDER BY id",
        )
        .bind(token)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM flash_messages WHERE session_token = ?")
            .bind(token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(rows.into_iter().map(FlashMessage::from_row).collect())
    }

    // ── Profiles ─────────────────────────────────────────────────────────

    /// Fetches the profile, creating an empty one on first access.
    pub async fn profile(&self, user_id: i64) -> Result<Profile> {
        sqlx::query("INSERT OR IGNORE INTO profiles (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Writes the names to the user row and the rest to the profile.
    pub async fn save_profile(&self, user_id: i64, input: &ProfileInput) -> Result<Profile> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE users SET first_name = ?, last_name = ? WHERE id = ?")
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("user {user_id}")));
        }
        sqlx::query(
            r#"INSERT INTO profiles (user_id, public_email, institution, location)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                 public_email = excluded.public_email,
                 institution = excluded.institution,
                 location = excluded.location"#,
        )
        .bind(user_id)
        .bind(&input.public_email)
        .bind(&input.institution)
        .bind(&input.location)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.profile(user_id).await
    }

    // ── Contact groups ───────────────────────────────────────────────────

    pub async fn list_groups(&self, user_id: i64) -> Result<Vec<ContactGroup>> {
        Ok(sqlx::query_as::<_, ContactGroup>(
            "SELECT * FROM contact_groups WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count_groups(&self, user_id: i64) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_groups WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Ids of the user's groups: the valid choices for a contact category.
    pub async fn group_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        Ok(
            sqlx::query_scalar("SELECT id FROM contact_groups WHERE user_id = ? ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn get_group(&self, user_id: i64, id: i64) -> Result<ContactGroup> {
        sqlx::query_as::<_, ContactGroup>(
            "SELECT * FROM contact_groups WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("group {id}")))
    }

    /// Whether another of the user's groups already uses `name`.
    pub async fn group_name_taken(
        &self,
        user_id: i64,
        name: &str,
        except_id: Option<i64>,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contact_groups WHERE user_id = ? AND name = ? AND id != ?",
        )
        .bind(user_id)
        .bind(name)
        .bind(except_id.unwrap_or(-1))
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn create_group(&self, user_id: i64, name: &str) -> Result<ContactGroup> {
        let id = sqlx::query("INSERT INTO contact_groups (user_id, name, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(name)
            .bind(timestamp())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        self.get_group(user_id, id).await
    }

    pub async fn update_group(&self, user_id: i64, id: i64, name: &str) -> Result<ContactGroup> {
        let result = sqlx::query("UPDATE contact_groups SET name = ? WHERE id = ? AND user_id = ?")
            .bind(name)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("group {id}")));
        }
        self.get_group(user_id, id).await
    }

    /// Deleting a group also deletes its contacts and SMS history.
    pub async fn delete_group(&self, user_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM contact_groups WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("group {id}")));
        }
        Ok(())
    }

    pub async fn count_group_contacts(&self, user_id: i64, group_id: i64) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM contacts WHERE user_id = ? AND category_id = ?",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?)
    }

    // ── Contacts ─────────────────────────────────────────────────────────

    pub async fn list_contacts(&self, user_id: i64) -> Result<Vec<Contact>> {
        Ok(sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count_contacts(&self, user_id: i64) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    pub async fn get_contact(&self, user_id: i64, id: i64) -> Result<Contact> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("contact {id}")))
    }

    pub async fn create_contact(&self, user_id: i64, input: &ContactInput) -> Result<Contact> {
        let id = sqlx::query(
            r#"INSERT INTO contacts (user_id, first_name, last_name, email, mobile, id_number, category_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.mobile)
        .bind(input.id_number.as_deref())
        .bind(input.category_id)
        .bind(timestamp())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        self.get_contact(user_id, id).await
    }

    pub async fn update_contact(
        &self,
        user_id: i64,
        id: i64,
        input: &ContactInput,
    ) -> Result<Contact> {
        let result = sqlx::query(
            r#"UPDATE contacts SET first_name = ?, last_name = ?, email = ?, mobile = ?,
                 id_number = ?, category_id = ?
               WHERE id = ? AND user_id = ?"#,
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.mobile)
        .bind(input.id_number.as_deref())
        .bind(input.category_id)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("contact {id}")));
        }
        self.get_contact(user_id, id).await
    }

    pub async fn delete_contact(&self, user_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("contact {id}")));
        }
        Ok(())
    }

    /// Replaces every contact of the user with `contacts` in one transaction.
    /// Any constraint violation rolls back the delete as well.
    pub async fn replace_contacts(&self, user_id: i64, contacts: &[ContactInput]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM contacts WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        insert_contacts(&mut tx, user_id, contacts).await?;
        tx.commit().await?;

        tracing::info!(user_id, deleted, inserted = contacts.len(), "Contacts replaced");
        Ok(contacts.len())
    }

    /// Appends `contacts` in one transaction; all or nothing.
    pub async fn import_contacts(&self, user_id: i64, contacts: &[ContactInput]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        insert_contacts(&mut tx, user_id, contacts).await?;
        tx.commit().await?;

        tracing::info!(user_id, imported = contacts.len(), "Contacts imported");
        Ok(contacts.len())
    }

    /// Case-insensitive match of every word of `term` against name, mobile
    /// or email of the user's own contacts. Folding happens here rather than
    /// in SQL since SQLite's `LIKE` and `lower()` only fold ASCII.
    pub async fn search_contacts(&self, user_id: i64, term: &str) -> Result<Vec<Contact>> {
        let words: Vec<String> = term.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let contacts = self.list_contacts(user_id).await?;
        Ok(contacts
            .into_iter()
            .filter(|contact| {
                let fields = [
                    contact.first_name.to_lowercase(),
                    contact.last_name.to_lowercase(),
                    contact.mobile.to_lowercase(),
                    contact.email.to_lowercase(),
                ];
                words
                    .iter()
                    .all(|word| fields.iter().any(|field| field.contains(word.as_str())))
            })
            .collect())
    }

    // ── SMS ──────────────────────────────────────────────────────────────

    pub async fn list_sms(&self, user_id: i64) -> Result<Vec<Sms>> {
        Ok(sqlx::query_as::<_, Sms>(&format!(
            "{SMS_SELECT} WHERE g.user_id = ? ORDER BY m.created_at DESC, m.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn create_sms(&self, user_id: i64, input: &SmsInput) -> Result<Sms> {
        let group = self.get_group(user_id, input.category_id).await?;
        let id = sqlx::query("INSERT INTO sph_messages (category_id, message, created_at) VALUES (?, ?, ?)")
            .bind(group.id)
            .bind(&input.message)
            .bind(timestamp())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        tracing::info!(user_id, sms_id = id, group = %group.name, "SMS recorded");
        Ok(sqlx::query_as::<_, Sms>(&format!("{SMS_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn sms_settings(&self) -> Result<Option<SmsSettings>> {
        Ok(sqlx::query_as::<_, SmsSettings>(
            "SELECT user_name, api_key, created_at FROM sph_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn save_sms_settings(&self, input: &SmsSettingsInput) -> Result<SmsSettings> {
        sqlx::query(
            r#"INSERT INTO sph_settings (id, user_name, api_key, created_at) VALUES (1, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 user_name = excluded.user_name,
                 api_key = excluded.api_key"#,
        )
        .bind(&input.user_name)
        .bind(&input.api_key)
        .bind(timestamp())
        .execute(&self.pool)
        .await?;

        self.sms_settings()
            .await?
            .ok_or_else(|| DbError::NotFound("sms settings".into()))
    }
}

async fn insert_contacts(
    conn: &mut SqliteConnection,
    user_id: i64,
    contacts: &[ContactInput],
) -> Result<()> {
    let now = timestamp();
    for chunk in contacts.chunks(INSERT_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO contacts (user_id, first_name, last_name, email, mobile, id_number, category_id, created_at) ",
        );
        qb.push_values(chunk, |mut row, contact| {
            row.push_bind(user_id)
                .push_bind(contact.first_name.as_str())
                .push_bind(contact.last_name.as_str())
                .push_bind(contact.email.as_str())
                .push_bind(contact.mobile.as_str())
                .push_bind(contact.id_number.as_deref())
                .push_bind(contact.category_id)
                .push_bind(now);
        });
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

fn timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_WEEKS: i64 = 14 * 24 * 3600;

    async fn setup() -> (SphDb, User, ContactGroup) {
        let db = SphDb::in_memory().await.unwrap();
        let user = db.create_user("jane", "jane@example.com", "correct horse").await.unwrap();
        let group = db.create_group(user.id, "Parents").await.unwrap();
        (db, user, group)
    }

    fn contact(name: &str, mobile: &str, category_id: i64) -> ContactInput {
        ContactInput {
            first_name: name.into(),
            last_name: String::new(),
            email: String::new(),
            mobile: mobile.into(),
            id_number: None,
            category_id,
        }
    }

    #[tokio::test]
    async fn test_replace_drops_previous_contacts() {
        let (db, user, group) = setup().await;
        for (i, mobile) in ["0700000001", "0700000002", "0700000003"].iter().enumerate() {
            db.create_contact(user.id, &contact(&format!("Old{i}"), mobile, group.id))
                .await
                .unwrap();
        }

        let batch = [
            contact("Jane", "0712345678", group.id),
            contact("John", "0722000111", group.id),
        ];
        assert_eq!(db.replace_contacts(user.id, &batch).await.unwrap(), 2);

        let contacts = db.list_contacts(user.id).await.unwrap();
        let mut names: Vec<&str> = contacts.iter().map(|c| c.first_name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Jane", "John"]);
    }

    #[tokio::test]
    async fn test_replace_rolls_back_on_integrity_error() {
        let (db, user, group) = setup().await;
        let original = db
            .create_contact(user.id, &contact("Old", "0700000001", group.id))
            .await
            .unwrap();

        let batch = [
            contact("Jane", "0712345678", group.id),
            contact("Twin", "0712345678", group.id),
        ];
        let err = db.replace_contacts(user.id, &batch).await.unwrap_err();
        assert!(err.is_integrity(), "unexpected error: {err}");

        let contacts = db.list_contacts(user.id).await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, original.id);
    }

    #[tokio::test]
    async fn test_replace_with_empty_batch_clears_everything() {
        let (db, user, group) = setup().await;
        db.create_contact(user.id, &contact("Old", "0700000001", group.id))
            .await
            .unwrap();
        assert_eq!(db.replace_contacts(user.id, &[]).await.unwrap(), 0);
        assert_eq!(db.count_contacts(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resubmitting_creates_new_identities() {
        let (db, user, group) = setup().await;
        let batch = [contact("Jane", "0712345678", group.id)];
        db.replace_contacts(user.id, &batch).await.unwrap();
        let first = db.list_contacts(user.id).await.unwrap();
        db.replace_contacts(user.id, &batch).await.unwrap();
        let second = db.list_contacts(user.id).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].id, second[0].id);
        assert_eq!(first[0].mobile, second[0].mobile);
    }

    #[tokio::test]
    async fn test_replace_leaves_other_users_alone() {
        let (db, user, group) = setup().await;
        let other = db.create_user("john", "john@example.com", "another pass").await.unwrap();
        let other_group = db.create_group(other.id, "Parents").await.unwrap();
        db.create_contact(other.id, &contact("Theirs", "0700000009", other_group.id))
            .await
            .unwrap();

        db.replace_contacts(user.id, &[contact("Mine", "0700000009", group.id)])
            .await
            .unwrap();

        assert_eq!(db.count_contacts(other.id).await.unwrap(), 1);
        assert_eq!(db.count_contacts(user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let (db, user, group) = setup().await;
        let batch = [
            contact("Jane", "0712345678", group.id),
            contact("Ghost", "0722000111", 9999),
        ];
        assert!(db.import_contacts(user.id, &batch).await.unwrap_err().is_integrity());
        assert_eq!(db.count_contacts(user.id).await.unwrap(), 0);

        assert_eq!(db.import_contacts(user.id, &batch[..1]).await.unwrap(), 1);
        assert_eq!(db.count_contacts(user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_contacts_are_scoped_to_owner() {
        let (db, user, group) = setup().await;
        let other = db.create_user("john", "john@example.com", "another pass").await.unwrap();
        let mine = db
            .create_contact(user.id, &contact("Jane", "0712345678", group.id))
            .await
            .unwrap();

        assert!(db.get_contact(other.id, mine.id).await.unwrap_err().is_not_found());
        assert!(db.delete_contact(other.id, mine.id).await.unwrap_err().is_not_found());
        assert!(db
            .update_contact(other.id, mine.id, &contact("X", "0799999999", group.id))
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(db.get_contact(user.id, mine.id).await.unwrap().first_name, "Jane");
    }

    #[tokio::test]
    async fn test_search_matches_words_across_fields() {
        let (db, user, group) = setup().await;
        let other = db.create_user("john", "john@example.com", "another pass").await.unwrap();
        let other_group = db.create_group(other.id, "Friends").await.unwrap();

        let mut jane = contact("Jane", "0712345678", group.id);
        jane.last_name = "Wanjiru".into();
        jane.email = "jane@school.ac.ke".into();
        db.create_contact(user.id, &jane).await.unwrap();
        db.create_contact(user.id, &contact("Peter", "0722000111", group.id))
            .await
            .unwrap();
        db.create_contact(other.id, &contact("Janet", "0733000222", other_group.id))
            .await
            .unwrap();

        let hits = db.search_contacts(user.id, "jane").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].last_name, "Wanjiru");

        assert_eq!(db.search_contacts(user.id, "wanjiru school").await.unwrap().len(), 1);
        assert_eq!(db.search_contacts(user.id, "0722").await.unwrap().len(), 1);
        assert!(db.search_contacts(user.id, "jane peter").await.unwrap().is_empty());
        assert!(db.search_contacts(user.id, "%").await.unwrap().is_empty());
        assert!(db.search_contacts(user.id, "   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let (db, user, group) = setup().await;
        let mut elodie = contact("Élodie", "0712345678", group.id);
        elodie.last_name = "Nyawĩra".into();
        db.create_contact(user.id, &elodie).await.unwrap();

        assert_eq!(db.search_contacts(user.id, "élodie").await.unwrap().len(), 1);
        assert_eq!(db.search_contacts(user.id, "ÉLODIE").await.unwrap().len(), 1);
        assert_eq!(db.search_contacts(user.id, "NYAWĨRA").await.unwrap().len(), 1);
        assert!(db.search_contacts(user.id, "elodie").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_admin() {
        let (db, user, _) = setup().await;
        assert!(!user.is_admin);

        db.set_admin(user.id, true).await.unwrap();
        assert!(db.get_user(user.id).await.unwrap().is_admin);

        db.set_admin(user.id, false).await.unwrap();
        assert!(!db.get_user(user.id).await.unwrap().is_admin);

        assert!(db.set_admin(9999, true).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_group_names_unique_per_user() {
        let (db, user, group) = setup().await;
        assert!(db.group_name_taken(user.id, "Parents", None).await.unwrap());
        assert!(!db.group_name_taken(user.id, "Parents", Some(group.id)).await.unwrap());
        assert!(db.create_group(user.id, "Parents").await.unwrap_err().is_integrity());
        let teachers = db.create_group(user.id, "Teachers").await.unwrap();
        assert!(db
            .update_group(user.id, teachers.id, "Parents")
            .await
            .unwrap_err()
            .is_integrity());

        let other = db.create_user("john", "john@example.com", "another pass").await.unwrap();
        assert!(!db.group_name_taken(other.id, "Parents", None).await.unwrap());
        db.create_group(other.id, "Parents").await.unwrap();
    }

    #[tokio::test]
    async fn test_deleting_group_cascades() {
        let (db, user, group) = setup().await;
        db.create_contact(user.id, &contact("Jane", "0712345678", group.id))
            .await
            .unwrap();
        db.create_sms(user.id, &SmsInput { category_id: group.id, message: "Hi".into() })
            .await
            .unwrap();
        assert_eq!(db.count_group_contacts(user.id, group.id).await.unwrap(), 1);

        db.delete_group(user.id, group.id).await.unwrap();
        assert_eq!(db.count_contacts(user.id).await.unwrap(), 0);
        assert!(db.list_sms(user.id).await.unwrap().is_empty());
        assert_eq!(db.count_groups(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sessions_and_flashes() {
        let (db, user, _) = setup().await;
        let token = db.create_session(user.id).await.unwrap();
        assert_eq!(db.session_user(&token, TWO_WEEKS).await.unwrap().unwrap().id, user.id);
        assert!(db.session_user(&token, -1).await.unwrap().is_none());
        assert!(db.session_user("nope", TWO_WEEKS).await.unwrap().is_none());

        db.push_flash(&token, FlashLevel::Success, "first").await.unwrap();
        db.push_flash(&token, FlashLevel::Error, "second").await.unwrap();
        let flashes = db.take_flashes(&token).await.unwrap();
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].level, FlashLevel::Success);
        assert_eq!(flashes[1].message, "second");
        assert!(db.take_flashes(&token).await.unwrap().is_empty());

        db.delete_session(&token).await.unwrap();
        assert!(db.session_user(&token, TWO_WEEKS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (db, user, _) = setup().await;
        assert_eq!(db.authenticate("jane", "correct horse").await.unwrap().unwrap().id, user.id);
        assert!(db.authenticate("jane", "wrong").await.unwrap().is_none());
        assert!(db.authenticate("nobody", "correct horse").await.unwrap().is_none());
        assert!(db.create_user("jane", "x@example.com", "pw").await.unwrap_err().is_integrity());

        db.set_password(user.id, "new secret").await.unwrap();
        assert!(db.authenticate("jane", "new secret").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let (db, user, _) = setup().await;
        let profile = db.profile(user.id).await.unwrap();
        assert_eq!(profile.institution, "");

        let input = ProfileInput {
            first_name: "Jane".into(),
            last_name: "Wanjiru".into(),
            public_email: "jane@school.ac.ke".into(),
            institution: "Moi Girls".into(),
            location: "Eldoret".into(),
        };
        let profile = db.save_profile(user.id, &input).await.unwrap();
        assert_eq!(profile.location, "Eldoret");
        assert_eq!(db.get_user(user.id).await.unwrap().display_name(), "Jane Wanjiru");
    }

    #[tokio::test]
    async fn test_sms_settings_single_row() {
        let db = SphDb::in_memory().await.unwrap();
        assert!(db.sms_settings().await.unwrap().is_none());
        let input = SmsSettingsInput { user_name: "sandbox".into(), api_key: "k1".into() };
        db.save_sms_settings(&input).await.unwrap();
        let input = SmsSettingsInput { user_name: "live".into(), api_key: "k2".into() };
        let settings = db.save_sms_settings(&input).await.unwrap();
        assert_eq!(settings.user_name, "live");
        assert_eq!(settings.api_key, "k2");
    }

    #[tokio::test]
    async fn test_sms_history_is_scoped() {
        let (db, user, group) = setup().await;
        let other = db.create_user("john", "john@example.com", "another pass").await.unwrap();
        let sms = db
            .create_sms(user.id, &SmsInput { category_id: group.id, message: "Meeting at 10".into() })
            .await
            .unwrap();
        assert_eq!(sms.group_name, "Parents");
        assert!(db
            .create_sms(other.id, &SmsInput { category_id: group.id, message: "x".into() })
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(db.list_sms(user.id).await.unwrap().len(), 1);
        assert!(db.list_sms(other.id).await.unwrap().is_empty());
    }
}
