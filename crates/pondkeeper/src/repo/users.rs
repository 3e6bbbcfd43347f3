//! User repository and login.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::Collection;
use crate::error::{Error, Result};
use crate::model::{seed_users, AppUser, NewUser, UserUpdate};
use crate::store::SharedStore;

/// Accounts, addressed by id.
#[derive(Debug)]
pub struct UserRepository {
    records: Collection<AppUser>,
}

impl UserRepository {
    /// Create a repository over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    /// Every account in stored order.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn list(&self) -> Result<Vec<AppUser>> {
        self.records.load().await
    }

    /// The account with id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such account.
    pub async fn get(&self, id: &str) -> Result<AppUser> {
        self.records.get(id).await
    }

    /// The account whose username matches, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<AppUser>> {
        Ok(self
            .records
            .load()
            .await?
            .into_iter()
            .find(|u| u.has_username(username)))
    }

    /// Add an account.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the input is invalid or the username is
    /// taken.
    pub async fn create(&self, input: NewUser, now: DateTime<Utc>) -> Result<AppUser> {
        let user = AppUser::new(input, now)?;
        let user = self
            .records
            .modify(|users| {
                ensure_unique(users, &user.username, &user.id)?;
                users.push(user.clone());
                Ok(user)
            })
            .await?;
        info!(username = %user.username, role = user.role.as_str(), "user added");
        Ok(user)
    }

    /// Change fields of an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], or a validation error if a field is
    /// invalid or the new username is taken.
    pub async fn update(&self, id: &str, update: UserUpdate) -> Result<AppUser> {
        let user = self
            .records
            .modify(|users| {
                let index = users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or_else(|| Error::not_found("user", id))?;
                let mut updated = users[index].clone();
                updated.apply(update)?;
                ensure_unique(users, &updated.username, id)?;
                users[index] = updated.clone();
                Ok(updated)
            })
            .await?;
        info!(id, username = %user.username, "user updated");
        Ok(user)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such account.
    pub async fn remove(&self, id: &str) -> Result<AppUser> {
        let user = self.records.remove(id).await?;
        info!(id, username = %user.username, "user removed");
        Ok(user)
    }

    /// Create the default owner and staff accounts when there are no users
    /// at all. Returns how many were created.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn ensure_seed_users(&self, now: DateTime<Utc>) -> Result<usize> {
        let added = self
            .records
            .modify(|users| {
                if !users.is_empty() {
                    return Ok(0);
                }
                for input in seed_users() {
                    users.push(AppUser::new(input, now)?);
                }
                Ok(users.len())
            })
            .await?;
        if added > 0 {
            info!(count = added, "seeded default users");
        }
        Ok(added)
    }

    /// Check a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] for an unknown user or a wrong
    /// password, without saying which.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AppUser> {
        match self.find_by_username(username).await? {
            Some(user) if user.verify_password(password) => {
                info!(username = %user.username, "login succeeded");
                Ok(user)
            }
            _ => {
                warn!(username, "login failed");
                Err(Error::AuthenticationFailed)
            }
        }
    }

    /// Every account in stored order.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn load(&self) -> Result<Vec<AppUser>> {
        self.records.load().await
    }

    /// Replace every account.
    ///
    /// # Errors
    ///
    /// Returns a validation error if two accounts share a username.
    pub async fn save(&self, users: &[AppUser]) -> Result<()> {
        check_unique_usernames(users)?;
        self.records.save(users).await
    }
}

/// Check that no two accounts share a username, ignoring case.
///
/// # Errors
///
/// Returns a validation error naming the first repeated username.
pub fn check_unique_usernames(users: &[AppUser]) -> Result<()> {
    for (i, user) in users.iter().enumerate() {
        if users[i + 1..].iter().any(|u| u.has_username(&user.username)) {
            return Err(Error::validation(format!(
                "username {} is already taken",
                user.username
            )));
        }
    }
    Ok(())
}

fn ensure_unique(users: &[AppUser], username: &str, own_id: &str) -> Result<()> {
    if users
        .iter()
        .any(|u| u.id != own_id && u.has_username(username))
    {
        return Err(Error::validation(format!(
            "username {username} is already taken"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(MemoryStore::new()))
    }

    fn kasir(username: &str) -> NewUser {
        NewUser {
            name: "Kasir".to_string(),
            username: username.to_string(),
            password: "kasir123".to_string(),
            role: Role::Staff,
        }
    }

    #[tokio::test]
    async fn test_seeded_logins() {
        crate::logging::init_test_logging();
        let repo = repo();
        assert_eq!(repo.ensure_seed_users(Utc::now()).await.unwrap(), 2);
        assert_eq!(repo.ensure_seed_users(Utc::now()).await.unwrap(), 0);

        let owner = repo.authenticate("owner", "admin123").await.unwrap();
        assert_eq!(owner.role, Role::Owner);
        let staff = repo.authenticate("STAFF", "staff123").await.unwrap();
        assert_eq!(staff.role, Role::Staff);

        assert!(matches!(
            repo.authenticate("owner", "wrong").await,
            Err(Error::AuthenticationFailed)
        ));
        assert!(matches!(
            repo.authenticate("ghost", "admin123").await,
            Err(Error::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_seed_skipped_when_users_exist() {
        let repo = repo();
        repo.create(kasir("kasir1"), Utc::now()).await.unwrap();
        assert_eq!(repo.ensure_seed_users(Utc::now()).await.unwrap(), 0);
        assert!(repo.authenticate("owner", "admin123").await.is_err());
    }

    #[tokio::test]
    async fn test_username_unique_ignoring_case() {
        let repo = repo();
        repo.create(kasir("kasir1"), Utc::now()).await.unwrap();
        let err = repo.create(kasir("KASIR1"), Utc::now()).await.unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn test_save_rejects_usernames_differing_in_case() {
        let repo = repo();
        let first = repo.create(kasir("kasir1"), Utc::now()).await.unwrap();
        let mut second = first.clone();
        second.id = "2".to_string();
        second.username = "KASIR1".to_string();

        let err = repo.save(&[first.clone(), second]).await.unwrap_err();
        assert!(err.is_validation_error());
        assert!(check_unique_usernames(&[first]).is_ok());
    }

    #[tokio::test]
    async fn test_update_username_clash() {
        let repo = repo();
        repo.create(kasir("kasir1"), Utc::now()).await.unwrap();
        let second = repo.create(kasir("kasir2"), Utc::now()).await.unwrap();

        let clash = UserUpdate {
            username: Some("Kasir1".to_string()),
            ..UserUpdate::default()
        };
        assert!(repo.update(&second.id, clash).await.is_err());

        // Renaming to the same name with different case is allowed.
        let same = UserUpdate {
            username: Some("KASIR2".to_string()),
            ..UserUpdate::default()
        };
        assert_eq!(repo.update(&second.id, same).await.unwrap().username, "KASIR2");
    }

    #[tokio::test]
    async fn test_password_change_and_remove() {
        let repo = repo();
        let user = repo.create(kasir("kasir1"), Utc::now()).await.unwrap();
        repo.update(
            &user.id,
            UserUpdate {
                password: Some("baru456".to_string()),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap();
        assert!(repo.authenticate("kasir1", "kasir123").await.is_err());
        assert!(repo.authenticate("kasir1", "baru456").await.is_ok());

        repo.remove(&user.id).await.unwrap();
        assert!(repo.get(&user.id).await.unwrap_err().is_not_found());
    }
}
