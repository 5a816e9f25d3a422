//! Local user provisioning for federated logins.
//!
//! The upstream subject id is the primary link; email is the fallback so a
//! user created before the link existed is reused instead of duplicated.

use tracing::{debug, info};

use crate::AuthResult;
use crate::random::random_string;
use crate::storage::UserStorage;
use crate::types::{ExternalIdentity, User};

/// Length of generated local user ids.
pub const USER_ID_LENGTH: usize = 16;

/// Finds the local user for an upstream identity, updating their profile, or
/// creates one.
///
/// Two logins for the same new identity may race to create the user. The
/// loser's insert hits the uniqueness constraint; it then returns the row the
/// winner stored.
///
/// # Errors
///
/// Returns the storage error if any lookup or write fails.
pub async fn find_or_create_user(
    users: &dyn UserStorage,
    identity: &ExternalIdentity,
) -> AuthResult<User> {
    match lookup(users, identity).await? {
        Some(mut user) => {
            user.apply_identity(identity);
            users.update(&user).await?;
            debug!(user_id = %user.id, "Updated user from upstream profile");
            Ok(user)
        }
        None => {
            let user = User::from_identity(random_string(USER_ID_LENGTH), identity);
            match users.create(&user).await {
                Ok(()) => {
                    info!(user_id = %user.id, external_id = %identity.subject, "Provisioned new user");
                    Ok(user)
                }
                Err(e) => match lookup(users, identity).await {
                    Ok(Some(winner)) => {
                        debug!(user_id = %winner.id, "User provisioned by a concurrent login");
                        Ok(winner)
                    }
                    _ => Err(e),
                },
            }
        }
    }
}

async fn lookup(users: &dyn UserStorage, identity: &ExternalIdentity) -> AuthResult<Option<User>> {
    if let Some(user) = users.find_by_external_id(&identity.subject).await? {
        return Ok(Some(user));
    }
    if identity.email.is_empty() {
        return Ok(None);
    }
    let user = users.find_by_email(&identity.email).await?;
    if user.is_some() {
        debug!(external_id = %identity.subject, "Linking upstream identity by email");
    }
    Ok(user)
}
