use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::PgWireResult;

use crate::model::Role;

/// Shared-password auth. The login name is not checked here; it is
/// resolved to a [`Role`] per query by [`resolve_role`].
#[derive(Debug)]
pub struct HotelAuthSource {
    password: String,
}

impl HotelAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for HotelAuthSource {
    async fn get_password(&self, _login: &LoginInfo) -> PgWireResult<Password> {
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleError(pub Option<String>);

impl std::fmt::Display for RoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(name) => write!(f, "unknown role {name:?}: connect as user admin or user"),
            None => write!(f, "no role given: connect as user admin or user"),
        }
    }
}

impl std::error::Error for RoleError {}

/// Map a login name onto a role. Only `admin` and `user` resolve.
pub fn resolve_role(login: Option<&str>) -> Result<Role, RoleError> {
    let name = login.ok_or(RoleError(None))?;
    Role::from_name(name).ok_or_else(|| RoleError(Some(name.to_string())))
}
