use serde::{Deserialize, Serialize};
use std::str::FromStr;
use subtle::ConstantTimeEq;

use crate::config::Secret;
use crate::models::{LoginResponse, Plan, Role};

/// How `/login` answers a successful check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMode {
    /// Admin and app-user pairs, with role and plan in the response.
    #[default]
    AdminAware,
    /// App-user pair only, bare status in the response.
    SingleRole,
}

impl FromStr for LoginMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin_aware" => Ok(Self::AdminAware),
            "single_role" => Ok(Self::SingleRole),
            other => Err(format!("unknown login mode: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub admin_key: Secret,
    /// Present in admin-aware mode.
    pub admin_login: Option<(Secret, Secret)>,
    pub app_login: (Secret, Secret),
    pub login_mode: LoginMode,
}

/// Stateless credential checks against the startup configuration.
#[derive(Clone, Debug)]
pub struct AccessGate {
    credentials: Credentials,
}

/// Constant-time string comparison.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn pair_matches(pair: &(Secret, Secret), username: &str, password: &str) -> bool {
    // Evaluate both halves so timing doesn't reveal which one was wrong.
    let user_ok = secure_compare(username, pair.0.expose());
    let pass_ok = secure_compare(password, pair.1.expose());
    user_ok & pass_ok
}

impl AccessGate {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn check_admin_key(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(key) => secure_compare(key, self.credentials.admin_key.expose()),
            None => false,
        }
    }

    pub fn check_login(&self, username: &str, password: &str) -> LoginResponse {
        match self.credentials.login_mode {
            LoginMode::AdminAware => {
                let is_admin = self
                    .credentials
                    .admin_login
                    .as_ref()
                    .map(|pair| pair_matches(pair, username, password))
                    .unwrap_or(false);
                if is_admin {
                    return LoginResponse::success(Some(Role::Admin), Some(Plan::Premium));
                }
                if pair_matches(&self.credentials.app_login, username, password) {
                    return LoginResponse::success(Some(Role::User), Some(Plan::Premium));
                }
                LoginResponse::fail()
            }
            LoginMode::SingleRole => {
                if pair_matches(&self.credentials.app_login, username, password) {
                    LoginResponse::success(None, None)
                } else {
                    LoginResponse::fail()
                }
            }
        }
    }
}
