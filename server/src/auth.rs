//! Username / password check behind the login handshake.

use anyhow::Context;
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

#[derive(Deserialize)]
struct UsersFile {
    users: Vec<UserRecord>,
}

#[derive(Deserialize)]
struct UserRecord {
    username: String,
    password: String,
}

/// In-memory credential table, loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    passwords: HashMap<String, String>,
}

impl UserStore {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading users from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: UsersFile = serde_json::from_str(json)?;
        Ok(Self::from_pairs(
            file.users.into_iter().map(|u| (u.username, u.password)),
        ))
    }

    pub fn from_pairs<U, P>(pairs: impl IntoIterator<Item = (U, P)>) -> Self
    where
        U: Into<String>,
        P: Into<String>,
    {
        UserStore {
            passwords: pairs
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }

    pub fn check(&self, username: &str, password: &str) -> bool {
        self.passwords
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}
