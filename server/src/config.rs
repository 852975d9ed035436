//! Runtime configuration for the Tower Clash server.

use once_cell::sync::Lazy;
use std::{env, time::Duration};

use crate::game::session::MatchRules;

#[derive(Debug)]
pub struct Settings {
    /// TCP listen address.
    pub server_addr: String,
    /// Troop catalog JSON.
    pub troop_specs: String,
    /// Credential store JSON.
    pub users_file: String,
    /// Match length before the timer decides by King HP.
    pub match_duration: Duration,
    /// Period of each player's mana regeneration tick.
    pub mana_interval: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
        let troop_specs =
            env::var("TROOP_SPECS").unwrap_or_else(|_| "server/assets/specs.json".into());
        let users_file =
            env::var("USERS_FILE").unwrap_or_else(|_| "server/assets/users.json".into());

        let match_duration = env::var("MATCH_DURATION_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let mana_interval = env::var("MANA_REGEN_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(1000);

        Settings {
            server_addr,
            troop_specs,
            users_file,
            match_duration: Duration::from_secs(match_duration),
            mana_interval: Duration::from_millis(mana_interval),
        }
    }

    pub fn rules(&self) -> MatchRules {
        MatchRules {
            match_duration: self.match_duration,
            mana_interval: self.mana_interval,
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
