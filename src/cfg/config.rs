// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::Parity;
use crate::credentials::Credentials;

/// The `c1218` options block (spec.md §6), as loaded from YAML before
/// they're turned into runtime types ([`Credentials`], [`crate::session::SessionBuilder`]).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    pub c1218: C1218Config,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct C1218Config {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_byte_size")]
    pub byte_size: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,

    #[serde(default = "default_pktsize")]
    pub pktsize: u16,
    #[serde(default = "default_nbrpkts")]
    pub nbrpkts: u8,

    #[serde(default = "default_true")]
    pub cache_tables: bool,

    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub userid: u16,

    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub password_hex: bool,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_byte_size() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}
fn default_pktsize() -> u16 {
    512
}
fn default_nbrpkts() -> u8 {
    2
}
fn default_true() -> bool {
    true
}
fn default_username() -> String {
    "0000".to_string()
}

impl Default for C1218Config {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            byte_size: default_byte_size(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
            pktsize: default_pktsize(),
            nbrpkts: default_nbrpkts(),
            cache_tables: true,
            username: default_username(),
            userid: 0,
            password: String::new(),
            password_hex: true,
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants spec.md §6 documents for each option; normalizes
    /// nothing beyond defaulting, since every field already has a serde
    /// default.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        let c = &self.c1218;

        ensure!(
            c.username.len() <= 10 && c.username.is_ascii(),
            "username must be <= 10 ASCII characters"
        );
        ensure!(c.pktsize >= 1 && c.pktsize <= 1024, "pktsize must be in 1..=1024");
        ensure!(c.nbrpkts >= 1, "nbrpkts must be >= 1");

        if c.password_hex && !c.password.is_empty() {
            ensure!(
                c.password.len() % 2 == 0
                    && c.password.chars().all(|ch| ch.is_ascii_hexdigit()),
                "password must be an even-length run of hex digits when password_hex is set"
            );
            ensure!(
                c.password.len() / 2 <= 20,
                "password must decode to <= 20 octets"
            );
        } else {
            ensure!(c.password.len() <= 20, "password must be <= 20 octets");
        }

        Ok(())
    }

    /// Builds the [`Credentials`] this configuration describes.
    pub fn credentials(&self) -> Result<Credentials> {
        let c = &self.c1218;
        if c.password_hex && !c.password.is_empty() {
            Ok(Credentials::from_hex_password(&c.username, c.userid, &c.password)?)
        } else {
            Ok(Credentials::new(&c.username, c.userid, c.password.as_bytes())?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let mut cfg = Config {
            c1218: C1218Config::default(),
        };
        cfg.validate_and_normalize().expect("defaults are valid");
    }

    #[test]
    fn oversized_username_is_rejected() {
        let mut cfg = Config {
            c1218: C1218Config {
                username: "01234567890".to_string(),
                ..C1218Config::default()
            },
        };
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn non_hex_password_with_password_hex_is_rejected() {
        let mut cfg = Config {
            c1218: C1218Config {
                password: "not-hex!".to_string(),
                password_hex: true,
                ..C1218Config::default()
            },
        };
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn credentials_from_hex_password_round_trips() {
        let cfg = Config {
            c1218: C1218Config {
                password: "deadbeef".to_string(),
                password_hex: true,
                ..C1218Config::default()
            },
        };
        let creds = cfg.credentials().expect("valid credentials");
        assert_eq!(&creds.password_padded()[..4], &[0xde, 0xad, 0xbe, 0xef]);
    }
}
