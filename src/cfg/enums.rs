// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Serial-port parity setting (`PARITY` option, spec.md §6).
#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    #[default]
    #[serde(rename = "none", alias = "None", alias = "NONE")]
    None,
    #[serde(rename = "even", alias = "Even", alias = "EVEN")]
    Even,
    #[serde(rename = "odd", alias = "Odd", alias = "ODD")]
    Odd,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
        })
    }
}
