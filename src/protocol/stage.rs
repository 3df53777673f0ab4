use std::{fmt, str::FromStr};

use super::Error;

/// Query parameter holding the current [`Stage`].
pub const STAGE_PARAM: &str = "stage";
/// Query parameter holding the cookie string relayed by the cookie handover.
pub const COOKIES_PARAM: &str = "cc";
/// Query parameter holding the URL to resume at.
pub const RETURN_PARAM: &str = "r";
/// Query parameter holding the bearer token appended by the token handover.
pub const TOKEN_PARAM: &str = "cms-modern-token";

/// Steps of the handover. The string forms are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Outbound,
    CookieReturn,
    TokenReturn,
    ForcedAuthReturn,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Outbound,
        Stage::CookieReturn,
        Stage::TokenReturn,
        Stage::ForcedAuthReturn,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Outbound => "os-outbound",
            Stage::CookieReturn => "os-cookie-return",
            Stage::TokenReturn => "os-token-return",
            Stage::ForcedAuthReturn => "os-forced-auth-return",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value)
            .ok_or_else(|| Error::UnknownStage(value.to_string()))
    }
}
