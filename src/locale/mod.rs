mod currency;
mod roles;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use currency::{
    FormatOptions, FormattedComparison, convert_currency, convert_from_gbp, format_comparison,
    format_currency, format_day_rate_range, format_salary,
};
pub use roles::{ROLE_KEYS, RoleDefaults, role_defaults, roles_for_locale};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    #[serde(alias = "gb", alias = "en-GB")]
    Uk,
    #[serde(alias = "en-US")]
    Us,
    #[serde(alias = "en-AU")]
    Au,
    #[serde(alias = "en-NZ")]
    Nz,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::Uk, Locale::Us, Locale::Au, Locale::Nz];

    pub fn code(self) -> &'static str {
        match self {
            Locale::Uk => "uk",
            Locale::Us => "us",
            Locale::Au => "au",
            Locale::Nz => "nz",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Locale::Uk => "United Kingdom",
            Locale::Us => "United States",
            Locale::Au => "Australia",
            Locale::Nz => "New Zealand",
        }
    }

    pub fn language(self) -> &'static str {
        match self {
            Locale::Uk => "en-GB",
            Locale::Us => "en-US",
            Locale::Au => "en-AU",
            Locale::Nz => "en-NZ",
        }
    }

    pub fn currency(self) -> Currency {
        match self {
            Locale::Uk => Currency::Gbp,
            Locale::Us => Currency::Usd,
            Locale::Au => Currency::Aud,
            Locale::Nz => Currency::Nzd,
        }
    }

    pub fn currency_symbol(self) -> &'static str {
        match self {
            Locale::Uk => "£",
            Locale::Us => "$",
            Locale::Au => "A$",
            Locale::Nz => "NZ$",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uk" | "gb" | "en-gb" => Ok(Locale::Uk),
            "us" | "en-us" => Ok(Locale::Us),
            "au" | "en-au" => Ok(Locale::Au),
            "nz" | "en-nz" => Ok(Locale::Nz),
            other => Err(format!("unknown locale: {other}")),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Gbp,
    Usd,
    Aud,
    Nzd,
    Eur,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Usd => "USD",
            Currency::Aud => "AUD",
            Currency::Nzd => "NZD",
            Currency::Eur => "EUR",
        }
    }

    /// Static rate against sterling, refreshed by hand (January 2026).
    pub fn rate_from_gbp(self) -> f64 {
        match self {
            Currency::Gbp => 1.0,
            Currency::Usd => 1.27,
            Currency::Aud => 1.93,
            Currency::Nzd => 2.08,
            Currency::Eur => 1.18,
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GBP" => Ok(Currency::Gbp),
            "USD" => Ok(Currency::Usd),
            "AUD" => Ok(Currency::Aud),
            "NZD" => Ok(Currency::Nzd),
            "EUR" => Ok(Currency::Eur),
            other => Err(format!("unknown currency: {other}")),
        }
    }
}
