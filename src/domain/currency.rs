use serde::{Deserialize, Deserializer, Serialize};

use super::{Cents, format_cents};

/// Currencies a group can keep its books in.
///
/// Deserializing an unrecognized code yields the default currency, so stored
/// groups with an unknown code still load and show the fallback symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Usd,
    Eur,
    Gbp,
    Jpy,
}

/// Display symbol for each supported currency.
const CURRENCY_SYMBOLS: [(Currency, &str); 5] = [
    (Currency::Inr, "₹"),
    (Currency::Usd, "$"),
    (Currency::Eur, "€"),
    (Currency::Gbp, "£"),
    (Currency::Jpy, "¥"),
];

/// Symbol used when a currency code is not recognized.
pub const FALLBACK_SYMBOL: &str = "₹";

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Inr,
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(code.trim()))
    }

    pub fn symbol(&self) -> &'static str {
        CURRENCY_SYMBOLS
            .iter()
            .find(|(currency, _)| currency == self)
            .map(|(_, symbol)| *symbol)
            .unwrap_or(FALLBACK_SYMBOL)
    }

    /// Format an amount with this currency's symbol: `₹90.00`, `-$12.50`.
    pub fn format(&self, cents: Cents) -> String {
        format_money(cents, self.symbol())
    }

    /// Like [`Currency::format`] but always signed: `+₹60.00`, `-₹30.00`.
    pub fn format_signed(&self, cents: Cents) -> String {
        let sign = if cents >= 0 { "+" } else { "" };
        format!("{}{}", sign, self.format(cents))
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unsupported currency code '{}'", s))
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Currency::from_code(&code).unwrap_or_else(|| {
            tracing::warn!(code = %code, "unknown currency code, using {}", FALLBACK_SYMBOL);
            Currency::default()
        }))
    }
}

fn format_money(cents: Cents, symbol: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}{}", sign, symbol, format_cents(cents.abs()))
}
