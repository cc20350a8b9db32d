use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in routing metadata and envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yahoo,
    Kucoin,
    Kraken,
    Coinbase,
    /// News headlines service used by the research commands.
    Newsapi,
    /// Chat completion service used by the research commands.
    Openai,
}

impl ProviderId {
    /// Market data providers that can serve bars.
    pub const MARKET_DATA: [Self; 4] = [Self::Yahoo, Self::Kucoin, Self::Kraken, Self::Coinbase];

    /// Exchange priority for crypto pairs, before the stock provider fallback.
    pub const EXCHANGES: [Self; 3] = [Self::Kucoin, Self::Kraken, Self::Coinbase];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Kucoin => "kucoin",
            Self::Kraken => "kraken",
            Self::Coinbase => "coinbase",
            Self::Newsapi => "newsapi",
            Self::Openai => "openai",
        }
    }

    pub const fn is_exchange(self) -> bool {
        matches!(self, Self::Kucoin | Self::Kraken | Self::Coinbase)
    }

    pub const fn is_market_data(self) -> bool {
        !matches!(self, Self::Newsapi | Self::Openai)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "kucoin" => Ok(Self::Kucoin),
            "kraken" => Ok(Self::Kraken),
            "coinbase" => Ok(Self::Coinbase),
            "newsapi" => Ok(Self::Newsapi),
            "openai" => Ok(Self::Openai),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
