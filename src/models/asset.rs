use std::fmt;
use std::str::FromStr;

use crate::errors::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Asset {
    #[default]
    EthUsd,
    BtcUsd,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::EthUsd, Asset::BtcUsd];

    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::EthUsd => "ETH-USD",
            Asset::BtcUsd => "BTC-USD",
        }
    }

    /// Symbol with separators stripped, used to name exported files.
    pub fn file_stem(&self) -> String {
        self.symbol().replace('-', "")
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Asset {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Asset::ALL
            .into_iter()
            .find(|asset| asset.symbol().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FetchError::UnsupportedAsset(wanted.to_string()))
    }
}
