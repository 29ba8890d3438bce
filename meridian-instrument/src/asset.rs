use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Interned asset ticker (eg/ `"BTC"`, `"USDT"`), as used on the exchange wire
/// format and throughout balances/holdings.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
#[serde(transparent)]
pub struct Asset(pub SmolStr);

impl Asset {
    pub fn new_from_str(asset: impl AsRef<str>) -> Self {
        Self(SmolStr::new(asset.as_ref().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<S> From<S> for Asset
where
    S: AsRef<str>,
{
    fn from(value: S) -> Self {
        Self::new_from_str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_is_uppercased() {
        assert_eq!(Asset::new_from_str("usdt").as_str(), "USDT");
    }
}
