use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Copy,
            Clone,
            Eq,
            PartialEq,
            Ord,
            PartialOrd,
            Hash,
            Deserialize,
            Serialize,
            Constructor,
            Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }
        }
    };
}

opaque_id!(OpportunityId);
opaque_id!(TradeId);
opaque_id!(TradeOrderId);
opaque_id!(CredentialId);
opaque_id!(StrategyConfigId);
opaque_id!(UserId);
