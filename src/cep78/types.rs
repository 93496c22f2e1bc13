//! This module contains types and their implementations related to the CEP-78
//! NFT standard.

use crate::{
    common::{invalid_data, io, BorshDeserialize, BorshSerialize},
    types::{ArgumentError, CLType, CLTyped, Identity, Key, RuntimeArgs},
};
use serde::{Deserialize, Serialize};

/// Named keys of a CEP-78 collection.
pub mod named_keys {
    pub const COLLECTION_NAME: &str = "collection_name";
    pub const COLLECTION_SYMBOL: &str = "collection_symbol";
    pub const TOTAL_TOKEN_SUPPLY: &str = "total_token_supply";
    pub const NUMBER_OF_MINTED_TOKENS: &str = "number_of_minted_tokens";
    pub const ALLOW_MINTING: &str = "allow_minting";
    pub const OWNERSHIP_MODE: &str = "ownership_mode";
    pub const NFT_KIND: &str = "nft_kind";
    pub const HOLDER_MODE: &str = "holder_mode";
    pub const WHITELIST_MODE: &str = "whitelist_mode";
    pub const MINTING_MODE: &str = "minting_mode";
    pub const NFT_METADATA_KIND: &str = "nft_metadata_kind";
    pub const IDENTIFIER_MODE: &str = "identifier_mode";
    pub const METADATA_MUTABILITY: &str = "metadata_mutability";
    pub const BURN_MODE: &str = "burn_mode";
    pub const REPORTING_MODE: &str = "reporting_mode";
    pub const EVENTS_MODE: &str = "events_mode";
    pub const JSON_SCHEMA: &str = "json_schema";
}

/// Dictionaries of a CEP-78 collection.
pub mod dictionaries {
    pub const ACL_WHITELIST: &str = "acl_whitelist";
    pub const BALANCES: &str = "balances";
    pub const TOKEN_OWNERS: &str = "token_owners";
}

pub const SET_VARIABLES_ENTRY_POINT: &str = "set_variables";

const ARG_CONTRACT_WHITELIST: &str = "contract_whitelist";
const ARG_ACL_WHITELIST: &str = "acl_whitelist";

/// Declares a configuration mode of the collection, which the contract stores
/// as a `u8`.
macro_rules! u8_mode {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $value),+
        }

        impl TryFrom<u8> for $name {
            type Error = anyhow::Error;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => anyhow::bail!("Unknown {} {}.", stringify!($name), value),
                }
            }
        }

        impl CLTyped for $name {
            fn cl_type() -> CLType { CLType::U8 }
        }

        impl BorshSerialize for $name {
            fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
                BorshSerialize::serialize(&(*self as u8), writer)
            }
        }

        impl BorshDeserialize for $name {
            fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
                Self::try_from(u8::deserialize_reader(reader)?).map_err(invalid_data)
            }
        }
    };
}

u8_mode!(
    /// Who may transfer a token after it is minted.
    OwnershipMode {
        Minter = 0,
        Assigned = 1,
        Transferable = 2,
    }
);

u8_mode!(
    NftKind {
        Physical = 0,
        Digital = 1,
        Virtual = 2,
    }
);

u8_mode!(
    /// Which kinds of entities may hold tokens.
    HolderMode {
        Accounts = 0,
        Contracts = 1,
        Mixed = 2,
    }
);

u8_mode!(
    /// Whether the contract whitelist can change after installation.
    WhitelistMode {
        Unlocked = 0,
        Locked = 1,
    }
);

u8_mode!(
    /// Who may mint.
    MintingMode {
        Installer = 0,
        Public = 1,
        Acl = 2,
    }
);

u8_mode!(
    /// Format of the token metadata. Each kind is kept in its own dictionary.
    NftMetadataKind {
        Cep78 = 0,
        Nft721 = 1,
        Raw = 2,
        CustomValidated = 3,
    }
);

u8_mode!(
    /// How tokens are identified.
    IdentifierMode {
        Ordinal = 0,
        Hash = 1,
    }
);

u8_mode!(
    MetadataMutability {
        Immutable = 0,
        Mutable = 1,
    }
);

u8_mode!(
    BurnMode {
        Burnable = 0,
        NonBurnable = 1,
    }
);

u8_mode!(
    /// Whether the contract tracks which tokens each owner holds.
    OwnerReverseLookupMode {
        NoLookUp = 0,
        Complete = 1,
        TransfersOnly = 2,
    }
);

u8_mode!(
    EventsMode {
        NoEvents = 0,
        Cep47 = 1,
        Ces = 2,
    }
);

impl NftMetadataKind {
    /// Name of the dictionary holding metadata of this kind.
    pub fn dictionary_name(self) -> &'static str {
        match self {
            NftMetadataKind::Cep78 => "metadata_cep78",
            NftMetadataKind::Nft721 => "metadata_nft721",
            NftMetadataKind::Raw => "metadata_raw",
            NftMetadataKind::CustomValidated => "metadata_custom_validated",
        }
    }
}

/// Arguments of a collection's installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cep78InstallArgs {
    pub collection_name:           String,
    pub collection_symbol:         String,
    pub total_token_supply:        u64,
    pub ownership_mode:            OwnershipMode,
    pub nft_kind:                  NftKind,
    pub holder_mode:               HolderMode,
    pub whitelist_mode:            WhitelistMode,
    pub minting_mode:              MintingMode,
    pub nft_metadata_kind:         NftMetadataKind,
    pub identifier_mode:           IdentifierMode,
    pub metadata_mutability:       MetadataMutability,
    pub burn_mode:                 BurnMode,
    pub owner_reverse_lookup_mode: OwnerReverseLookupMode,
    pub events_mode:               EventsMode,
    /// Schema for custom validated metadata. Empty for the other kinds.
    #[serde(default)]
    pub json_schema:               String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_minting:             Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_whitelist:             Option<Vec<Identity>>,
}

impl Cep78InstallArgs {
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        args.insert(named_keys::COLLECTION_NAME, self.collection_name.clone())?;
        args.insert(named_keys::COLLECTION_SYMBOL, self.collection_symbol.clone())?;
        args.insert(named_keys::TOTAL_TOKEN_SUPPLY, self.total_token_supply)?;
        args.insert(named_keys::OWNERSHIP_MODE, self.ownership_mode)?;
        args.insert(named_keys::NFT_KIND, self.nft_kind)?;
        args.insert(named_keys::HOLDER_MODE, self.holder_mode)?;
        args.insert(named_keys::WHITELIST_MODE, self.whitelist_mode)?;
        args.insert(named_keys::MINTING_MODE, self.minting_mode)?;
        args.insert(named_keys::NFT_METADATA_KIND, self.nft_metadata_kind)?;
        args.insert(named_keys::IDENTIFIER_MODE, self.identifier_mode)?;
        args.insert(named_keys::METADATA_MUTABILITY, self.metadata_mutability)?;
        args.insert(named_keys::BURN_MODE, self.burn_mode)?;
        args.insert("owner_reverse_lookup_mode", self.owner_reverse_lookup_mode)?;
        args.insert(named_keys::EVENTS_MODE, self.events_mode)?;
        args.insert(named_keys::JSON_SCHEMA, self.json_schema.clone())?;
        args.insert_if_some(named_keys::ALLOW_MINTING, self.allow_minting)?;
        args.insert_if_some(ARG_ACL_WHITELIST, self.acl_whitelist.as_deref().map(to_keys))?;
        Ok(args)
    }
}

fn to_keys(identities: &[Identity]) -> Vec<Key> { identities.iter().map(Identity::to_key).collect() }

/// The variables of a collection that can be changed after installation, as
/// requested by a caller. Which update is sent is decided by
/// [`VariablesUpdate::from`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cep78Variables {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_minting:      Option<bool>,
    /// Contracts allowed to mint in installer mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_whitelist: Option<Vec<Identity>>,
    /// Accounts and contracts allowed to mint in ACL mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_whitelist:      Option<Vec<Identity>>,
}

/// An update of a collection's variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariablesUpdate {
    /// Set whether minting is allowed and the contract whitelist.
    Standard {
        allow_minting:      Option<bool>,
        contract_whitelist: Option<Vec<Identity>>,
    },
    /// Replace the ACL whitelist.
    AclWhitelist(Vec<Identity>),
}

/// The standard update is used whenever `allow_minting` or
/// `contract_whitelist` is requested, and the ACL whitelist is then not sent.
/// Otherwise the ACL whitelist is replaced if it is given.
impl From<Cep78Variables> for VariablesUpdate {
    fn from(variables: Cep78Variables) -> Self {
        let Cep78Variables {
            allow_minting,
            contract_whitelist,
            acl_whitelist,
        } = variables;
        match acl_whitelist {
            Some(acl) if allow_minting.is_none() && contract_whitelist.is_none() => {
                VariablesUpdate::AclWhitelist(acl)
            }
            acl => {
                if acl.is_some() {
                    tracing::warn!("The ACL whitelist is not updated together with other variables.");
                }
                VariablesUpdate::Standard {
                    allow_minting,
                    contract_whitelist,
                }
            }
        }
    }
}

impl VariablesUpdate {
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        match self {
            VariablesUpdate::Standard {
                allow_minting,
                contract_whitelist,
            } => {
                args.insert_if_some(named_keys::ALLOW_MINTING, *allow_minting)?;
                let contract_whitelist = contract_whitelist
                    .as_ref()
                    .map(|list| list.iter().map(|c| *c.raw_bytes()).collect::<Vec<_>>());
                args.insert_if_some(ARG_CONTRACT_WHITELIST, contract_whitelist)?;
            }
            VariablesUpdate::AclWhitelist(acl) => {
                args.insert(ARG_ACL_WHITELIST, to_keys(acl))?;
            }
        }
        Ok(args)
    }
}

/// Name, supply and configuration of a collection, as read from its named
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub collection_name:         String,
    pub collection_symbol:       String,
    pub total_token_supply:      u64,
    pub number_of_minted_tokens: u64,
    pub allow_minting:           bool,
    pub ownership_mode:          OwnershipMode,
    pub nft_kind:                NftKind,
    pub holder_mode:             HolderMode,
    pub whitelist_mode:          WhitelistMode,
    pub minting_mode:            MintingMode,
    pub nft_metadata_kind:       NftMetadataKind,
    pub identifier_mode:         IdentifierMode,
    pub metadata_mutability:     MetadataMutability,
    pub burn_mode:               BurnMode,
    pub reporting_mode:          OwnerReverseLookupMode,
}

/// Identifies a token. Ordinal identifiers are the position in minting
/// order, hash identifiers are chosen by the minter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenIdentifier {
    Index(u64),
    Hash(String),
}

impl TokenIdentifier {
    /// The dictionary item key under which the token's data is stored.
    pub fn item_key(&self) -> String {
        match self {
            TokenIdentifier::Index(index) => index.to_string(),
            TokenIdentifier::Hash(hash) => hash.clone(),
        }
    }
}

impl From<u64> for TokenIdentifier {
    fn from(index: u64) -> Self { TokenIdentifier::Index(index) }
}

impl std::fmt::Display for TokenIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.item_key())
    }
}
