//! Typed models for the upstream API and the gateway's response envelope.
//!
//! Upstream objects keep their well-known fields typed and every other field
//! in a flattened `extra` map, so cards and sets pass through verbatim.
//! Optional typed fields are [`Field`]s, which tell an explicit `null` apart
//! from an absent key.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// An optional upstream field that remembers whether it was absent or `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// The key was not present.
    Absent,
    /// The key was present with value `null`.
    Null,
    /// The key carried a value.
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Field<T> {
    /// The value, if there is one.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Null => None,
        }
    }

    /// Used with `skip_serializing_if` so absent keys stay absent.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => v.serialize(serializer),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Self::Null, Self::Value))
    }
}

/// A page of results from the upstream API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Page number.
    #[serde(default)]
    pub page: u32,
    /// Requested page size.
    #[serde(default)]
    pub page_size: u32,
    /// Items on this page.
    #[serde(default)]
    pub count: u32,
    /// Items across all pages.
    #[serde(default)]
    pub total_count: u64,
}

/// A single-object response from the upstream API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiItem<T> {
    /// The object.
    pub data: T,
}

/// A trading card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Card id, e.g. `base1-4`.
    pub id: String,
    /// Card name.
    pub name: String,
    /// Pokémon, Trainer or Energy.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub supertype: Field<String>,
    /// Subtypes such as `Stage 2`.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub subtypes: Field<Vec<String>>,
    /// Energy types.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub types: Field<Vec<String>>,
    /// Rarity.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub rarity: Field<String>,
    /// The set the card belongs to.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub set: Field<CardSet>,
    /// TCGplayer listing and prices.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub tcgplayer: Field<TcgPlayer>,
    /// All other upstream fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    /// Market price per price band (`normal`, `holofoil`, ...).
    ///
    /// Each band uses `market`, falling back to `averageSellPrice`. Bands
    /// with neither are left out.
    #[must_use]
    pub fn market_prices(&self) -> BTreeMap<String, f64> {
        self.tcgplayer
            .value()
            .map(|tcg| {
                tcg.prices
                    .iter()
                    .filter_map(|(band, prices)| prices.best().map(|p| (band.clone(), p)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A card set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    /// Set id, e.g. `base1`.
    pub id: String,
    /// Set name.
    pub name: String,
    /// Series the set belongs to.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub series: Field<String>,
    /// Number printed on the cards.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub printed_total: Field<u32>,
    /// Number of cards including secret rares.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub total: Field<u32>,
    /// Release date as reported upstream (`YYYY/MM/DD`).
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub release_date: Field<String>,
    /// All other upstream fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// TCGplayer data attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgPlayer {
    /// Listing URL.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub url: Field<String>,
    /// Last price update.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    /// Prices keyed by band.
    #[serde(default)]
    pub prices: BTreeMap<String, PriceBand>,
    /// All other upstream fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Prices for one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBand {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub low: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub mid: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub high: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub market: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub direct_low: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub average_sell_price: Field<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PriceBand {
    /// The representative price: `market`, else `averageSellPrice`.
    #[must_use]
    pub fn best(&self) -> Option<f64> {
        self.market
            .value()
            .or_else(|| self.average_sell_price.value())
            .copied()
    }
}

/// Outcome tag carried by every gateway response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The lookup succeeded.
    Success,
    /// Nothing matched.
    NotFound,
    /// The card exists but has no price data.
    NoPriceData,
    /// The upstream API failed.
    #[serde(rename = "server_error")]
    UpstreamError,
    /// The request was missing or had malformed parameters.
    BadRequest,
}

/// Body with no payload keys.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Empty {}

/// The gateway's uniform response body: `{status, ...payload, message?}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// Outcome tag.
    pub status: Status,
    /// Payload keys, flattened into the top level.
    #[serde(flatten)]
    pub body: T,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// A `success` envelope.
    pub const fn success(body: T) -> Self {
        Self {
            status: Status::Success,
            body,
            message: None,
        }
    }

    /// An envelope with the given tag and message.
    pub fn with_message(status: Status, body: T, message: impl Into<String>) -> Self {
        Self {
            status,
            body,
            message: Some(message.into()),
        }
    }
}

/// `{card}` payload.
#[derive(Debug, Clone, Serialize)]
pub struct CardBody {
    pub card: Card,
}

/// `{set}` payload.
#[derive(Debug, Clone, Serialize)]
pub struct SetBody {
    pub set: CardSet,
}

/// `{card, prices}` payload of the price lookup.
#[derive(Debug, Clone, Serialize)]
pub struct PriceBody {
    pub card: Card,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub prices: BTreeMap<String, f64>,
}
