use crate::error::Result;
use crate::utils::DatedRecord;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// A string-keyed mapping that keeps the order keys appeared in on the wire.
///
/// Pivot columns follow first-seen order, so report maps cannot be
/// deserialized into a sorted map. A repeated key replaces the earlier value
/// in place.
#[derive(Debug, Clone)]
pub struct Keyed<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for Keyed<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V: PartialEq> PartialEq for Keyed<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V> Keyed<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Keyed<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut keyed = Keyed::new();
        for (k, v) in iter {
            keyed.insert(k, v);
        }
        keyed
    }
}

impl<V: Serialize> Serialize for Keyed<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct KeyedVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for KeyedVisitor<V> {
    type Value = Keyed<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map with string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut keyed = Keyed::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            keyed.insert(key, value);
        }
        Ok(keyed)
    }

    fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Keyed::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Keyed<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(KeyedVisitor(PhantomData))
    }
}

impl<V: JsonSchema> JsonSchema for Keyed<V> {
    fn schema_name() -> String {
        format!("Keyed_{}", V::schema_name())
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <BTreeMap<String, V>>::json_schema(gen)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Holding {
    #[schemars(description = "ISO currency code of the value")]
    pub currency: Option<String>,

    pub currency_sign: Option<String>,

    #[schemars(description = "Holding value; null when the source could not price it")]
    pub value: Option<f64>,

    #[schemars(description = "Timestamp the holding was requested for. Formatted into the row date.")]
    pub date_requested: Option<String>,

    #[schemars(description = "Timestamp of the actual valuation. Null marks the holding as undated.")]
    pub date: Option<String>,
}

impl DatedRecord for Holding {
    const SOURCE_FIELD: &'static str = "DateRequested";

    fn date_marker(&self) -> Option<&str> {
        self.date.as_deref()
    }

    fn date_source(&self) -> Option<&str> {
        self.date_requested.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ReturnRecord {
    #[schemars(description = "Start of the return period. Null marks the record as undated.")]
    pub start_date: Option<String>,

    pub end_date: Option<String>,

    pub return_percentage: Option<f64>,
}

impl DatedRecord for ReturnRecord {
    const SOURCE_FIELD: &'static str = "StartDate";

    fn date_marker(&self) -> Option<&str> {
        self.start_date.as_deref()
    }

    fn date_source(&self) -> Option<&str> {
        self.start_date.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Asset {
    #[serde(rename = "ID")]
    #[schemars(description = "Instrument identifier; becomes the pivot column id")]
    pub id: String,

    #[serde(rename = "Type")]
    pub asset_type: Option<String>,

    pub description: Option<String>,

    pub denomination: Option<String>,

    pub category: Option<String>,

    #[serde(default)]
    pub holdings: Vec<Holding>,

    #[serde(default)]
    pub returns_by_date_range: Vec<ReturnRecord>,

    #[serde(default)]
    pub transactions: Vec<serde_json::Value>,
}

/// Category-level aggregates, as found under `CategoryAssets` and
/// `CategoryAssetsReturn`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryAggregate {
    #[serde(default)]
    pub holdings: Vec<Holding>,

    #[serde(default)]
    pub returns_by_date_range: Vec<ReturnRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Valuation {
    #[schemars(description = "Date of the reference value, same format as the row dates")]
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ReferenceVariable {
    #[serde(default)]
    pub valuations: Vec<Valuation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ReportPayload {
    #[serde(default)]
    #[schemars(description = "Category name -> instruments carrying holdings")]
    pub assets_by_category: Keyed<Vec<Asset>>,

    #[serde(default)]
    #[schemars(description = "Category name -> instruments carrying period returns")]
    pub assets_return_by_category: Keyed<Vec<Asset>>,

    #[serde(default)]
    pub category_assets: Keyed<CategoryAggregate>,

    #[serde(default)]
    pub category_assets_return: Keyed<CategoryAggregate>,

    #[schemars(description = "Authoritative portfolio total per date")]
    pub total_holdings_by_date: Option<Vec<Holding>>,

    #[schemars(description = "Authoritative portfolio return per period")]
    pub total_returns: Option<Vec<ReturnRecord>>,

    #[serde(default)]
    pub reference_variables: Keyed<ReferenceVariable>,
}

impl ReportPayload {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn assets_by_category(&self) -> &Keyed<Vec<Asset>> {
        &self.assets_by_category
    }

    pub fn asset_returns_by_category(&self) -> &Keyed<Vec<Asset>> {
        &self.assets_return_by_category
    }

    pub fn category_holdings(&self) -> &Keyed<CategoryAggregate> {
        &self.category_assets
    }

    pub fn category_returns(&self) -> &Keyed<CategoryAggregate> {
        &self.category_assets_return
    }

    pub fn total_holdings(&self) -> Option<&[Holding]> {
        self.total_holdings_by_date.as_deref()
    }

    pub fn total_returns(&self) -> Option<&[ReturnRecord]> {
        self.total_returns.as_deref()
    }

    /// Valuations of a named reference series, if the report carries it.
    pub fn reference(&self, name: &str) -> Option<&[Valuation]> {
        self.reference_variables
            .get(name)
            .map(|r| r.valuations.as_slice())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportPayload)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
