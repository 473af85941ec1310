//! Query descriptors and wire subscription keys

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ChannelError;

const KEY_SEPARATOR: &str = "__";
const TELEMETRY_TYPE: &str = "TLM";

/// Value representation requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    #[default]
    Converted,
    Raw,
}

impl ValueType {
    pub const ALL: [ValueType; 2] = [ValueType::Converted, ValueType::Raw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Converted => "CONVERTED",
            Self::Raw => "RAW",
        }
    }
}

/// Raw samples or server-side rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decimation {
    #[default]
    Decom,
    ReducedMinute,
    ReducedHour,
    ReducedDay,
}

impl Decimation {
    pub const ALL: [Decimation; 4] = [
        Decimation::Decom,
        Decimation::ReducedMinute,
        Decimation::ReducedHour,
        Decimation::ReducedDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decom => "DECOM",
            Self::ReducedMinute => "REDUCED_MINUTE",
            Self::ReducedHour => "REDUCED_HOUR",
            Self::ReducedDay => "REDUCED_DAY",
        }
    }

    pub fn is_reduced(&self) -> bool {
        !matches!(self, Self::Decom)
    }
}

/// Rollup statistic for reduced data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregate {
    Min,
    Max,
    #[default]
    Avg,
    Stddev,
}

impl Aggregate {
    pub const ALL: [Aggregate; 4] = [Aggregate::Min, Aggregate::Max, Aggregate::Avg, Aggregate::Stddev];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
            Self::Stddev => "STDDEV",
        }
    }
}

macro_rules! impl_str_conversions {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ChannelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| ChannelError::InvalidKey(format!("unknown {} '{}'", stringify!($ty), s)))
            }
        }
    };
}

impl_str_conversions!(ValueType);
impl_str_conversions!(Decimation);
impl_str_conversions!(Aggregate);

/// `<decimation>__TLM__<target>__<packet>__<item>__<value type>[__<aggregate>]`
///
/// The aggregate suffix is present exactly when the decimation is reduced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WireKey {
    key: String,
    decimation: Decimation,
    target: String,
    packet: String,
    item: String,
    value_type: ValueType,
    aggregate: Option<Aggregate>,
}

impl WireKey {
    /// `reduced_type` is only applied for reduced decimations
    pub fn new(
        decimation: Decimation,
        target: &str,
        packet: &str,
        item: &str,
        value_type: ValueType,
        reduced_type: Aggregate,
    ) -> Self {
        let aggregate = decimation.is_reduced().then_some(reduced_type);
        let mut key = [
            decimation.as_str(),
            TELEMETRY_TYPE,
            target,
            packet,
            item,
            value_type.as_str(),
        ]
        .join(KEY_SEPARATOR);
        if let Some(aggregate) = aggregate {
            key.push_str(KEY_SEPARATOR);
            key.push_str(aggregate.as_str());
        }

        Self {
            key,
            decimation,
            target: target.to_string(),
            packet: packet.to_string(),
            item: item.to_string(),
            value_type,
            aggregate,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn decimation(&self) -> Decimation {
        self.decimation
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn packet(&self) -> &str {
        &self.packet
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn aggregate(&self) -> Option<Aggregate> {
        self.aggregate
    }
}

impl fmt::Display for WireKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl FromStr for WireKey {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChannelError::InvalidKey(s.to_string());
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        if !(parts.len() == 6 || parts.len() == 7) || parts[1] != TELEMETRY_TYPE {
            return Err(invalid());
        }
        if parts[2..5].iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let decimation: Decimation = parts[0].parse()?;
        let value_type: ValueType = parts[5].parse()?;
        let aggregate = match parts.get(6) {
            Some(a) => Some(a.parse::<Aggregate>()?),
            None => None,
        };
        if decimation.is_reduced() != aggregate.is_some() {
            return Err(invalid());
        }

        Ok(Self::new(
            decimation,
            parts[2],
            parts[3],
            parts[4],
            value_type,
            aggregate.unwrap_or_default(),
        ))
    }
}

impl TryFrom<String> for WireKey {
    type Error = ChannelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WireKey> for String {
    fn from(key: WireKey) -> Self {
        key.key
    }
}

/// One panel query as edited in the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryQuery {
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default, rename = "reduced")]
    pub decimation: Decimation,
    #[serde(default)]
    pub reduced_type: Aggregate,
    #[serde(default, deserialize_with = "unique_keys")]
    pub items: Vec<WireKey>,
}

/// Drops repeated keys, keeping the first occurrence
fn unique_keys<'de, D>(deserializer: D) -> Result<Vec<WireKey>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let keys = Vec::<WireKey>::deserialize(deserializer)?;
    let mut seen = HashSet::with_capacity(keys.len());
    Ok(keys.into_iter().filter(|k| seen.insert(k.clone())).collect())
}

impl TelemetryQuery {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            target: None,
            packet: None,
            item: None,
            value_type: ValueType::default(),
            decimation: Decimation::default(),
            reduced_type: Aggregate::default(),
            items: Vec::new(),
        }
    }

    pub fn select(mut self, target: &str, packet: &str, item: &str) -> Self {
        self.target = Some(target.to_string());
        self.packet = Some(packet.to_string());
        self.item = Some(item.to_string());
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_decimation(mut self, decimation: Decimation, reduced_type: Aggregate) -> Self {
        self.decimation = decimation;
        self.reduced_type = reduced_type;
        self
    }

    /// Aggregate that keys built now would carry
    pub fn aggregate(&self) -> Option<Aggregate> {
        self.decimation.is_reduced().then_some(self.reduced_type)
    }

    /// Key for the current target/packet/item selection
    pub fn selected_key(&self) -> Result<WireKey, ChannelError> {
        let field = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ChannelError::InvalidKey(format!("{} is not selected", name)))
        };
        let target = field(&self.target, "target")?;
        let packet = field(&self.packet, "packet")?;
        let item = field(&self.item, "item")?;

        Ok(WireKey::new(
            self.decimation,
            &target,
            &packet,
            &item,
            self.value_type,
            self.reduced_type,
        ))
    }

    /// Append the current selection. Already present keys are left in place.
    pub fn add_item(&mut self) -> Result<&WireKey, ChannelError> {
        let key = self.selected_key()?;
        let index = match self.items.iter().position(|k| *k == key) {
            Some(index) => index,
            None => {
                self.items.push(key);
                self.items.len() - 1
            }
        };
        Ok(&self.items[index])
    }

    pub fn remove_item(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|k| k.as_str() != key);
        self.items.len() != before
    }

    /// Column names aligned with `items`.
    ///
    /// The item name is used unless two keys share it, in which case those
    /// columns use their full key.
    pub fn columns(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|key| {
                let shared = self.items.iter().filter(|k| k.item() == key.item()).count() > 1;
                if shared {
                    key.as_str().to_string()
                } else {
                    key.item().to_string()
                }
            })
            .collect()
    }
}
