//! Diagram node and edge types.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use super::schema::RelationField;

/// Wire value of an unset single reference.
pub const NONE_SENTINEL: &str = "none";

/// Current time as epoch milliseconds, the unit every timestamp uses.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single back-reference to another node, or the explicit `"none"` sentinel.
///
/// The sentinel is a value in its own right: a node whose reference field is
/// absent from the document is invalid, one that says `"none"` is not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Reference {
    #[default]
    None,
    Node(String),
}

impl Reference {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Node(id) => Some(id),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn points_to(&self, id: &str) -> bool {
        self.node_id() == Some(id)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NONE_SENTINEL,
            Self::Node(id) => id,
        }
    }
}

impl From<&str> for Reference {
    fn from(s: &str) -> Self {
        if s.is_empty() || s == NONE_SENTINEL {
            Self::None
        } else {
            Self::Node(s.to_string())
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Reference::from(raw.as_str()))
    }
}

/// An insertion-ordered set of node ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RelationSet(Vec<String>);

impl RelationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id`; returns false when it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id.to_string());
        true
    }

    /// Remove `id`; returns false when it was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != id);
        self.0.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|existing| existing == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for RelationSet {
    fn from(ids: Vec<String>) -> Self {
        let mut set = RelationSet::new();
        for id in &ids {
            set.insert(id);
        }
        set
    }
}

impl From<RelationSet> for Vec<String> {
    fn from(set: RelationSet) -> Self {
        set.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for RelationSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = RelationSet::new();
        for id in iter {
            set.insert(id.as_ref());
        }
        set
    }
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Descriptive node data that carries no relation semantics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeMeta {
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub custom_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub aspect: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub created_by: String,
    /// Keys written by other clients, carried through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeMeta {
    /// The name shown for a node: its custom name when set, else its label.
    pub fn display_name(&self) -> &str {
        if self.custom_name.is_empty() {
            &self.label
        } else {
            &self.custom_name
        }
    }
}

/// Data payload of a Block node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub parent: Reference,
    pub children: RelationSet,
    pub terminals: RelationSet,
    pub fulfilled_by: RelationSet,
    pub fulfills: RelationSet,
    pub direct_parts: RelationSet,
    pub direct_part_of: Reference,
    pub connected_to: RelationSet,
    pub connected_by: RelationSet,
}

/// Data payload of a Connector node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorData {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub connected_to: RelationSet,
    pub connected_by: RelationSet,
}

/// Data payload of a Terminal node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalData {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub terminal_of: Reference,
    pub connected_to: RelationSet,
    pub connected_by: RelationSet,
    pub transfers_to: RelationSet,
    pub transfered_by: RelationSet,
}

/// Node variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Block,
    Connector,
    Terminal,
}

impl NodeKind {
    /// Parse a wire tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "block" => Some(Self::Block),
            "connector" => Some(Self::Connector),
            "terminal" => Some(Self::Terminal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Connector => "connector",
            Self::Terminal => "terminal",
        }
    }

    /// Capitalized name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Block => "Block",
            Self::Connector => "Connector",
            Self::Terminal => "Terminal",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-specific node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Block(BlockData),
    Connector(ConnectorData),
    Terminal(TerminalData),
}

impl NodeData {
    /// An empty payload for `kind`: empty sets and `"none"` references.
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Block => Self::Block(BlockData::default()),
            NodeKind::Connector => Self::Connector(ConnectorData::default()),
            NodeKind::Terminal => Self::Terminal(TerminalData::default()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Block(_) => NodeKind::Block,
            Self::Connector(_) => NodeKind::Connector,
            Self::Terminal(_) => NodeKind::Terminal,
        }
    }

    pub fn meta(&self) -> &NodeMeta {
        match self {
            Self::Block(data) => &data.meta,
            Self::Connector(data) => &data.meta,
            Self::Terminal(data) => &data.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            Self::Block(data) => &mut data.meta,
            Self::Connector(data) => &mut data.meta,
            Self::Terminal(data) => &mut data.meta,
        }
    }

    /// The set-valued relation field `field`, if this variant carries it.
    pub fn relation_set(&self, field: RelationField) -> Option<&RelationSet> {
        use RelationField as F;
        match (self, field) {
            (Self::Block(b), F::Children) => Some(&b.children),
            (Self::Block(b), F::Terminals) => Some(&b.terminals),
            (Self::Block(b), F::FulfilledBy) => Some(&b.fulfilled_by),
            (Self::Block(b), F::Fulfills) => Some(&b.fulfills),
            (Self::Block(b), F::DirectParts) => Some(&b.direct_parts),
            (Self::Block(b), F::ConnectedTo) => Some(&b.connected_to),
            (Self::Block(b), F::ConnectedBy) => Some(&b.connected_by),
            (Self::Connector(c), F::ConnectedTo) => Some(&c.connected_to),
            (Self::Connector(c), F::ConnectedBy) => Some(&c.connected_by),
            (Self::Terminal(t), F::ConnectedTo) => Some(&t.connected_to),
            (Self::Terminal(t), F::ConnectedBy) => Some(&t.connected_by),
            (Self::Terminal(t), F::TransfersTo) => Some(&t.transfers_to),
            (Self::Terminal(t), F::TransferedBy) => Some(&t.transfered_by),
            _ => None,
        }
    }

    pub fn relation_set_mut(&mut self, field: RelationField) -> Option<&mut RelationSet> {
        use RelationField as F;
        match (self, field) {
            (Self::Block(b), F::Children) => Some(&mut b.children),
            (Self::Block(b), F::Terminals) => Some(&mut b.terminals),
            (Self::Block(b), F::FulfilledBy) => Some(&mut b.fulfilled_by),
            (Self::Block(b), F::Fulfills) => Some(&mut b.fulfills),
            (Self::Block(b), F::DirectParts) => Some(&mut b.direct_parts),
            (Self::Block(b), F::ConnectedTo) => Some(&mut b.connected_to),
            (Self::Block(b), F::ConnectedBy) => Some(&mut b.connected_by),
            (Self::Connector(c), F::ConnectedTo) => Some(&mut c.connected_to),
            (Self::Connector(c), F::ConnectedBy) => Some(&mut c.connected_by),
            (Self::Terminal(t), F::ConnectedTo) => Some(&mut t.connected_to),
            (Self::Terminal(t), F::ConnectedBy) => Some(&mut t.connected_by),
            (Self::Terminal(t), F::TransfersTo) => Some(&mut t.transfers_to),
            (Self::Terminal(t), F::TransferedBy) => Some(&mut t.transfered_by),
            _ => None,
        }
    }

    /// The single-reference relation field `field`, if this variant carries it.
    pub fn reference(&self, field: RelationField) -> Option<&Reference> {
        use RelationField as F;
        match (self, field) {
            (Self::Block(b), F::Parent) => Some(&b.parent),
            (Self::Block(b), F::DirectPartOf) => Some(&b.direct_part_of),
            (Self::Terminal(t), F::TerminalOf) => Some(&t.terminal_of),
            _ => None,
        }
    }

    pub fn reference_mut(&mut self, field: RelationField) -> Option<&mut Reference> {
        use RelationField as F;
        match (self, field) {
            (Self::Block(b), F::Parent) => Some(&mut b.parent),
            (Self::Block(b), F::DirectPartOf) => Some(&mut b.direct_part_of),
            (Self::Terminal(t), F::TerminalOf) => Some(&mut t.terminal_of),
            _ => None,
        }
    }

    /// Whether this variant carries `field` at all.
    pub fn has_field(&self, field: RelationField) -> bool {
        self.relation_set(field).is_some() || self.reference(field).is_some()
    }
}

/// A diagram node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    pub id: String,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    pub data: NodeData,
}

impl Node {
    /// A node of `kind` at `position` with default size and empty relations.
    pub fn new(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        let size = kind.default_size();
        Self {
            id: id.into(),
            position,
            width: size.width,
            height: size.height,
            data: NodeData::empty(kind),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn meta(&self) -> &NodeMeta {
        self.data.meta()
    }

    /// Ids this node references through `field`, whether set or single.
    pub fn related_ids(&self, field: RelationField) -> Vec<&str> {
        if let Some(set) = self.data.relation_set(field) {
            return set.iter().collect();
        }
        self.data
            .reference(field)
            .and_then(Reference::node_id)
            .into_iter()
            .collect()
    }
}

/// Wire shape of a node; `data` is decoded once the kind tag is known.
#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    position: Position,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    data: serde_json::Value,
}

impl TryFrom<RawNode> for Node {
    type Error = serde_json::Error;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let data = match raw.kind {
            NodeKind::Block => NodeData::Block(serde_json::from_value(raw.data)?),
            NodeKind::Connector => NodeData::Connector(serde_json::from_value(raw.data)?),
            NodeKind::Terminal => NodeData::Terminal(serde_json::from_value(raw.data)?),
        };
        let size = raw.kind.default_size();
        Ok(Node {
            id: raw.id,
            position: raw.position,
            width: raw.width.filter(|w| *w != 0.0).unwrap_or(size.width),
            height: raw.height.filter(|h| *h != 0.0).unwrap_or(size.height),
            data,
        })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum WireData<'a> {
            Block(&'a BlockData),
            Connector(&'a ConnectorData),
            Terminal(&'a TerminalData),
        }

        #[derive(Serialize)]
        struct WireNode<'a> {
            id: &'a str,
            #[serde(rename = "type")]
            kind: NodeKind,
            position: &'a Position,
            width: f64,
            height: f64,
            data: WireData<'a>,
        }

        let data = match &self.data {
            NodeData::Block(d) => WireData::Block(d),
            NodeData::Connector(d) => WireData::Connector(d),
            NodeData::Terminal(d) => WireData::Terminal(d),
        };
        WireNode {
            id: &self.id,
            kind: self.kind(),
            position: &self.position,
            width: self.width,
            height: self.height,
            data,
        }
        .serialize(serializer)
    }
}

/// Edge relation kind.
///
/// The order of variants is part of the wire contract: `ordinal()` values
/// are keyed off by the server and UI and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Connected,
    Topology,
    Fulfilled,
    Part,
    Transfer,
    Specialization,
    Proxy,
    Projection,
    Equality,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 9] = [
        Self::Connected,
        Self::Topology,
        Self::Fulfilled,
        Self::Part,
        Self::Transfer,
        Self::Specialization,
        Self::Proxy,
        Self::Projection,
        Self::Equality,
    ];

    /// Parse a kind name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Topology => "topology",
            Self::Fulfilled => "fulfilled",
            Self::Part => "part",
            Self::Transfer => "transfer",
            Self::Specialization => "specialization",
            Self::Proxy => "proxy",
            Self::Projection => "projection",
            Self::Equality => "equality",
        }
    }

    /// Stable position in the nine-value taxonomy.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Connected => 0,
            Self::Topology => 1,
            Self::Fulfilled => 2,
            Self::Part => 3,
            Self::Transfer => 4,
            Self::Specialization => 5,
            Self::Proxy => 6,
            Self::Projection => 7,
            Self::Equality => 8,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EdgeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EdgeKind::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown edge type '{}'", raw)))
    }
}

/// Edge metadata; every field is required on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub lock_connection: bool,
    pub label: String,
    pub created_by: String,
}

/// A typed directed link between two node handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub source: String,
    pub source_handle: String,
    pub target: String,
    pub target_handle: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub data: EdgeData,
}

impl Edge {
    /// Whether `node_id` is either endpoint.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Descriptive keys may arrive as `null`; they read as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Servers may echo numeric ids; they are kept as strings locally.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}
