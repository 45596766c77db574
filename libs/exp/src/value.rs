//! Runtime values
//!
//! [`Value`] is what literals hold, what parameters bind to and what
//! evaluation produces. Numeric literals keep their kind (`Int`, `Long`,
//! `Float`, `Double`, `Decimal`) so that serialization reproduces the
//! suffix they were written with.
//!
//! Domain objects are reached through the [`GraphNode`] trait. Two concrete
//! implementations are provided: [`DataObject`] for mapped entities and
//! [`DataRow`] for raw storage rows.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// An object in the graph that paths can walk through.
pub trait GraphNode: fmt::Debug + Send + Sync {
    /// Name of the entity this object belongs to. Empty for untyped rows.
    fn entity_name(&self) -> &str;

    fn object_id(&self) -> Option<ObjectId> {
        None
    }

    /// Object-layer property. Unknown properties read as `Null`.
    fn property(&self, name: &str) -> Value;

    /// Storage-layer property, addressed by column or db relationship name.
    fn db_property(&self, name: &str) -> Value {
        self.property(name)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Enum(EnumValue),
    Object(Arc<dyn GraphNode>),
    ObjectId(ObjectId),
    List(Vec<Value>),
}

/// A constant of a named enumeration, written `enum:pkg.Type.CONSTANT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub constant: String,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, constant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constant: constant.into(),
        }
    }

    /// Split `pkg.Type.CONSTANT` at its last dot.
    pub fn parse(qualified: &str) -> Option<Self> {
        let (type_name, constant) = qualified.rsplit_once('.')?;
        if type_name.is_empty() || constant.is_empty() {
            return None;
        }
        Some(Self::new(type_name, constant))
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enum:{}.{}", self.type_name, self.constant)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectIdKey {
    /// Primary key snapshot, column name to value.
    Permanent(BTreeMap<String, Value>),
    /// Identity of an object that has no primary key yet.
    Temporary(Uuid),
}

/// Global identity of a persistent object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectId {
    pub entity_name: String,
    pub key: ObjectIdKey,
}

impl ObjectId {
    pub fn new(entity_name: impl Into<String>, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut snapshot = BTreeMap::new();
        snapshot.insert(column.into(), value.into());
        Self {
            entity_name: entity_name.into(),
            key: ObjectIdKey::Permanent(snapshot),
        }
    }

    pub fn compound(entity_name: impl Into<String>, snapshot: BTreeMap<String, Value>) -> Self {
        Self {
            entity_name: entity_name.into(),
            key: ObjectIdKey::Permanent(snapshot),
        }
    }

    pub fn temporary(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            key: ObjectIdKey::Temporary(Uuid::new_v4()),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.key, ObjectIdKey::Temporary(_))
    }

    pub fn id_snapshot(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.key {
            ObjectIdKey::Permanent(snapshot) => Some(snapshot),
            ObjectIdKey::Temporary(_) => None,
        }
    }

    /// The key value, when the primary key has exactly one column.
    pub fn single_key_value(&self) -> Option<&Value> {
        match self.id_snapshot() {
            Some(snapshot) if snapshot.len() == 1 => snapshot.values().next(),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            ObjectIdKey::Temporary(uuid) => write!(f, "<ObjectId:{}, TEMP:{}>", self.entity_name, uuid),
            ObjectIdKey::Permanent(snapshot) => {
                write!(f, "<ObjectId:{}", self.entity_name)?;
                for (column, value) in snapshot {
                    write!(f, ", {}={}", column, value)?;
                }
                f.write_str(">")
            }
        }
    }
}

/// A mapped entity instance.
#[derive(Debug, Clone)]
pub struct DataObject {
    entity_name: String,
    object_id: Option<ObjectId>,
    values: BTreeMap<String, Value>,
    db_values: BTreeMap<String, Value>,
}

impl DataObject {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            object_id: None,
            values: BTreeMap::new(),
            db_values: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.object_id = Some(id);
        self
    }

    /// Set an object-layer property (attribute or relationship).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Set a to-many relationship.
    pub fn with_many<I>(mut self, name: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = Arc<DataObject>>,
    {
        let list = objects.into_iter().map(Value::from).collect();
        self.values.insert(name.into(), Value::List(list));
        self
    }

    /// Set a storage column value.
    pub fn with_db(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.db_values.insert(column.into(), value.into());
        self
    }

    pub fn into_value(self) -> Value {
        Value::from(Arc::new(self))
    }
}

impl GraphNode for DataObject {
    fn entity_name(&self) -> &str {
        &self.entity_name
    }

    fn object_id(&self) -> Option<ObjectId> {
        self.object_id.clone()
    }

    fn property(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Null)
    }

    fn db_property(&self, name: &str) -> Value {
        if let Some(value) = self.db_values.get(name) {
            return value.clone();
        }
        // Primary key columns live in the object id.
        self.object_id
            .as_ref()
            .and_then(|id| id.id_snapshot())
            .and_then(|snapshot| snapshot.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// A raw row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRow {
    entity_name: String,
    columns: BTreeMap<String, Value>,
}

impl DataRow {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_value(self) -> Value {
        let node: Arc<dyn GraphNode> = Arc::new(self);
        Value::Object(node)
    }
}

impl GraphNode for DataRow {
    fn entity_name(&self) -> &str {
        &self.entity_name
    }

    fn property(&self, name: &str) -> Value {
        self.columns.get(name).cloned().unwrap_or(Value::Null)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_) | Value::Decimal(_)
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Int(_) => "Int",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Decimal(_) => "Decimal",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::DateTime(_) => "DateTime",
            Value::Enum(_) => "Enum",
            Value::Object(_) => "Object",
            Value::ObjectId(_) => "ObjectId",
            Value::List(_) => "List",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Integral view of a numeric value. Fractional kinds truncate.
    pub fn to_i64(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            Value::Float(f) => Some(*f as i64),
            Value::Double(d) => Some(*d as i64),
            Value::Decimal(d) => d.trunc().to_i64(),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Exact decimal view of a numeric value. Binary floats convert through
    /// their shortest round-trip representation, so `0.1` becomes `0.1`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Long(l) => Some(Decimal::from(*l)),
            Value::Float(f) => f.to_string().parse().ok(),
            Value::Double(d) => d.to_string().parse().ok(),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Convert JSON into a value. Objects become [`DataRow`]s, nested
    /// objects become related rows.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Int(small),
                        Err(_) => Value::Long(i),
                    }
                } else {
                    n.as_f64().map(Value::Double).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => {
                let mut row = DataRow::default();
                for (key, value) in fields {
                    row.insert(key, Value::from_json(value));
                }
                row.into_value()
            }
        }
    }

    /// Convert to JSON. Objects without a JSON form render through their id.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Long(l) => json!(l),
            Value::Float(f) => json!(f),
            Value::Double(d) => json!(d),
            Value::Decimal(d) => json!(d.to_string()),
            Value::String(s) => json!(s),
            Value::Date(d) => json!(d.to_string()),
            Value::Time(t) => json!(t.to_string()),
            Value::DateTime(dt) => json!(dt.to_string()),
            Value::Enum(e) => json!(e.to_string()),
            Value::Object(node) => match node.object_id() {
                Some(id) => json!(id.to_string()),
                None => json!(format!("<{}>", node.entity_name())),
            },
            Value::ObjectId(id) => json!(id.to_string()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

/// Structural equality. Objects are equal when they are the same instance
/// or share a permanent id.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                match (a.object_id(), b.object_id()) {
                    (Some(x), Some(y)) => !x.is_temporary() && x == y,
                    _ => false,
                }
            }
            (Value::ObjectId(a), Value::ObjectId(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

fn write_fractional(f: &mut fmt::Formatter<'_>, text: String) -> fmt::Result {
    if text.contains(&['.', 'e', 'E', 'N', 'i'][..]) {
        f.write_str(&text)
    } else {
        write!(f, "{}.0", text)
    }
}

pub(crate) fn escape_string(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Literal form, as it appears in the canonical expression text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}L", l),
            Value::Float(v) => {
                write_fractional(f, v.to_string())?;
                f.write_str("f")
            }
            Value::Double(v) => write_fractional(f, v.to_string()),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(&escape_string(s, '"')),
            Value::Date(d) => write!(f, "\"{}\"", d),
            Value::Time(t) => write!(f, "\"{}\"", t),
            Value::DateTime(dt) => write!(f, "\"{}\"", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Enum(e) => write!(f, "{}", e),
            Value::Object(node) => match node.object_id().as_ref().and_then(|id| id.single_key_value().cloned()) {
                Some(pk) => write!(f, "{}", pk),
                None => match node.object_id() {
                    Some(id) => write!(f, "{}", id),
                    None => write!(f, "<{}>", node.entity_name()),
                },
            },
            Value::ObjectId(id) => write!(f, "{}", id),
            Value::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Value::Enum(e)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::ObjectId(id)
    }
}

impl From<Arc<DataObject>> for Value {
    fn from(object: Arc<DataObject>) -> Self {
        let node: Arc<dyn GraphNode> = object;
        Value::Object(node)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
