use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The type tag of an attribute value. Mirrors the seeded `types` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// Text.
    Str,
}

impl AttrType {
    /// Every type tag, in seeding order.
    pub const ALL: [AttrType; 4] = [Self::Int, Self::Bool, Self::Str, Self::Float];

    /// The tag as stored in the `types` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttrType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            "str" => Ok(Self::Str),
            other => Err(format!("unknown attribute type \"{other}\"")),
        }
    }
}

/// A value assigned to an attribute of a place or thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A text value.
    Str(String),
}

impl AttrValue {
    /// The type tag of this value.
    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Bool(_) => AttrType::Bool,
            Self::Int(_) => AttrType::Int,
            Self::Float(_) => AttrType::Float,
            Self::Str(_) => AttrType::Str,
        }
    }

    /// Numeric view used by bound checks. Non-numbers have none.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    /// Interpret a bare literal: booleans, then integers, then floats, else text.
    pub fn parse_literal(s: &str) -> Self {
        match s {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(n) = s.parse::<i64>() {
            return Self::Int(n);
        }
        if let Ok(n) = s.parse::<f64>() {
            return Self::Float(n);
        }
        Self::Str(s.to_string())
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// One clause of an attribute [`Constraint`].
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// The value must carry this type tag.
    Type(AttrType),
    /// The value must be a number no smaller than this.
    AtLeast(f64),
    /// The value must be a number no larger than this.
    AtMost(f64),
    /// Values in this set are accepted outright.
    OneOf(Vec<AttrValue>),
}

impl Check {
    fn passes(&self, value: &AttrValue) -> bool {
        match self {
            Self::Type(t) => value.attr_type() == *t,
            Self::AtLeast(lower) => value.as_number().is_some_and(|n| n >= *lower),
            Self::AtMost(upper) => value.as_number().is_some_and(|n| n <= *upper),
            Self::OneOf(values) => values.contains(value),
        }
    }
}

/// A composable predicate over attribute values.
///
/// Membership in a permitted set accepts a value immediately. Otherwise
/// every type and bound clause must pass. A constraint made only of
/// permitted sets is exhaustive, and one with no clauses accepts anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraint {
    checks: Vec<Check>,
}

impl Constraint {
    /// A constraint with no clauses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause.
    pub fn with(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Require the given type tag.
    pub fn of_type(self, t: AttrType) -> Self {
        self.with(Check::Type(t))
    }

    /// Require a number in `lower..=upper`.
    pub fn between(self, lower: f64, upper: f64) -> Self {
        self.with(Check::AtLeast(lower)).with(Check::AtMost(upper))
    }

    /// Whitelist a value regardless of the other clauses.
    pub fn permit(mut self, value: impl Into<AttrValue>) -> Self {
        let value = value.into();
        let existing = self
            .checks
            .iter()
            .position(|c| matches!(c, Check::OneOf(_)));
        match existing {
            Some(i) => {
                if let Check::OneOf(values) = &mut self.checks[i] {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
            }
            None => self.checks.push(Check::OneOf(vec![value])),
        }
        self
    }

    /// Rebuild a constraint from its stored columns.
    pub fn from_parts(
        type_tag: Option<AttrType>,
        lower: Option<f64>,
        upper: Option<f64>,
        permitted: Vec<AttrValue>,
    ) -> Self {
        let mut constraint = Self::new();
        if let Some(t) = type_tag {
            constraint = constraint.of_type(t);
        }
        if let Some(lower) = lower {
            constraint = constraint.with(Check::AtLeast(lower));
        }
        if let Some(upper) = upper {
            constraint = constraint.with(Check::AtMost(upper));
        }
        for value in permitted {
            constraint = constraint.permit(value);
        }
        constraint
    }

    /// All clauses in insertion order.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Evaluate the constraint against a value.
    pub fn accepts(&self, value: &AttrValue) -> bool {
        let mut has_membership = false;
        for check in &self.checks {
            if let Check::OneOf(values) = check {
                if values.contains(value) {
                    return true;
                }
                has_membership = true;
            }
        }

        let mut restricted = false;
        for check in self
            .checks
            .iter()
            .filter(|c| !matches!(c, Check::OneOf(_)))
        {
            restricted = true;
            if !check.passes(value) {
                return false;
            }
        }
        restricted || !has_membership
    }

    /// The first type clause, if any.
    pub fn type_tag(&self) -> Option<AttrType> {
        self.checks.iter().find_map(|c| match c {
            Check::Type(t) => Some(*t),
            _ => None,
        })
    }

    /// The tightest lower bound, if any.
    pub fn lower(&self) -> Option<f64> {
        self.checks
            .iter()
            .filter_map(|c| match c {
                Check::AtLeast(n) => Some(*n),
                _ => None,
            })
            .reduce(f64::max)
    }

    /// The tightest upper bound, if any.
    pub fn upper(&self) -> Option<f64> {
        self.checks
            .iter()
            .filter_map(|c| match c {
                Check::AtMost(n) => Some(*n),
                _ => None,
            })
            .reduce(f64::min)
    }

    /// Every whitelisted value.
    pub fn permitted(&self) -> Vec<&AttrValue> {
        self.checks
            .iter()
            .filter_map(|c| match c {
                Check::OneOf(values) => Some(values.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// The attribute values of a place or thing.
///
/// Entities materialised from storage start unloaded: only values assigned
/// in memory are present until the stored set is merged in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    values: BTreeMap<String, AttrValue>,
    loaded: bool,
}

impl AttributeMap {
    /// A fully loaded map holding `values`.
    pub fn loaded(values: BTreeMap<String, AttrValue>) -> Self {
        Self {
            values,
            loaded: true,
        }
    }

    /// An empty map whose stored values have not been read yet.
    pub fn unloaded() -> Self {
        Self::default()
    }

    /// Whether the stored values have been merged in.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Look up one value.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    /// Iterate values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.values.iter()
    }

    /// Attribute names in name order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Number of values held in memory.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values are held in memory.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, value: AttrValue) -> Option<AttrValue> {
        self.values.insert(name, value)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.values.remove(name)
    }

    /// Merge stored values underneath the in-memory ones and mark loaded.
    pub(crate) fn merge_stored(&mut self, stored: BTreeMap<String, AttrValue>) {
        for (name, value) in stored {
            self.values.entry(name).or_insert(value);
        }
        self.loaded = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stickiness() -> Constraint {
        Constraint::new()
            .of_type(AttrType::Int)
            .between(-10.0, 10.0)
            .permit("unknown")
    }

    #[test]
    fn empty_constraint_accepts_everything() {
        let c = Constraint::new();
        assert!(c.accepts(&AttrValue::Int(7)));
        assert!(c.accepts(&AttrValue::Str("anything".into())));
    }

    #[test]
    fn out_of_range_int_rejected() {
        assert!(!stickiness().accepts(&AttrValue::Int(15)));
        assert!(!stickiness().accepts(&AttrValue::Int(-11)));
    }

    #[test]
    fn in_range_int_accepted() {
        assert!(stickiness().accepts(&AttrValue::Int(10)));
        assert!(stickiness().accepts(&AttrValue::Int(-10)));
        assert!(stickiness().accepts(&AttrValue::Int(0)));
    }

    #[test]
    fn permitted_value_bypasses_type_and_bounds() {
        assert!(stickiness().accepts(&AttrValue::Str("unknown".into())));
        assert!(!stickiness().accepts(&AttrValue::Str("sticky".into())));
    }

    #[test]
    fn wrong_type_rejected() {
        assert!(!stickiness().accepts(&AttrValue::Float(1.0)));
        assert!(!stickiness().accepts(&AttrValue::Bool(true)));
    }

    #[test]
    fn bounds_reject_non_numbers() {
        let c = Constraint::new().with(Check::AtLeast(0.0));
        assert!(!c.accepts(&AttrValue::Str("zero".into())));
        assert!(c.accepts(&AttrValue::Float(0.5)));
    }

    #[test]
    fn membership_alone_is_exhaustive() {
        let c = Constraint::new().permit("north").permit("south");
        assert!(c.accepts(&AttrValue::Str("north".into())));
        assert!(!c.accepts(&AttrValue::Str("east".into())));
    }

    #[test]
    fn permit_merges_into_one_set() {
        let c = Constraint::new().permit(1_i64).permit(2_i64).permit(1_i64);
        assert_eq!(c.checks().len(), 1);
        assert_eq!(c.permitted().len(), 2);
    }

    #[test]
    fn parts_round_trip_preserves_behavior() {
        let original = stickiness();
        let permitted = original.permitted().into_iter().cloned().collect();
        let rebuilt = Constraint::from_parts(
            original.type_tag(),
            original.lower(),
            original.upper(),
            permitted,
        );
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn tightest_bounds_reported() {
        let c = Constraint::new()
            .with(Check::AtLeast(1.0))
            .with(Check::AtLeast(3.0))
            .with(Check::AtMost(9.0))
            .with(Check::AtMost(5.0));
        assert_eq!(c.lower(), Some(3.0));
        assert_eq!(c.upper(), Some(5.0));
    }

    #[test]
    fn parse_literal_prefers_narrow_types() {
        assert_eq!(AttrValue::parse_literal("true"), AttrValue::Bool(true));
        assert_eq!(AttrValue::parse_literal("42"), AttrValue::Int(42));
        assert_eq!(AttrValue::parse_literal("0.5"), AttrValue::Float(0.5));
        assert_eq!(
            AttrValue::parse_literal("unknown"),
            AttrValue::Str("unknown".into())
        );
    }

    #[test]
    fn merge_keeps_in_memory_values() {
        let mut map = AttributeMap::unloaded();
        map.insert("hue".into(), AttrValue::from("red"));
        let mut stored = BTreeMap::new();
        stored.insert("hue".to_string(), AttrValue::from("blue"));
        stored.insert("size".to_string(), AttrValue::Int(3));
        map.merge_stored(stored);
        assert!(map.is_loaded());
        assert_eq!(map.get("hue"), Some(&AttrValue::from("red")));
        assert_eq!(map.get("size"), Some(&AttrValue::Int(3)));
    }

    proptest! {
        #[test]
        fn bounded_int_accepts_exactly_the_range(n in -100_i64..100) {
            let c = Constraint::new().of_type(AttrType::Int).between(-10.0, 10.0);
            prop_assert_eq!(c.accepts(&AttrValue::Int(n)), (-10..=10).contains(&n));
        }
    }
}
