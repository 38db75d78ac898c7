#![forbid(unsafe_code)]

//! Typed property bags.
//!
//! A [`Props`] value splits what a host node receives into two disjoint,
//! explicitly typed sets:
//!
//! - **attributes**: plain key/value pairs ([`PropValue`]) assigned onto the
//!   physical node;
//! - **listeners**: named event callbacks ([`Listener`]) installed on it.
//!
//! Which set a property belongs to is decided when the element is built
//! (`attr` vs `on`), so nothing downstream inspects key names.
//!
//! # Invariants
//!
//! 1. Both maps are ordered by key, so every diff over them is deterministic.
//! 2. Attribute equality is value equality; listener equality is identity
//!    (two listeners are equal only when they share the same callback).
//! 3. [`PropsDiff::between`] lists operations in application order: removed
//!    listeners, cleared attributes, set attributes, added listeners.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Values
// ============================================================================

/// A plain attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// String value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
}

impl PropValue {
    /// Borrow the value as a string slice, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

// ============================================================================
// Events and listeners
// ============================================================================

/// Payload delivered to a [`Listener`] by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name without any prefix (e.g. `"click"`).
    pub name: String,
    /// Optional value carried by the event (e.g. input text).
    pub value: Option<String>,
}

impl Event {
    /// Create an event with no value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Attach a value to the event.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A shared event callback.
///
/// Cloning a listener shares the callback; equality is pointer identity, so
/// re-rendering with a freshly created closure counts as a change.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    /// Wrap a callback.
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    /// Whether both listeners share the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

// ============================================================================
// Props
// ============================================================================

/// Attributes plus listeners for one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    attributes: BTreeMap<String, PropValue>,
    listeners: BTreeMap<String, Listener>,
}

impl Props {
    /// Create an empty property bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute insertion.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style listener insertion.
    #[must_use]
    pub fn with_listener(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.set_listener(event, listener);
        self
    }

    /// Insert or replace an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Insert or replace a listener.
    pub fn set_listener(&mut self, event: impl Into<String>, listener: Listener) {
        self.listeners.insert(event.into(), listener);
    }

    /// Look up an attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    /// Look up a string attribute.
    #[must_use]
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(PropValue::as_str)
    }

    /// Look up a listener.
    #[must_use]
    pub fn listener(&self, event: &str) -> Option<&Listener> {
        self.listeners.get(event)
    }

    /// Attributes in key order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Listeners in key order.
    pub fn listeners(&self) -> impl Iterator<Item = (&str, &Listener)> {
        self.listeners.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether there are neither attributes nor listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.listeners.is_empty()
    }
}

// ============================================================================
// Diff
// ============================================================================

/// The minimal set of operations turning one [`Props`] into another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropsDiff<'a> {
    /// Listeners present in old but absent or changed in new.
    pub removed_listeners: Vec<(&'a str, &'a Listener)>,
    /// Attributes present in old but absent from new.
    pub cleared: Vec<&'a str>,
    /// Attributes that are new or whose value changed.
    pub set: Vec<(&'a str, &'a PropValue)>,
    /// Listeners that are new or changed.
    pub added_listeners: Vec<(&'a str, &'a Listener)>,
}

impl<'a> PropsDiff<'a> {
    /// Compute the diff from `old` to `new`.
    #[must_use]
    pub fn between(old: &'a Props, new: &'a Props) -> Self {
        let removed_listeners = old
            .listeners
            .iter()
            .filter(|(name, listener)| new.listeners.get(*name) != Some(*listener))
            .map(|(name, listener)| (name.as_str(), listener))
            .collect();

        let cleared = old
            .attributes
            .keys()
            .filter(|name| !new.attributes.contains_key(*name))
            .map(String::as_str)
            .collect();

        let set = new
            .attributes
            .iter()
            .filter(|(name, value)| old.attributes.get(*name) != Some(*value))
            .map(|(name, value)| (name.as_str(), value))
            .collect();

        let added_listeners = new
            .listeners
            .iter()
            .filter(|(name, listener)| old.listeners.get(*name) != Some(*listener))
            .map(|(name, listener)| (name.as_str(), listener))
            .collect();

        Self {
            removed_listeners,
            cleared,
            set,
            added_listeners,
        }
    }

    /// Total number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.removed_listeners.len() + self.cleared.len() + self.set.len() + self.added_listeners.len()
    }

    /// Whether applying the diff would be a no-op.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_match_only_their_variant() {
        let props = Props::new()
            .with_attr("count", 3_i64)
            .with_attr("hidden", true)
            .with_attr("label", "x");
        assert_eq!(props.attr("count").and_then(PropValue::as_int), Some(3));
        assert_eq!(props.attr("hidden").and_then(PropValue::as_bool), Some(true));
        assert_eq!(props.attr("label").and_then(PropValue::as_int), None);
        assert_eq!(props.attr("count").and_then(PropValue::as_bool), None);
        assert_eq!(PropValue::from(2.5).as_int(), None);
    }

    #[test]
    fn identical_props_diff_is_empty() {
        let listener = Listener::new(|_| {});
        let old = Props::new()
            .with_attr("id", "foo")
            .with_listener("click", listener.clone());
        let new = old.clone();
        assert!(PropsDiff::between(&old, &new).is_empty());
    }

    #[test]
    fn changed_attribute_is_set_not_cleared() {
        let old = Props::new().with_attr("nodeValue", "bar");
        let new = Props::new().with_attr("nodeValue", "baz");
        let diff = PropsDiff::between(&old, &new);
        assert!(diff.cleared.is_empty());
        assert_eq!(diff.set, vec![("nodeValue", &PropValue::from("baz"))]);
    }

    #[test]
    fn gone_attribute_is_cleared() {
        let old = Props::new().with_attr("id", "foo").with_attr("title", "t");
        let new = Props::new().with_attr("id", "foo");
        let diff = PropsDiff::between(&old, &new);
        assert_eq!(diff.cleared, vec!["title"]);
        assert!(diff.set.is_empty());
    }

    #[test]
    fn replaced_listener_is_removed_then_added() {
        let old = Props::new().with_listener("click", Listener::new(|_| {}));
        let new = Props::new().with_listener("click", Listener::new(|_| {}));
        let diff = PropsDiff::between(&old, &new);
        assert_eq!(diff.removed_listeners.len(), 1);
        assert_eq!(diff.added_listeners.len(), 1);
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn value_equality_ignores_construction_path() {
        let old = Props::new().with_attr("count", 3_i32);
        let new = Props::new().with_attr("count", 3_i64);
        assert!(PropsDiff::between(&old, &new).is_empty());
    }

    #[test]
    fn listener_equality_is_identity() {
        let a = Listener::new(|_| {});
        let b = a.clone();
        let c = Listener::new(|_| {});
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    mod diff_properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn attrs() -> impl Strategy<Value = BTreeMap<String, i64>> {
            prop::collection::btree_map("[a-d]", 0i64..3, 0..4)
        }

        fn props_of(map: &BTreeMap<String, i64>) -> Props {
            map.iter()
                .fold(Props::new(), |props, (name, value)| props.with_attr(name.clone(), *value))
        }

        fn snapshot(props: &Props) -> BTreeMap<String, PropValue> {
            props
                .attributes()
                .map(|(name, value)| (name.to_owned(), value.clone()))
                .collect()
        }

        proptest! {
            #[test]
            fn applying_the_diff_reaches_the_new_props(old in attrs(), new in attrs()) {
                let (old_props, new_props) = (props_of(&old), props_of(&new));
                let diff = PropsDiff::between(&old_props, &new_props);

                let mut applied = snapshot(&old_props);
                for name in &diff.cleared {
                    applied.remove(*name);
                }
                for (name, value) in &diff.set {
                    applied.insert((*name).to_owned(), (*value).clone());
                }
                prop_assert_eq!(applied, snapshot(&new_props));
                prop_assert_eq!(diff.is_empty(), old == new);
            }
        }
    }
}
