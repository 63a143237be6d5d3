//! Runtime values and the object model.
//!
//! Primitives are stored inline; every object lives behind a shared,
//! interior-mutable [`Obj`] handle so that aliasing (`const b = a; b.x = 1`)
//! behaves as in JavaScript.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tsdojo_types::ast::{Expr, FunctionDef};
use tsdojo_types::format_number;

use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;

/// Immutable shared string storage.
pub type JsStr = Rc<str>;

// ══════════════════════════════════════════════════════════════════════════════
// Values
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(JsStr),
    Object(Obj),
}

impl JsValue {
    pub fn str(s: &str) -> Self {
        JsValue::String(Rc::from(s))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn as_object(&self) -> Option<&Obj> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(Obj::is_callable)
    }

    /// The result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(obj) if obj.is_callable() => "function",
            JsValue::Object(_) => "object",
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
            (JsValue::Bool(a), JsValue::Bool(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// SameValueZero: like `===` except `NaN` equals itself.
    pub fn same_value_zero(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => f.write_str("undefined"),
            JsValue::Null => f.write_str("null"),
            JsValue::Bool(b) => write!(f, "{b}"),
            JsValue::Number(n) => f.write_str(&format_number(*n)),
            JsValue::String(s) => write!(f, "{s:?}"),
            JsValue::Object(obj) => write!(f, "{obj:?}"),
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Bool(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<usize> for JsValue {
    fn from(n: usize) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::str(s)
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(Rc::from(s))
    }
}

impl From<Obj> for JsValue {
    fn from(obj: Obj) -> Self {
        JsValue::Object(obj)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Objects
// ══════════════════════════════════════════════════════════════════════════════

/// Shared handle to a heap object. Equality is identity.
#[derive(Clone)]
pub struct Obj(Rc<RefCell<Object>>);

impl Obj {
    pub fn new(object: Object) -> Self {
        Obj(Rc::new(RefCell::new(object)))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for cycle detection and collection keys.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn proto(&self) -> Option<Obj> {
        self.borrow().proto.clone()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(Function::Class(_)))
    }

    pub fn function(&self) -> Option<Function> {
        match &self.borrow().kind {
            ObjectKind::Function(function) => Some(function.clone()),
            _ => None,
        }
    }

    /// A snapshot of the elements when this is an array.
    pub fn array_elements(&self) -> Option<Vec<JsValue>> {
        match &self.borrow().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn element_at(&self, index: usize) -> Option<JsValue> {
        match &self.borrow().kind {
            ObjectKind::Array(items) => items.get(index).cloned(),
            _ => None,
        }
    }

    /// An own data property, without consulting the prototype chain.
    pub fn own_data(&self, key: &str) -> Option<JsValue> {
        match self.borrow().props.get(key) {
            Some(Property {
                value: PropertyValue::Data(value),
                ..
            }) => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "[object {}]", object.kind.class_name()),
            Err(_) => f.write_str("[object]"),
        }
    }
}

pub struct Object {
    pub kind: ObjectKind,
    pub proto: Option<Obj>,
    pub props: PropertyMap,
    /// Set by `Object.freeze`; writes then fail with a `TypeError`.
    pub frozen: bool,
}

impl Object {
    pub fn new(kind: ObjectKind, proto: Option<Obj>) -> Self {
        Self {
            kind,
            proto,
            props: PropertyMap::default(),
            frozen: false,
        }
    }
}

pub enum ObjectKind {
    Ordinary,
    /// Dense elements; holes read as `undefined`.
    Array(Vec<JsValue>),
    Function(Function),
    Error,
    Promise(PromiseState),
    Map(Collection),
    Set(Collection),
    Iterator(IteratorState),
    RegExp(RegExpState),
    /// Milliseconds since the epoch; `NaN` for an invalid date.
    Date(f64),
}

impl ObjectKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Promise(_) => "Promise",
            ObjectKind::Map(_) => "Map",
            ObjectKind::Set(_) => "Set",
            ObjectKind::Iterator(_) => "Iterator",
            ObjectKind::RegExp(_) => "RegExp",
            ObjectKind::Date(_) => "Date",
        }
    }
}

/// A compiled regular expression and the text it was written as.
#[derive(Clone)]
pub struct RegExpState {
    pub source: String,
    pub flags: String,
    pub matcher: regex::Regex,
}

impl RegExpState {
    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn sticky(&self) -> bool {
        self.flags.contains('y')
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum PropertyValue {
    Data(JsValue),
    Accessor {
        get: Option<Obj>,
        set: Option<Obj>,
    },
}

#[derive(Clone)]
pub struct Property {
    pub value: PropertyValue,
    pub enumerable: bool,
}

impl Property {
    pub fn data(value: JsValue) -> Self {
        Self {
            value: PropertyValue::Data(value),
            enumerable: true,
        }
    }

    pub fn hidden(value: JsValue) -> Self {
        Self {
            value: PropertyValue::Data(value),
            enumerable: false,
        }
    }
}

/// Insertion-ordered property storage with a hash index.
#[derive(Clone, Default)]
pub struct PropertyMap {
    entries: Vec<(JsStr, Property)>,
    index: HashMap<JsStr, usize>,
}

impl PropertyMap {
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Property> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or overwrite; an existing key keeps its position.
    pub fn insert(&mut self, key: JsStr, prop: Property) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = prop,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, prop));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let Some(i) = self.index.remove(key) else {
            return false;
        };
        self.entries.remove(i);
        for (pos, (k, _)) in self.entries.iter().enumerate().skip(i) {
            self.index.insert(k.clone(), pos);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JsStr, &Property)> {
        self.entries.iter().map(|(k, p)| (k, p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

/// Arguments to a native function.
pub struct CallArgs {
    pub this: JsValue,
    pub args: Vec<JsValue>,
    /// The constructor `new` was applied to, when called as a constructor.
    pub new_target: Option<Obj>,
}

impl CallArgs {
    pub fn arg(&self, index: usize) -> JsValue {
        self.args.get(index).cloned().unwrap_or(JsValue::Undefined)
    }

    pub fn rest(&self, from: usize) -> &[JsValue] {
        self.args.get(from..).unwrap_or(&[])
    }
}

pub type NativeFn = fn(&mut Interpreter, &CallArgs) -> EvalResult<JsValue>;

pub type NativeClosureFn = dyn Fn(&mut Interpreter, &CallArgs) -> EvalResult<JsValue>;

#[derive(Clone)]
pub enum Function {
    Closure(Closure),
    Class(Rc<ClassData>),
    Native { func: NativeFn, constructor: bool },
    /// A native function carrying captured state (promise resolvers,
    /// combinator callbacks).
    NativeClosure(Rc<NativeClosureFn>),
    Bound {
        target: Obj,
        this: JsValue,
        args: Vec<JsValue>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    /// `function` declarations and expressions; constructible.
    Normal,
    /// Lexical `this`, `arguments` and `super`.
    Arrow,
    /// Object literal and class methods, getters and setters.
    Method,
}

#[derive(Clone)]
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub scope: Scope,
    /// The object `super.x` looks past.
    pub home: Option<Obj>,
    pub kind: ClosureKind,
}

pub struct ClassData {
    pub name: JsStr,
    pub constructor: Option<Rc<FunctionDef>>,
    /// Scope the class body was evaluated in (binds the class name).
    pub scope: Scope,
    pub prototype: Obj,
    /// The `extends` target, for derived classes.
    pub parent: Option<Obj>,
    pub fields: Vec<FieldInit>,
}

impl ClassData {
    pub fn is_derived(&self) -> bool {
        self.parent.is_some()
    }
}

/// An instance field, its key already resolved.
pub struct FieldInit {
    pub key: JsStr,
    pub init: Option<Expr>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Promises
// ══════════════════════════════════════════════════════════════════════════════

pub enum PromiseState {
    Pending(Vec<Reaction>),
    Fulfilled(JsValue),
    Rejected(JsValue),
}

/// A `then` registration: handlers plus the promise they settle.
#[derive(Clone)]
pub struct Reaction {
    pub derived: Obj,
    pub on_fulfilled: Option<JsValue>,
    pub on_rejected: Option<JsValue>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Collections
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, Eq, Hash)]
enum CollectionKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    String(JsStr),
    Object(usize),
}

fn collection_key(value: &JsValue) -> CollectionKey {
    match value {
        JsValue::Undefined => CollectionKey::Undefined,
        JsValue::Null => CollectionKey::Null,
        JsValue::Bool(b) => CollectionKey::Bool(*b),
        JsValue::Number(n) if n.is_nan() => CollectionKey::Number(f64::NAN.to_bits()),
        // -0 and +0 are the same key.
        JsValue::Number(n) if *n == 0.0 => CollectionKey::Number(0f64.to_bits()),
        JsValue::Number(n) => CollectionKey::Number(n.to_bits()),
        JsValue::String(s) => CollectionKey::String(s.clone()),
        JsValue::Object(obj) => CollectionKey::Object(obj.id()),
    }
}

/// Backing store of `Map` and `Set`: SameValueZero keys in insertion order.
///
/// Deleted entries leave a tombstone so that a `forEach` running while the
/// collection changes visits entries the way JavaScript does.
#[derive(Default)]
pub struct Collection {
    entries: Vec<Option<(JsValue, JsValue)>>,
    index: HashMap<CollectionKey, usize>,
}

impl Collection {
    pub fn get(&self, key: &JsValue) -> Option<JsValue> {
        let i = *self.index.get(&collection_key(key))?;
        self.entries[i].as_ref().map(|(_, v)| v.clone())
    }

    pub fn has(&self, key: &JsValue) -> bool {
        self.index.contains_key(&collection_key(key))
    }

    pub fn set(&mut self, key: JsValue, value: JsValue) {
        let hashed = collection_key(&key);
        if let Some(&i) = self.index.get(&hashed) {
            if let Some(entry) = self.entries[i].as_mut() {
                entry.1 = value;
            }
            return;
        }
        // Normalise -0 to +0 as the stored key.
        let key = match key {
            JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
            other => other,
        };
        self.index.insert(hashed, self.entries.len());
        self.entries.push(Some((key, value)));
    }

    pub fn delete(&mut self, key: &JsValue) -> bool {
        match self.index.remove(&collection_key(key)) {
            Some(i) => {
                self.entries[i] = None;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of slots, tombstones included; bounds live iteration.
    pub fn slots(&self) -> usize {
        self.entries.len()
    }

    pub fn slot(&self, i: usize) -> Option<(JsValue, JsValue)> {
        self.entries.get(i).and_then(|entry| entry.clone())
    }

    pub fn entries(&self) -> Vec<(JsValue, JsValue)> {
        self.entries.iter().flatten().cloned().collect()
    }
}

/// Snapshot iterator returned by `keys()`, `values()` and `entries()`.
pub struct IteratorState {
    pub items: Vec<JsValue>,
    pub pos: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_map_keeps_insertion_order_across_removal() {
        let mut props = PropertyMap::default();
        for key in ["a", "b", "c"] {
            props.insert(Rc::from(key), Property::data(JsValue::Undefined));
        }
        assert!(props.remove("a"));
        props.insert(Rc::from("b"), Property::data(JsValue::Bool(true)));
        props.insert(Rc::from("d"), Property::data(JsValue::Null));
        let keys: Vec<&str> = props.iter().map(|(k, _)| &**k).collect();
        assert_eq!(keys, ["b", "c", "d"]);
        assert!(matches!(
            props.get("b").map(|p| &p.value),
            Some(PropertyValue::Data(JsValue::Bool(true)))
        ));
    }

    #[test]
    fn collection_keys_use_same_value_zero() {
        let mut map = Collection::default();
        map.set(JsValue::Number(f64::NAN), JsValue::str("nan"));
        map.set(JsValue::Number(-0.0), JsValue::str("zero"));
        map.set(JsValue::str("1"), JsValue::str("string"));
        assert!(map.has(&JsValue::Number(f64::NAN)));
        assert!(map.has(&JsValue::Number(0.0)));
        assert!(!map.has(&JsValue::Number(1.0)));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn collection_delete_leaves_order_of_survivors() {
        let mut set = Collection::default();
        for n in [1.0, 2.0, 3.0] {
            set.set(JsValue::Number(n), JsValue::Number(n));
        }
        assert!(set.delete(&JsValue::Number(2.0)));
        assert!(!set.delete(&JsValue::Number(2.0)));
        let keys: Vec<f64> = set
            .entries()
            .into_iter()
            .filter_map(|(k, _)| k.as_number())
            .collect();
        assert_eq!(keys, [1.0, 3.0]);
        assert_eq!(set.slots(), 3);
    }
}
