//! Lifecycle hooks, validators, virtual fields, plugins and custom queries.
//!
//! Everything here is registered on a [`super::Schema`] during setup and
//! shared read-only once the schema is registered with a context.

use crate::error::ModelError;
use crate::model::{Document, Model};
use colonnade_types::Value;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use super::{Schema, SchemaError};

// ============================================================================
// Hook events
// ============================================================================

/// Lifecycle events hooks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Save,
    Remove,
    Validate,
    Init,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Remove => "remove",
            Self::Validate => "validate",
            Self::Init => "init",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "save" => Some(Self::Save),
            "remove" => Some(Self::Remove),
            "validate" => Some(Self::Validate),
            "init" => Some(Self::Init),
            _ => None,
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pre hooks run before persistence, post hooks after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Pre,
    Post,
}

impl HookKind {
    pub fn allowed_events(&self) -> &'static [HookEvent] {
        match self {
            HookKind::Pre => &[HookEvent::Save, HookEvent::Remove],
            HookKind::Post => &[
                HookEvent::Save,
                HookEvent::Remove,
                HookEvent::Validate,
                HookEvent::Init,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Pre => "pre",
            HookKind::Post => "post",
        }
    }

    pub(crate) fn check(&self, event: &str) -> Result<HookEvent, SchemaError> {
        HookEvent::parse(event)
            .filter(|e| self.allowed_events().contains(e))
            .ok_or_else(|| SchemaError::UnsupportedHookEvent {
                kind: self.as_str().to_string(),
                event: event.to_string(),
                allowed: self
                    .allowed_events()
                    .iter()
                    .map(HookEvent::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Failure reported by a pre hook. Aborts the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ModelError> for HookError {
    fn from(err: ModelError) -> Self {
        HookError::new(err.to_string())
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        HookError::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        HookError::new(message)
    }
}

/// A pre hook: receives the document, may mutate it, resolves when done.
pub type PreHook =
    Arc<dyn for<'a> Fn(&'a mut Document) -> BoxFuture<'a, Result<(), HookError>> + Send + Sync>;

/// A post hook: observes the document after the event completed.
pub type PostHook = Arc<dyn Fn(&Document) + Send + Sync>;

// ============================================================================
// Validators
// ============================================================================

type Predicate = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// A field predicate with the message reported when it fails.
#[derive(Clone)]
pub struct Validator {
    predicate: Predicate,
    message: String,
    implicit_required: bool,
}

impl Validator {
    pub fn new<F>(predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
            implicit_required: false,
        }
    }

    /// The validator synthesized for `required: true` fields.
    pub(crate) fn required(field: &str) -> Self {
        Self {
            predicate: Arc::new(|value| value.map(|v| !v.is_null()).unwrap_or(false)),
            message: format!("Field: {} is required.", field),
            implicit_required: true,
        }
    }

    /// Run the predicate against a field value (`None` when unset).
    pub fn check(&self, value: Option<&Value>) -> bool {
        (self.predicate)(value)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn is_implicit_required(&self) -> bool {
        self.implicit_required
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("message", &self.message)
            .finish()
    }
}

// ============================================================================
// Virtual fields
// ============================================================================

type VirtualGetter = Arc<dyn Fn(&Document) -> Value + Send + Sync>;
type VirtualSetter = Arc<dyn Fn(&mut Document, Value) -> Result<(), ModelError> + Send + Sync>;

/// A computed field. Never persisted.
#[derive(Clone)]
pub struct Virtual {
    getter: VirtualGetter,
    setter: Option<VirtualSetter>,
}

impl Virtual {
    /// A read-only virtual from a bare getter.
    pub fn getter<G>(getter: G) -> Self
    where
        G: Fn(&Document) -> Value + Send + Sync + 'static,
    {
        Self {
            getter: Arc::new(getter),
            setter: None,
        }
    }

    /// Add a setter, making this a get/set pair.
    pub fn with_setter<S>(mut self, setter: S) -> Self
    where
        S: Fn(&mut Document, Value) -> Result<(), ModelError> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    pub(crate) fn get(&self, doc: &Document) -> Value {
        (self.getter)(doc)
    }

    pub(crate) fn setter(&self) -> Option<VirtualSetter> {
        self.setter.clone()
    }

    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }
}

impl fmt::Debug for Virtual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Virtual")
            .field("has_setter", &self.has_setter())
            .finish()
    }
}

// ============================================================================
// Plugins
// ============================================================================

/// Reusable schema mutation (adds fields, hooks, validators, ...).
pub trait Plugin: Send + Sync {
    fn apply(&self, schema: &mut Schema, options: &serde_json::Value) -> Result<(), SchemaError>;
}

impl<F> Plugin for F
where
    F: Fn(&mut Schema, &serde_json::Value) -> Result<(), SchemaError> + Send + Sync,
{
    fn apply(&self, schema: &mut Schema, options: &serde_json::Value) -> Result<(), SchemaError> {
        self(schema, options)
    }
}

/// Plugins addressable by name, for schemas assembled from configuration.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: Plugin + 'static>(&mut self, name: impl Into<String>, plugin: P) {
        self.plugins.insert(name.into(), Arc::new(plugin));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.plugins.keys().collect();
        names.sort();
        f.debug_struct("PluginRegistry").field("plugins", &names).finish()
    }
}

// ============================================================================
// Custom queries
// ============================================================================

/// A custom finder exposed on the model factory.
pub type CustomQuery = Arc<
    dyn Fn(Model, serde_json::Value) -> BoxFuture<'static, Result<Vec<Document>, ModelError>>
        + Send
        + Sync,
>;

/// An entry passed to [`Schema::add_query`].
///
/// Query maps read from configuration may hold plain values; those are
/// skipped rather than rejected.
#[derive(Clone)]
pub enum QueryEntry {
    Finder(CustomQuery),
    NotCallable(serde_json::Value),
}

impl QueryEntry {
    /// Wrap an async finder.
    pub fn finder<F, Fut>(f: F) -> Self
    where
        F: Fn(Model, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Document>, ModelError>> + Send + 'static,
    {
        QueryEntry::Finder(Arc::new(move |model, args| Box::pin(f(model, args))))
    }
}

impl From<serde_json::Value> for QueryEntry {
    fn from(value: serde_json::Value) -> Self {
        QueryEntry::NotCallable(value)
    }
}
