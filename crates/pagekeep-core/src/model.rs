// Component models
//
// A model holds the value a component displays or edits. Models are plain
// data so that a change record can keep an exact snapshot of the previous
// model and the page can be serialized together with its history.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value held by a model or by a keyed component state entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ModelValue>),
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Null => write!(f, "null"),
            ModelValue::Bool(value) => write!(f, "{}", value),
            ModelValue::Int(value) => write!(f, "{}", value),
            ModelValue::Float(value) => write!(f, "{}", value),
            ModelValue::Text(value) => write!(f, "{:?}", value),
            ModelValue::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for ModelValue {
    fn from(value: &str) -> Self {
        ModelValue::Text(value.to_string())
    }
}

impl From<String> for ModelValue {
    fn from(value: String) -> Self {
        ModelValue::Text(value)
    }
}

impl From<i64> for ModelValue {
    fn from(value: i64) -> Self {
        ModelValue::Int(value)
    }
}

impl From<i32> for ModelValue {
    fn from(value: i32) -> Self {
        ModelValue::Int(i64::from(value))
    }
}

impl From<bool> for ModelValue {
    fn from(value: bool) -> Self {
        ModelValue::Bool(value)
    }
}

/// A component model.
///
/// `rendered` is a transient cache of the display form; it is never
/// serialized and is cleared when the page detaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    object: ModelValue,
    #[serde(skip)]
    rendered: Option<String>,
}

impl Model {
    /// Create a model holding `object`
    pub fn new(object: impl Into<ModelValue>) -> Self {
        Self { object: object.into(), rendered: None }
    }

    /// The value held by this model
    pub fn object(&self) -> &ModelValue {
        &self.object
    }

    /// Replace the held value. Callers going through a page record the change first.
    pub(crate) fn set_object(&mut self, object: ModelValue) {
        self.object = object;
        self.rendered = None;
    }

    /// Copy of the persistent part of this model, used as an undo snapshot
    pub fn snapshot(&self) -> Model {
        Model { object: self.object.clone(), rendered: None }
    }

    /// Display form of the value, cached until the next detach
    pub fn rendered(&mut self) -> &str {
        let object = &self.object;
        self.rendered.get_or_insert_with(|| object.to_string())
    }

    /// Whether a cached display form is currently held
    pub fn is_attached(&self) -> bool {
        self.rendered.is_some()
    }

    /// Drop transient state
    pub fn detach(&mut self) {
        self.rendered = None;
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}
