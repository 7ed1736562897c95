//! Typed representation of a parsed definitions document.
//!
//! A [`Document`] owns every definition, test, object and state of one scan.
//! It is built once by the parser and never mutated afterwards; everything
//! downstream borrows from it.

use crate::core::error::{ParseError, ReferenceKind};
use crate::core::types::{CheckFamily, Datatype, Hive, Operation};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed definitions document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    definitions: Vec<Definition>,
    tests: Vec<Test>,
    objects: Vec<Object>,
    states: Vec<State>,
    #[serde(skip)]
    test_index: HashMap<String, usize>,
    #[serde(skip)]
    object_index: HashMap<String, usize>,
    #[serde(skip)]
    state_index: HashMap<String, usize>,
}

impl Document {
    /// Assembles a document, indexing items by identifier.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::DuplicateId` if two items of the same kind share
    /// an identifier.
    pub fn new(
        definitions: Vec<Definition>,
        tests: Vec<Test>,
        objects: Vec<Object>,
        states: Vec<State>,
    ) -> Result<Self, ParseError> {
        index_ids(definitions.iter().map(|d| d.id.as_str()), ReferenceKind::Definition)?;
        let test_index = index_ids(tests.iter().map(|t| t.id.as_str()), ReferenceKind::Test)?;
        let object_index = index_ids(objects.iter().map(|o| o.id.as_str()), ReferenceKind::Object)?;
        let state_index = index_ids(states.iter().map(|s| s.id.as_str()), ReferenceKind::State)?;

        Ok(Self {
            definitions,
            tests,
            objects,
            states,
            test_index,
            object_index,
            state_index,
        })
    }

    /// Definitions in document order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Tests in document order.
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// Objects in document order.
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// States in document order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Looks up a test by identifier.
    pub fn test(&self, id: &str) -> Option<&Test> {
        self.test_index.get(id).map(|&i| &self.tests[i])
    }

    /// Returns the document position of a test.
    pub fn test_position(&self, id: &str) -> Option<usize> {
        self.test_index.get(id).copied()
    }

    /// Looks up an object by identifier.
    pub fn object(&self, id: &str) -> Option<&Object> {
        self.object_index.get(id).map(|&i| &self.objects[i])
    }

    /// Looks up a state by identifier.
    pub fn state(&self, id: &str) -> Option<&State> {
        self.state_index.get(id).map(|&i| &self.states[i])
    }
}

fn index_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    kind: ReferenceKind,
) -> Result<HashMap<String, usize>, ParseError> {
    let mut index = HashMap::new();
    for (position, id) in ids.enumerate() {
        if index.insert(id.to_string(), position).is_some() {
            return Err(ParseError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

/// A compliance or vulnerability assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Unique identifier.
    pub id: String,

    /// Definition version, if given.
    pub version: Option<String>,

    /// Class, e.g. "compliance" or "vulnerability".
    pub class: String,

    /// Descriptive metadata; has no evaluation effect.
    pub metadata: Metadata,

    /// Root of the criteria tree.
    pub criteria: CriteriaNode,
}

/// Descriptive metadata of a definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Short title.
    pub title: Option<String>,
    /// Longer description.
    pub description: Option<String>,
}

/// Boolean operator of an internal criteria node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaOperator {
    /// All children true.
    #[default]
    And,
    /// At least one child true.
    Or,
    /// Exactly one child true.
    One,
    /// An odd number of children true.
    Xor,
    /// An operator the engine does not recognize.
    Other(String),
}

impl CriteriaOperator {
    /// Parses an operator name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            "ONE" => Self::One,
            "XOR" => Self::Xor,
            _ => Self::Other(name.to_string()),
        }
    }
}

/// A node of a definition's criteria tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriteriaNode {
    /// Leaf referencing a test.
    Criterion {
        /// Identifier of the referenced test.
        test_ref: String,
        /// Invert the test's boolean value.
        negate: bool,
        /// Optional comment.
        comment: Option<String>,
    },

    /// Internal node combining its children.
    Criteria {
        /// How children are combined.
        operator: CriteriaOperator,
        /// Invert the combined value.
        negate: bool,
        /// Optional comment.
        comment: Option<String>,
        /// Child nodes in document order.
        children: Vec<CriteriaNode>,
    },

    /// A criteria child the engine does not evaluate (e.g. `extend_definition`).
    Unsupported {
        /// Local name of the element.
        element: String,
        /// Negate flag as written.
        negate: bool,
    },
}

impl CriteriaNode {
    /// Creates a non-negated leaf.
    pub fn criterion(test_ref: impl Into<String>) -> Self {
        Self::Criterion {
            test_ref: test_ref.into(),
            negate: false,
            comment: None,
        }
    }

    /// Creates a non-negated internal node.
    pub fn criteria(operator: CriteriaOperator, children: Vec<CriteriaNode>) -> Self {
        Self::Criteria {
            operator,
            negate: false,
            comment: None,
            children,
        }
    }

    /// Creates an AND node.
    pub fn and(children: Vec<CriteriaNode>) -> Self {
        Self::criteria(CriteriaOperator::And, children)
    }

    /// Creates an OR node.
    pub fn or(children: Vec<CriteriaNode>) -> Self {
        Self::criteria(CriteriaOperator::Or, children)
    }

    /// Returns this node with its negate flag set.
    pub fn negated(mut self) -> Self {
        match &mut self {
            Self::Criterion { negate, .. }
            | Self::Criteria { negate, .. }
            | Self::Unsupported { negate, .. } => *negate = true,
        }
        self
    }

    /// Returns the node's negate flag.
    pub fn is_negated(&self) -> bool {
        match self {
            Self::Criterion { negate, .. }
            | Self::Criteria { negate, .. }
            | Self::Unsupported { negate, .. } => *negate,
        }
    }

    /// Collects every leaf test reference, in tree order.
    pub fn test_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_test_refs(&mut refs);
        refs
    }

    fn collect_test_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Self::Criterion { test_ref, .. } => refs.push(test_ref),
            Self::Criteria { children, .. } => {
                for child in children {
                    child.collect_test_refs(refs);
                }
            }
            Self::Unsupported { .. } => {}
        }
    }
}

/// A single executable check binding one object and optionally one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    /// Unique identifier.
    pub id: String,

    /// Check family, from the test element name.
    pub family: CheckFamily,

    /// Optional comment.
    pub comment: Option<String>,

    /// Identifier of the object to look at.
    pub object_ref: String,

    /// Identifier of the expected state; `None` means existence only.
    pub state_ref: Option<String>,
}

/// A locator for a system resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    /// Unique identifier.
    pub id: String,

    /// Family-specific locator data.
    pub locator: ObjectLocator,
}

/// Family-specific locator data of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectLocator {
    /// A registry key, optionally narrowed to a value.
    Registry(RegistryLocator),
    /// A filesystem path.
    File(FileLocator),
    /// An object element the engine does not understand.
    Unsupported {
        /// Local name of the element.
        element: String,
    },
    /// A known object element that lacks a locating child.
    Incomplete {
        /// Local name of the element.
        element: String,
        /// Name of the missing child, e.g. `hive`.
        missing: String,
    },
}

/// Locator of a registry key or value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLocator {
    /// Registry hive.
    pub hive: Hive,
    /// Key path below the hive.
    pub key: String,
    /// Value name; `None` targets the key itself.
    pub name: Option<String>,
}

impl RegistryLocator {
    /// Creates a locator for a named value.
    pub fn new(hive: Hive, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hive,
            key: key.into(),
            name: Some(name.into()),
        }
    }

    /// Returns `HIVE\key` for messages.
    pub fn key_path(&self) -> String {
        format!("{}\\{}", self.hive, self.key)
    }
}

/// Locator of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocator {
    /// Full path to the file.
    pub path: String,
}

impl FileLocator {
    /// Creates a locator for a full path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Joins a directory and a filename with the directory's own separator.
    pub fn join(directory: &str, filename: &str) -> Self {
        if directory.is_empty() {
            return Self::new(filename);
        }
        if directory.ends_with('\\') || directory.ends_with('/') {
            return Self::new(format!("{directory}{filename}"));
        }
        let separator = if directory.contains('\\') { '\\' } else { '/' };
        Self::new(format!("{directory}{separator}{filename}"))
    }
}

/// An expected value plus how to compare against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Unique identifier.
    pub id: String,

    /// Local name of the state element, e.g. `registry_state`.
    pub element: String,

    /// Compared entities in document order; empty when the state names none.
    pub entities: Vec<StateEntity>,
}

impl State {
    /// Creates a state without entities.
    pub fn new(id: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element: element.into(),
            entities: Vec::new(),
        }
    }

    /// Appends an entity.
    pub fn with_entity(mut self, entity: StateEntity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Returns the first entity for a field name.
    pub fn entity(&self, field: &str) -> Option<&StateEntity> {
        self.entities.iter().find(|e| e.field == field)
    }

    /// Field names of every entity, in document order.
    pub fn fields(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.field.as_str()).collect()
    }
}

/// One compared field of a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntity {
    /// Field name, e.g. `value` or `uwrite`.
    pub field: String,
    /// Expected value as written.
    pub expected: String,
    /// Comparison operation.
    pub operation: Operation,
    /// How values are interpreted.
    pub datatype: Datatype,
}

impl StateEntity {
    /// Creates a string `equals` entity.
    pub fn equals(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            operation: Operation::Equals,
            datatype: Datatype::String,
        }
    }

    /// Sets the operation.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Sets the datatype.
    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = datatype;
        self
    }
}
