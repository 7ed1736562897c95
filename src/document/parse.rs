//! Definitions document parser.
//!
//! Elements are matched by local name, so namespaced documents
//! (`win-def:registry_test`, `ind-def:file_object`) and bare ones parse the
//! same way. Only the document skeleton is checked here: cross references are
//! left to the resolver, and incomplete tests or objects are kept so that
//! only the affected test is downgraded when it runs.

use crate::core::error::ParseError;
use crate::core::types::{CheckFamily, Datatype, Hive, Operation};
use crate::document::model::{
    CriteriaNode, CriteriaOperator, Definition, Document, FileLocator, Metadata, Object,
    ObjectLocator, RegistryLocator, State, StateEntity, Test,
};

use roxmltree::Node;
use tracing::debug;

const ROOT: &str = "oval_definitions";

/// Parses raw document bytes into a [`Document`].
///
/// # Errors
///
/// Returns a [`ParseError`] if the input is not UTF-8, is not well-formed
/// XML, has the wrong root element, lacks the `definitions` container, has
/// an item without an `id`, a definition without `criteria` or a criterion
/// without `test_ref`, or repeats an identifier.
///
/// # Example
///
/// ```rust
/// let xml = br#"<oval_definitions>
///   <definitions>
///     <definition id="def:1" class="compliance">
///       <criteria><criterion test_ref="tst:1"/></criteria>
///     </definition>
///   </definitions>
/// </oval_definitions>"#;
///
/// let document = ovalscan::document::parse(xml).unwrap();
/// assert_eq!(document.definitions().len(), 1);
/// ```
pub fn parse(raw: &[u8]) -> Result<Document, ParseError> {
    let text = std::str::from_utf8(raw)?;
    let xml = roxmltree::Document::parse(text)?;
    let root = xml.root_element();

    if root.tag_name().name() != ROOT {
        return Err(ParseError::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
        });
    }

    let definitions = child(root, "definitions")
        .ok_or(ParseError::MissingDefinitions)?
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "definition")
        .map(parse_definition)
        .collect::<Result<Vec<_>, _>>()?;

    let tests = section(root, "tests")
        .map(parse_test)
        .collect::<Result<Vec<_>, _>>()?;
    let objects = section(root, "objects")
        .map(parse_object)
        .collect::<Result<Vec<_>, _>>()?;
    let states = section(root, "states")
        .map(parse_state)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        definitions = definitions.len(),
        tests = tests.len(),
        objects = objects.len(),
        states = states.len(),
        "Parsed definitions document"
    );

    Document::new(definitions, tests, objects, states)
}

fn parse_definition(node: Node<'_, '_>) -> Result<Definition, ParseError> {
    let id = required_attribute(node, "id")?;
    let class = node.attribute("class").unwrap_or_default().to_string();

    let metadata = child(node, "metadata")
        .map(|meta| Metadata {
            title: child_text(meta, "title"),
            description: child_text(meta, "description"),
        })
        .unwrap_or_default();

    let criteria = child(node, "criteria").ok_or_else(|| ParseError::MissingElement {
        owner: id.clone(),
        element: "criteria",
    })?;

    Ok(Definition {
        version: node.attribute("version").map(str::to_string),
        class,
        metadata,
        criteria: parse_criteria_node(criteria)?,
        id,
    })
}

fn parse_criteria_node(node: Node<'_, '_>) -> Result<CriteriaNode, ParseError> {
    let negate = flag(node, "negate");
    let comment = node.attribute("comment").map(str::to_string);

    match node.tag_name().name() {
        "criterion" => Ok(CriteriaNode::Criterion {
            test_ref: required_attribute(node, "test_ref")?,
            negate,
            comment,
        }),
        "criteria" => {
            let operator = node
                .attribute("operator")
                .map(CriteriaOperator::parse)
                .unwrap_or_default();
            let children = elements(node)
                .map(parse_criteria_node)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CriteriaNode::Criteria {
                operator,
                negate,
                comment,
                children,
            })
        }
        other => Ok(CriteriaNode::Unsupported {
            element: other.to_string(),
            negate,
        }),
    }
}

fn parse_test(node: Node<'_, '_>) -> Result<Test, ParseError> {
    let id = required_attribute(node, "id")?;

    // A missing reference stays empty and surfaces as a resolution error.
    let object_ref = child(node, "object")
        .and_then(|object| object.attribute("object_ref"))
        .unwrap_or_default()
        .to_string();
    let state_ref = child(node, "state")
        .map(|state| state.attribute("state_ref").unwrap_or_default().to_string());

    if object_ref.is_empty() {
        debug!(test_id = %id, "Test has no object reference");
    }

    Ok(Test {
        family: CheckFamily::from_element(node.tag_name().name()),
        comment: node.attribute("comment").map(str::to_string),
        object_ref,
        state_ref,
        id,
    })
}

fn parse_object(node: Node<'_, '_>) -> Result<Object, ParseError> {
    let id = required_attribute(node, "id")?;
    let element = node.tag_name().name();
    let incomplete = |missing: &str| ObjectLocator::Incomplete {
        element: element.to_string(),
        missing: missing.to_string(),
    };

    let locator = match element {
        "registry_object" => match (child_text(node, "hive"), child_text(node, "key")) {
            (Some(hive), Some(key)) => ObjectLocator::Registry(RegistryLocator {
                hive: Hive::parse(&hive),
                key,
                name: child_text(node, "name"),
            }),
            (None, _) => incomplete("hive"),
            (Some(_), None) => incomplete("key"),
        },
        "file_object" => match (
            child_text(node, "filepath"),
            child_text(node, "path"),
            child_text(node, "filename"),
        ) {
            (Some(filepath), _, _) => ObjectLocator::File(FileLocator::new(filepath)),
            (None, Some(path), Some(filename)) => {
                ObjectLocator::File(FileLocator::join(&path, &filename))
            }
            (None, Some(path), None) => ObjectLocator::File(FileLocator::new(path)),
            (None, None, _) => incomplete("filepath"),
        },
        other => ObjectLocator::Unsupported {
            element: other.to_string(),
        },
    };

    Ok(Object { id, locator })
}

fn parse_state(node: Node<'_, '_>) -> Result<State, ParseError> {
    let id = required_attribute(node, "id")?;
    let state_operation = node.attribute("operation");

    let entities = elements(node)
        .map(|field| StateEntity {
            field: field.tag_name().name().to_string(),
            expected: field.text().unwrap_or_default().trim().to_string(),
            operation: field
                .attribute("operation")
                .or(state_operation)
                .map(Operation::parse)
                .unwrap_or_default(),
            datatype: field
                .attribute("datatype")
                .map(Datatype::parse)
                .unwrap_or_default(),
        })
        .collect();

    Ok(State {
        id,
        element: node.tag_name().name().to_string(),
        entities,
    })
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

fn section<'a, 'input>(
    root: Node<'a, 'input>,
    name: &str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    child(root, name).into_iter().flat_map(elements)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).map(|n| n.text().unwrap_or_default().trim().to_string())
}

fn required_attribute(node: Node<'_, '_>, attribute: &'static str) -> Result<String, ParseError> {
    node.attribute(attribute)
        .map(str::to_string)
        .ok_or_else(|| ParseError::MissingAttribute {
            element: describe(node),
            attribute,
        })
}

fn flag(node: Node<'_, '_>, attribute: &str) -> bool {
    matches!(node.attribute(attribute).map(str::trim), Some("true" | "1"))
}

fn describe(node: Node<'_, '_>) -> String {
    match node.attribute("id") {
        Some(id) => format!("{} '{}'", node.tag_name().name(), id),
        None => node.tag_name().name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ReferenceKind;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<oval_definitions xmlns="http://oval.mitre.org/XMLSchema/oval-definitions-5"
    xmlns:win-def="http://oval.mitre.org/XMLSchema/oval-definitions-5#windows"
    xmlns:ind-def="http://oval.mitre.org/XMLSchema/oval-definitions-5#independent">
  <definitions>
    <definition id="oval:test:def:1" version="2" class="compliance">
      <metadata>
        <title>Feature enabled and marker present</title>
        <description>Checks a registry flag and a marker file.</description>
      </metadata>
      <criteria operator="AND" comment="both must hold">
        <criterion test_ref="oval:test:tst:1"/>
        <criteria operator="OR" negate="true">
          <criterion test_ref="oval:test:tst:2" negate="true" comment="marker"/>
          <extend_definition definition_ref="oval:test:def:9"/>
        </criteria>
      </criteria>
    </definition>
  </definitions>
  <tests>
    <win-def:registry_test id="oval:test:tst:1" comment="flag">
      <win-def:object object_ref="oval:test:obj:1"/>
      <win-def:state state_ref="oval:test:ste:1"/>
    </win-def:registry_test>
    <ind-def:file_test id="oval:test:tst:2">
      <ind-def:object object_ref="oval:test:obj:2"/>
    </ind-def:file_test>
  </tests>
  <objects>
    <win-def:registry_object id="oval:test:obj:1">
      <win-def:hive>HKEY_LOCAL_MACHINE</win-def:hive>
      <win-def:key>Software\Test</win-def:key>
      <win-def:name>Enabled</win-def:name>
    </win-def:registry_object>
    <ind-def:file_object id="oval:test:obj:2">
      <ind-def:path>C:\</ind-def:path>
      <ind-def:filename>marker.txt</ind-def:filename>
    </ind-def:file_object>
  </objects>
  <states>
    <win-def:registry_state id="oval:test:ste:1">
      <win-def:value operation="equals" datatype="int">1</win-def:value>
    </win-def:registry_state>
  </states>
</oval_definitions>"#;

    #[test]
    fn test_parse_namespaced_document() {
        let document = parse(SAMPLE.as_bytes()).unwrap();

        let definition = &document.definitions()[0];
        assert_eq!(definition.id, "oval:test:def:1");
        assert_eq!(definition.version.as_deref(), Some("2"));
        assert_eq!(definition.class, "compliance");
        assert_eq!(
            definition.metadata.title.as_deref(),
            Some("Feature enabled and marker present")
        );
        assert_eq!(
            definition.criteria.test_refs(),
            vec!["oval:test:tst:1", "oval:test:tst:2"]
        );

        let registry = document.test("oval:test:tst:1").unwrap();
        assert_eq!(registry.family, CheckFamily::Registry);
        assert_eq!(registry.state_ref.as_deref(), Some("oval:test:ste:1"));
        assert_eq!(registry.comment.as_deref(), Some("flag"));

        let file = document.test("oval:test:tst:2").unwrap();
        assert_eq!(file.family, CheckFamily::File);
        assert!(file.state_ref.is_none());
    }

    #[test]
    fn test_parse_criteria_shape() {
        let document = parse(SAMPLE.as_bytes()).unwrap();
        let CriteriaNode::Criteria {
            operator,
            negate,
            comment,
            children,
        } = &document.definitions()[0].criteria
        else {
            panic!("root must be an internal node");
        };

        assert_eq!(*operator, CriteriaOperator::And);
        assert!(!negate);
        assert_eq!(comment.as_deref(), Some("both must hold"));
        assert_eq!(children.len(), 2);

        let nested = &children[1];
        assert!(nested.is_negated());
        let CriteriaNode::Criteria { children, .. } = nested else {
            panic!("second child must be an internal node");
        };
        assert!(children[0].is_negated());
        assert!(matches!(
            &children[1],
            CriteriaNode::Unsupported { element, .. } if element == "extend_definition"
        ));
    }

    #[test]
    fn test_parse_objects_and_states() {
        let document = parse(SAMPLE.as_bytes()).unwrap();

        match &document.object("oval:test:obj:1").unwrap().locator {
            ObjectLocator::Registry(registry) => {
                assert_eq!(registry.hive, Hive::HkeyLocalMachine);
                assert_eq!(registry.key, "Software\\Test");
                assert_eq!(registry.name.as_deref(), Some("Enabled"));
            }
            other => panic!("unexpected locator {other:?}"),
        }

        match &document.object("oval:test:obj:2").unwrap().locator {
            ObjectLocator::File(file) => assert_eq!(file.path, "C:\\marker.txt"),
            other => panic!("unexpected locator {other:?}"),
        }

        let entity = document
            .state("oval:test:ste:1")
            .and_then(|s| s.entity("value"))
            .unwrap();
        assert_eq!(entity.field, "value");
        assert_eq!(entity.expected, "1");
        assert_eq!(entity.operation, Operation::Equals);
        assert_eq!(entity.datatype, Datatype::Int);
    }

    #[test]
    fn test_state_operation_falls_back_to_state_attribute() {
        let xml = br#"<oval_definitions>
  <definitions/>
  <states>
    <registry_state id="s1" operation="contains"><value>Pro</value></registry_state>
    <file_state id="s2"/>
  </states>
</oval_definitions>"#;
        let document = parse(xml).unwrap();

        let entity = document.state("s1").and_then(|s| s.entity("value")).unwrap();
        assert_eq!(entity.operation, Operation::Contains);
        assert_eq!(entity.datatype, Datatype::String);
        assert!(document.state("s2").unwrap().entities.is_empty());
    }

    #[test]
    fn test_state_keeps_every_entity() {
        let xml = br#"<oval_definitions>
  <definitions/>
  <states>
    <registry_state id="s1">
      <hive>HKEY_LOCAL_MACHINE</hive>
      <type>reg_sz</type>
      <value operation="pattern match">
        Windows * Pro
      </value>
    </registry_state>
  </states>
</oval_definitions>"#;
        let state = parse(xml).unwrap().state("s1").cloned().unwrap();

        assert_eq!(state.fields(), vec!["hive", "type", "value"]);
        let value = state.entity("value").unwrap();
        assert_eq!(value.expected, "Windows * Pro");
        assert_eq!(value.operation, Operation::PatternMatch);
        assert_eq!(state.entity("type").unwrap().expected, "reg_sz");
    }

    #[test]
    fn test_incomplete_items_do_not_abort_the_parse() {
        let xml = br#"<oval_definitions>
  <definitions>
    <definition id="d1"><criteria><criterion test_ref="t1"/></criteria></definition>
  </definitions>
  <tests>
    <registry_test id="t1"/>
    <file_test id="t2"><object/><state/></file_test>
  </tests>
  <objects>
    <registry_object id="o1"><key>Software\Test</key></registry_object>
    <registry_object id="o2"><hive>HKLM</hive></registry_object>
    <file_object id="o3"><filename>marker.txt</filename></file_object>
  </objects>
</oval_definitions>"#;
        let document = parse(xml).unwrap();

        assert_eq!(document.definitions()[0].class, "");
        assert_eq!(document.test("t1").unwrap().object_ref, "");
        let t2 = document.test("t2").unwrap();
        assert_eq!(t2.object_ref, "");
        assert_eq!(t2.state_ref.as_deref(), Some(""));

        let missing = |id: &str| match &document.object(id).unwrap().locator {
            ObjectLocator::Incomplete { missing, .. } => missing.clone(),
            other => panic!("unexpected locator {other:?}"),
        };
        assert_eq!(missing("o1"), "hive");
        assert_eq!(missing("o2"), "key");
        assert_eq!(missing("o3"), "filepath");
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = parse(b"<oval_definitions><definitions>").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = parse(&[0x3c, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
    }

    #[test]
    fn test_wrong_root_is_parse_error() {
        let err = parse(b"<scap_content/>").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedRoot { found } if found == "scap_content"));
    }

    #[test]
    fn test_missing_definitions_container() {
        let err = parse(b"<oval_definitions><tests/></oval_definitions>").unwrap_err();
        assert!(matches!(err, ParseError::MissingDefinitions));
    }

    #[test]
    fn test_definition_without_criteria() {
        let xml = br#"<oval_definitions><definitions>
            <definition id="d1" class="compliance"/>
        </definitions></oval_definitions>"#;
        let err = parse(xml).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingElement { ref owner, element: "criteria" } if owner == "d1"
        ));
    }

    #[test]
    fn test_missing_test_ref_attribute() {
        let xml = br#"<oval_definitions><definitions>
            <definition id="d1" class="compliance"><criteria><criterion/></criteria></definition>
        </definitions></oval_definitions>"#;
        let err = parse(xml).unwrap_err();
        assert!(matches!(err, ParseError::MissingAttribute { attribute: "test_ref", .. }));
    }

    #[test]
    fn test_duplicate_object_ids() {
        let xml = br#"<oval_definitions><definitions/>
          <objects>
            <file_object id="o1"><filepath>/a</filepath></file_object>
            <file_object id="o1"><filepath>/b</filepath></file_object>
          </objects>
        </oval_definitions>"#;
        let err = parse(xml).unwrap_err();
        assert!(matches!(
            err,
            ParseError::DuplicateId { kind: ReferenceKind::Object, .. }
        ));
    }

    #[test]
    fn test_unknown_families_are_preserved() {
        let xml = br#"<oval_definitions><definitions/>
          <tests>
            <process_test id="t1"><object object_ref="o1"/></process_test>
          </tests>
          <objects>
            <process_object id="o1"><command>sshd</command></process_object>
            <registry_object id="o2"><hive>HKFOO</hive><key>k</key></registry_object>
          </objects>
        </oval_definitions>"#;
        let document = parse(xml).unwrap();

        assert_eq!(
            document.test("t1").unwrap().family,
            CheckFamily::Unsupported("process_test".to_string())
        );
        assert!(matches!(
            document.object("o1").unwrap().locator,
            ObjectLocator::Unsupported { .. }
        ));
        match &document.object("o2").unwrap().locator {
            ObjectLocator::Registry(registry) => {
                assert!(!registry.hive.is_recognized());
                assert!(registry.name.is_none());
            }
            other => panic!("unexpected locator {other:?}"),
        }
    }
}
