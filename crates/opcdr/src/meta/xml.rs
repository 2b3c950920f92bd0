// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Markup reader (roxmltree) and writer.

use roxmltree::{Document, Node};

use super::{MetaData, MetaError, MetaType, Member, Module, Struct, META_VERSION};
use crate::ops::PrimKind;

const PRIM_TAGS: [(&str, PrimKind); 10] = [
    ("Octet", PrimKind::U8),
    ("Char", PrimKind::I8),
    ("Short", PrimKind::I16),
    ("UShort", PrimKind::U16),
    ("Long", PrimKind::I32),
    ("ULong", PrimKind::U32),
    ("LongLong", PrimKind::I64),
    ("ULongLong", PrimKind::U64),
    ("Float", PrimKind::F32),
    ("Double", PrimKind::F64),
];

fn prim_tag(kind: PrimKind) -> &'static str {
    PRIM_TAGS
        .iter()
        .find(|(_, k)| *k == kind)
        .map_or("Octet", |(tag, _)| tag)
}

// =======================================================================
// Parse
// =======================================================================

pub(super) fn parse(text: &str) -> Result<MetaData, MetaError> {
    let doc = Document::parse(text).map_err(|err| MetaError::Xml(err.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "MetaData" {
        return Err(unexpected(&root, "document"));
    }
    let version = required(&root, "version")?;
    if version != META_VERSION {
        return Err(MetaError::UnsupportedVersion(version.to_owned()));
    }

    let mut meta = MetaData::new();
    parse_scope(&root, &mut meta.root)?;
    Ok(meta)
}

fn elements<'a, 'input>(node: &Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn unexpected(node: &Node<'_, '_>, context: &'static str) -> MetaError {
    MetaError::UnexpectedElement {
        element: node.tag_name().name().to_owned(),
        context,
    }
}

fn required<'a>(node: &Node<'a, '_>, attribute: &'static str) -> Result<&'a str, MetaError> {
    node.attribute(attribute)
        .ok_or_else(|| MetaError::MissingAttribute {
            element: node.tag_name().name().to_owned(),
            attribute,
        })
}

fn numeric(node: &Node<'_, '_>, attribute: &'static str) -> Result<u32, MetaError> {
    let raw = required(node, attribute)?;
    raw.parse().map_err(|_| MetaError::InvalidAttribute {
        element: node.tag_name().name().to_owned(),
        attribute,
        value: raw.to_owned(),
    })
}

fn parse_scope(node: &Node<'_, '_>, module: &mut Module) -> Result<(), MetaError> {
    for child in elements(node) {
        match child.tag_name().name() {
            "Module" => {
                let mut sub = Module::named(required(&child, "name")?);
                parse_scope(&child, &mut sub)?;
                module.modules.push(sub);
            }
            "Struct" => module.structs.push(parse_struct(&child)?),
            _ => return Err(unexpected(&child, "module")),
        }
    }
    Ok(())
}

fn parse_struct(node: &Node<'_, '_>) -> Result<Struct, MetaError> {
    let mut members = Vec::new();
    for child in elements(node) {
        if child.tag_name().name() != "Member" {
            return Err(unexpected(&child, "struct"));
        }
        members.push(Member {
            name: required(&child, "name")?.to_owned(),
            ty: parse_single_type(&child)?,
        });
    }
    Ok(Struct {
        name: required(node, "name")?.to_owned(),
        members,
    })
}

/// The one type element nested inside `node`.
fn parse_single_type(node: &Node<'_, '_>) -> Result<MetaType, MetaError> {
    let mut children = elements(node);
    let first = children.next().ok_or_else(|| MetaError::Mismatch {
        path: node.attribute("name").unwrap_or_default().to_owned(),
        reason: format!("<{}> has no type", node.tag_name().name()),
    })?;
    if let Some(extra) = children.next() {
        return Err(unexpected(&extra, "type position"));
    }
    parse_type(&first)
}

fn parse_type(node: &Node<'_, '_>) -> Result<MetaType, MetaError> {
    let tag = node.tag_name().name();
    if let Some((_, kind)) = PRIM_TAGS.iter().find(|(t, _)| *t == tag) {
        return Ok(MetaType::Prim(*kind));
    }
    match tag {
        "Boolean" => Ok(MetaType::Boolean),
        "String" => Ok(MetaType::String {
            length: match node.attribute("length") {
                Some(_) => Some(numeric(node, "length")?),
                None => None,
            },
        }),
        "Sequence" => Ok(MetaType::Sequence(Box::new(parse_single_type(node)?))),
        "Array" => Ok(MetaType::Array {
            size: numeric(node, "size")?,
            elem: Box::new(parse_single_type(node)?),
        }),
        "Type" => Ok(MetaType::Type {
            name: required(node, "name")?.to_owned(),
        }),
        _ => Err(unexpected(node, "type position")),
    }
}

// =======================================================================
// Render
// =======================================================================

pub(super) fn render(meta: &MetaData) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("<MetaData version=\"");
    out.push_str(META_VERSION);
    out.push_str("\">");
    render_scope(&meta.root, &mut out);
    out.push_str("</MetaData>");
    out
}

fn push_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn open_named(out: &mut String, tag: &str, name: &str) {
    out.push('<');
    out.push_str(tag);
    out.push_str(" name=\"");
    push_attr(out, name);
    out.push_str("\">");
}

fn render_scope(module: &Module, out: &mut String) {
    for def in &module.structs {
        open_named(out, "Struct", &def.name);
        for member in &def.members {
            open_named(out, "Member", &member.name);
            render_type(&member.ty, out);
            out.push_str("</Member>");
        }
        out.push_str("</Struct>");
    }
    for sub in &module.modules {
        open_named(out, "Module", &sub.name);
        render_scope(sub, out);
        out.push_str("</Module>");
    }
}

fn render_type(ty: &MetaType, out: &mut String) {
    match ty {
        MetaType::Prim(kind) => {
            out.push('<');
            out.push_str(prim_tag(*kind));
            out.push_str("/>");
        }
        MetaType::Boolean => out.push_str("<Boolean/>"),
        MetaType::String { length: None } => out.push_str("<String/>"),
        MetaType::String { length: Some(n) } => {
            out.push_str(&format!("<String length=\"{}\"/>", n));
        }
        MetaType::Sequence(elem) => {
            out.push_str("<Sequence>");
            render_type(elem, out);
            out.push_str("</Sequence>");
        }
        MetaType::Array { size, elem } => {
            out.push_str(&format!("<Array size=\"{}\">", size));
            render_type(elem, out);
            out.push_str("</Array>");
        }
        MetaType::Type { name } => {
            out.push_str("<Type name=\"");
            push_attr(out, name);
            out.push_str("\"/>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_types() {
        let text = "<MetaData version=\"1.0.0\"><Module name=\"M\"><Struct name=\"S\">\
            <Member name=\"grid\"><Array size=\"2\"><Array size=\"3\"><Double/></Array></Array></Member>\
            <Member name=\"names\"><Sequence><String length=\"8\"/></Sequence></Member>\
            </Struct></Module></MetaData>";
        let meta = parse(text).expect("parse");
        let (scope, def) = meta.find_struct("M::S").expect("struct");
        assert_eq!(scope, vec!["M".to_owned()]);
        assert_eq!(
            def.members[0].ty,
            MetaType::Array {
                size: 2,
                elem: Box::new(MetaType::Array {
                    size: 3,
                    elem: Box::new(MetaType::Prim(PrimKind::F64)),
                }),
            }
        );
        assert_eq!(
            def.members[1].ty,
            MetaType::Sequence(Box::new(MetaType::String { length: Some(8) }))
        );
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let text = r#"
            <MetaData version="1.0.0">
              <Struct name="Flat">
                <Member name="b"><Boolean/></Member>
              </Struct>
            </MetaData>"#;
        let meta = parse(text).expect("parse");
        assert_eq!(
            meta.render(),
            "<MetaData version=\"1.0.0\"><Struct name=\"Flat\"><Member name=\"b\"><Boolean/></Member></Struct></MetaData>"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("<MetaData"), Err(MetaError::Xml(_))));
        assert_eq!(
            parse("<MetaData version=\"2.0\"/>"),
            Err(MetaError::UnsupportedVersion("2.0".into()))
        );
        assert!(matches!(
            parse("<Types version=\"1.0.0\"/>"),
            Err(MetaError::UnexpectedElement { .. })
        ));
        assert!(matches!(
            parse("<MetaData version=\"1.0.0\"><Struct name=\"S\"><Member name=\"a\"><Array><Long/></Array></Member></Struct></MetaData>"),
            Err(MetaError::MissingAttribute { attribute: "size", .. })
        ));
        assert!(matches!(
            parse("<MetaData version=\"1.0.0\"><Struct name=\"S\"><Member name=\"a\"><Array size=\"x\"><Long/></Array></Member></Struct></MetaData>"),
            Err(MetaError::InvalidAttribute { attribute: "size", .. })
        ));
        assert!(matches!(
            parse("<MetaData version=\"1.0.0\"><Struct name=\"S\"><Member name=\"a\"><Wide/></Member></Struct></MetaData>"),
            Err(MetaError::UnexpectedElement { .. })
        ));
    }

    #[test]
    fn test_render_escapes_attributes() {
        let mut meta = MetaData::new();
        meta.insert_struct(
            &[],
            Struct {
                name: "A<B>".into(),
                members: Vec::new(),
            },
        );
        assert_eq!(
            meta.render(),
            "<MetaData version=\"1.0.0\"><Struct name=\"A&lt;B&gt;\"></Struct></MetaData>"
        );
    }
}
