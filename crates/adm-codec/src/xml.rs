//! XML tree backend built on `quick-xml`.

use std::io::{Cursor, Write};

use adm_model::TreeNode;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::backend::TreeBackend;
use crate::error::{CodecError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXmlBackend;

impl QuickXmlBackend {
    pub fn new() -> Self {
        Self
    }
}

fn backend_err(err: impl std::fmt::Display) -> CodecError {
    CodecError::Backend(err.to_string())
}

fn open(start: &BytesStart<'_>) -> Result<TreeNode> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(backend_err)?
        .to_string();
    let mut node = TreeNode::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(backend_err)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(backend_err)?
            .to_string();
        let value = attr.unescape_value().map_err(backend_err)?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn close(node: TreeNode, stack: &mut [TreeNode], root: &mut Option<TreeNode>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(CodecError::Backend("more than one root element".into())),
    }
    Ok(())
}

fn append_text(stack: &mut [TreeNode], text: &str) -> Result<()> {
    let node = stack
        .last_mut()
        .ok_or_else(|| CodecError::Backend("text outside the root element".into()))?;
    match &mut node.text {
        Some(existing) => existing.push_str(text),
        None => node.text = Some(text.to_string()),
    }
    Ok(())
}

/// Indentation between elements is not content. Whitespace outside the root,
/// or after a node's first child, is dropped.
fn is_layout(stack: &[TreeNode], text: &str) -> bool {
    let blank = text.chars().all(char::is_whitespace);
    blank && stack.last().map_or(true, |node| !node.children.is_empty())
}

/// Finish a node closed by an end tag. `<a></a>` keeps an empty text,
/// and blank text around child elements is dropped.
fn finish(mut node: TreeNode) -> TreeNode {
    if node.children.is_empty() {
        node.text.get_or_insert_with(String::new);
    } else if node
        .text
        .as_deref()
        .is_some_and(|text| text.chars().all(char::is_whitespace))
    {
        node.text = None;
    }
    node
}

impl TreeBackend for QuickXmlBackend {
    fn name(&self) -> &str {
        "quick-xml"
    }

    fn parse(&self, text: &[u8]) -> Result<TreeNode> {
        let text = std::str::from_utf8(text).map_err(backend_err)?;
        let mut reader = Reader::from_str(text);

        let mut stack: Vec<TreeNode> = Vec::new();
        let mut root = None;
        loop {
            match reader.read_event().map_err(backend_err)? {
                Event::Start(start) => stack.push(open(&start)?),
                Event::Empty(start) => {
                    let node = open(&start)?;
                    close(node, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| CodecError::Backend("unbalanced end tag".into()))?;
                    close(finish(node), &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(backend_err)?;
                    if !is_layout(&stack, &value) {
                        append_text(&mut stack, &value)?;
                    }
                }
                Event::CData(data) => {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    append_text(&mut stack, &value)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype.
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(CodecError::Backend(format!("unclosed element <{}>", open.name)));
        }
        root.ok_or_else(|| CodecError::Backend("document has no root element".into()))
    }

    fn serialize(&self, root: &TreeNode, indent: usize) -> Result<Vec<u8>> {
        let mut writer = if indent > 0 {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(backend_err)?;
        write_node(&mut writer, root)?;
        Ok(writer.into_inner().into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        TreeNode::new("root")
            .with_attr("version", "2")
            .with_child(
                TreeNode::new("item")
                    .with_attr("label", "a < b & \"c\"")
                    .with_text("x & y"),
            )
            .with_child(TreeNode::new("empty"))
            .with_child(TreeNode::new("nested").with_child(TreeNode::new("leaf").with_text("1.5")))
    }

    #[test]
    fn test_serialize_then_parse() {
        let backend = QuickXmlBackend::new();
        for indent in [0, 2] {
            let text = backend.serialize(&sample(), indent).unwrap();
            assert!(text.starts_with(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
            assert_eq!(backend.parse(&text).unwrap(), sample());
        }
    }

    #[test]
    fn test_parse_skips_comments_and_reads_cdata() {
        let text = br#"<?xml version="1.0"?>
            <!-- generated -->
            <a k="v"><b><![CDATA[raw <text>]]></b><c/></a>"#;
        let tree = QuickXmlBackend.parse(text).unwrap();
        assert_eq!(tree.attr("k"), Some("v"));
        assert_eq!(tree.child_text("b"), Some("raw <text>"));
        assert!(tree.child("c").is_some());
    }

    #[test]
    fn test_text_whitespace_is_preserved() {
        let backend = QuickXmlBackend;
        let tree = TreeNode::new("root")
            .with_child(TreeNode::new("padded").with_text("  two words \n"))
            .with_child(TreeNode::new("blank").with_text("   "))
            .with_child(TreeNode::new("cleared").with_text(""))
            .with_child(TreeNode::new("absent"));
        for indent in [0, 4] {
            let text = backend.serialize(&tree, indent).unwrap();
            assert_eq!(backend.parse(&text).unwrap(), tree, "indent {indent}");
        }
    }

    #[test]
    fn test_parse_drops_layout_whitespace() {
        let text = b"\n<a>\n  <b> x </b>\n  <c></c>\n  <d/>\n</a>\n";
        let tree = QuickXmlBackend.parse(text).unwrap();
        assert_eq!(tree.text, None);
        assert_eq!(tree.child_text("b"), Some(" x "));
        assert_eq!(tree.child_text("c"), Some(""));
        assert_eq!(tree.child("d").and_then(|d| d.text.as_deref()), None);
        assert!(matches!(
            QuickXmlBackend.parse(b"<a/>stray"),
            Err(CodecError::Backend(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        let backend = QuickXmlBackend;
        for text in [
            &b""[..],
            b"<a>",
            b"<a></b>",
            b"<a/><b/>",
            b"\xff\xfe",
        ] {
            assert!(
                matches!(backend.parse(text), Err(CodecError::Backend(_))),
                "{:?} should fail",
                String::from_utf8_lossy(text)
            );
        }
    }
}
