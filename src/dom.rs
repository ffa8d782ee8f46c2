//! Sandbox document backed by an html5ever `RcDom` tree.
//!
//! Scripts never hold tree handles directly. Every node they can see is
//! registered in a table and addressed by a numeric [`NodeId`]; ids stay
//! stable for the life of the node even when its handle is swapped.

use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, parse_fragment, Attribute, LocalName, Namespace, QualName};
use indexmap::IndexMap;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use tendril::StrTendril;
use thiserror::Error;

pub type NodeId = u32;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

const BLANK_DOCUMENT: &str = "<!DOCTYPE html><html><head></head><body></body></html>";

/// DOM `nodeType` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("no node with id {0}")]
    UnknownNode(NodeId),

    #[error("HierarchyRequestError: {0}")]
    HierarchyRequest(&'static str),

    #[error("NotFoundError: the node to be removed is not a child of this node")]
    NotFound,

    #[error("failed to serialize node: {0}")]
    Serialize(String),
}

pub type DomResult<T> = std::result::Result<T, DomError>;

/// A detached, deep copy of an element taken after rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub tag_name: String,
    pub attributes: IndexMap<String, String>,
    pub text_content: String,
    pub outer_html: String,
    pub children: Vec<ElementSnapshot>,
}

impl ElementSnapshot {
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

pub struct Document {
    root: Handle,
    html: Handle,
    head: Handle,
    body: Handle,
    handles: Vec<Option<Handle>>,
    ids: HashMap<*const Node, NodeId>,
    fragments: HashSet<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(BLANK_DOCUMENT);
        let root = dom.document;
        let html = find_element(&root, "html").unwrap_or_else(|| {
            let html = new_element(HTML_NAMESPACE, "html");
            append(&root, &html);
            html
        });
        let head = find_element(&html, "head").unwrap_or_else(|| {
            let head = new_element(HTML_NAMESPACE, "head");
            append(&html, &head);
            head
        });
        let body = find_element(&html, "body").unwrap_or_else(|| {
            let body = new_element(HTML_NAMESPACE, "body");
            append(&html, &body);
            body
        });

        let mut document = Self {
            root: root.clone(),
            html: html.clone(),
            head: head.clone(),
            body: body.clone(),
            handles: Vec::new(),
            ids: HashMap::new(),
            fragments: HashSet::new(),
        };
        for handle in [&root, &html, &head, &body] {
            document.register(handle);
        }
        document
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NODE TABLE
    // ═══════════════════════════════════════════════════════════════════════════

    fn register(&mut self, handle: &Handle) -> NodeId {
        if let Some(id) = self.ids.get(&Rc::as_ptr(handle)) {
            return *id;
        }
        let id = self.handles.len() as NodeId;
        self.handles.push(Some(handle.clone()));
        self.ids.insert(Rc::as_ptr(handle), id);
        id
    }

    fn handle(&self, id: NodeId) -> DomResult<Handle> {
        self.handles
            .get(id as usize)
            .and_then(Option::clone)
            .ok_or(DomError::UnknownNode(id))
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.handle(id).is_ok()
    }

    pub fn document_id(&self) -> NodeId {
        self.ids[&Rc::as_ptr(&self.root)]
    }

    pub fn document_element_id(&self) -> NodeId {
        self.ids[&Rc::as_ptr(&self.html)]
    }

    pub fn head_id(&self) -> NodeId {
        self.ids[&Rc::as_ptr(&self.head)]
    }

    pub fn body_id(&self) -> NodeId {
        self.ids[&Rc::as_ptr(&self.body)]
    }

    /// Drops table entries for nodes no longer connected to the document.
    /// Returns the released ids.
    pub fn sweep_detached(&mut self) -> Vec<NodeId> {
        let mut released = Vec::new();
        for id in 0..self.handles.len() {
            let Some(handle) = self.handles[id].clone() else {
                continue;
            };
            if !is_connected(&handle, &self.root) {
                self.ids.remove(&Rc::as_ptr(&handle));
                self.handles[id] = None;
                self.fragments.remove(&(id as NodeId));
                released.push(id as NodeId);
            }
        }
        released
    }

    /// Number of live table entries.
    pub fn tracked_nodes(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }

    /// Empties `<head>` and `<body>` and forgets every other node.
    pub fn clear(&mut self) {
        for container in [&self.head, &self.body] {
            let children: Vec<Handle> = container.children.borrow_mut().drain(..).collect();
            for child in children {
                child.parent.set(None);
            }
        }
        self.sweep_detached();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CREATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTML elements are created with ASCII-lowercased names.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let handle = new_element(HTML_NAMESPACE, &tag.to_ascii_lowercase());
        self.register(&handle)
    }

    pub fn create_element_ns(&mut self, namespace: &str, tag: &str) -> NodeId {
        let handle = new_element(namespace, tag);
        self.register(&handle)
    }

    pub fn create_text_node(&mut self, data: &str) -> NodeId {
        let handle = Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from(data)),
        });
        self.register(&handle)
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        let handle = Node::new(NodeData::Comment {
            contents: StrTendril::from(data),
        });
        self.register(&handle)
    }

    pub fn create_document_fragment(&mut self) -> NodeId {
        let handle = Node::new(NodeData::Document);
        let id = self.register(&handle);
        self.fragments.insert(id);
        id
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSPECTION
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn node_type(&self, id: NodeId) -> DomResult<NodeType> {
        let handle = self.handle(id)?;
        Ok(match &handle.data {
            NodeData::Document if self.fragments.contains(&id) => NodeType::DocumentFragment,
            NodeData::Document => NodeType::Document,
            NodeData::Doctype { .. } => NodeType::DocumentType,
            NodeData::Text { .. } => NodeType::Text,
            NodeData::Comment { .. } => NodeType::Comment,
            NodeData::Element { .. } => NodeType::Element,
            NodeData::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
        })
    }

    pub fn node_name(&self, id: NodeId) -> DomResult<String> {
        let handle = self.handle(id)?;
        Ok(match &handle.data {
            NodeData::Element { name, .. } => element_tag_name(name),
            NodeData::Text { .. } => "#text".to_string(),
            NodeData::Comment { .. } => "#comment".to_string(),
            NodeData::Document if self.fragments.contains(&id) => "#document-fragment".to_string(),
            NodeData::Document => "#document".to_string(),
            NodeData::Doctype { name, .. } => name.to_string(),
            NodeData::ProcessingInstruction { target, .. } => target.to_string(),
        })
    }

    pub fn namespace_uri(&self, id: NodeId) -> DomResult<Option<String>> {
        let handle = self.handle(id)?;
        Ok(match &handle.data {
            NodeData::Element { name, .. } => Some(name.ns.to_string()),
            _ => None,
        })
    }

    pub fn parent(&mut self, id: NodeId) -> DomResult<Option<NodeId>> {
        let handle = self.handle(id)?;
        Ok(parent_of(&handle).map(|p| self.register(&p)))
    }

    pub fn child_nodes(&mut self, id: NodeId) -> DomResult<Vec<NodeId>> {
        let handle = self.handle(id)?;
        let children: Vec<Handle> = handle.children.borrow().clone();
        Ok(children.iter().map(|c| self.register(c)).collect())
    }

    pub fn children(&mut self, id: NodeId) -> DomResult<Vec<NodeId>> {
        let handle = self.handle(id)?;
        let children: Vec<Handle> = handle
            .children
            .borrow()
            .iter()
            .filter(|c| is_element(c))
            .cloned()
            .collect();
        Ok(children.iter().map(|c| self.register(c)).collect())
    }

    pub fn first_element_child(&mut self, id: NodeId) -> DomResult<Option<NodeId>> {
        Ok(self.children(id)?.first().copied())
    }

    pub fn is_connected(&self, id: NodeId) -> DomResult<bool> {
        Ok(is_connected(&self.handle(id)?, &self.root))
    }

    /// Whether `other` is `id` or one of its descendants.
    pub fn contains(&self, id: NodeId, other: NodeId) -> DomResult<bool> {
        let ancestor = self.handle(id)?;
        let mut current = Some(self.handle(other)?);
        while let Some(node) = current {
            if Rc::ptr_eq(&node, &ancestor) {
                return Ok(true);
            }
            current = parent_of(&node);
        }
        Ok(false)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATION
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` before `reference`, or last when `reference` is `None`.
    /// Fragments are emptied into the target.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let parent_handle = self.handle(parent)?;
        let child_handle = self.handle(child)?;
        let reference_handle = reference.map(|r| self.handle(r)).transpose()?;

        if matches!(child_handle.data, NodeData::Document) && !self.fragments.contains(&child) {
            return Err(DomError::HierarchyRequest("a document cannot be inserted"));
        }
        if !can_have_children(&parent_handle) {
            return Err(DomError::HierarchyRequest("this node type does not support children"));
        }
        if self.contains(child, parent)? {
            return Err(DomError::HierarchyRequest("the new child contains the parent"));
        }
        if let Some(reference) = &reference_handle {
            if !parent_of(reference).is_some_and(|p| Rc::ptr_eq(&p, &parent_handle)) {
                return Err(DomError::NotFound);
            }
        }

        let incoming: Vec<Handle> = if self.fragments.contains(&child) {
            child_handle.children.borrow().clone()
        } else {
            vec![child_handle]
        };
        for node in incoming {
            if reference_handle
                .as_ref()
                .is_some_and(|r| Rc::ptr_eq(r, &node))
            {
                continue;
            }
            detach(&node);
            let index = match &reference_handle {
                Some(reference) => parent_handle
                    .children
                    .borrow()
                    .iter()
                    .position(|c| Rc::ptr_eq(c, reference))
                    .unwrap_or(parent_handle.children.borrow().len()),
                None => parent_handle.children.borrow().len(),
            };
            node.parent.set(Some(Rc::downgrade(&parent_handle)));
            parent_handle.children.borrow_mut().insert(index, node);
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_handle = self.handle(parent)?;
        let child_handle = self.handle(child)?;
        if !parent_of(&child_handle).is_some_and(|p| Rc::ptr_eq(&p, &parent_handle)) {
            return Err(DomError::NotFound);
        }
        detach(&child_handle);
        Ok(())
    }

    pub fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> DomResult<()> {
        self.insert_before(parent, new_child, Some(old_child))?;
        self.remove_child(parent, old_child)
    }

    /// `ChildNode.remove()`: detaches the node if it has a parent.
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        detach(&self.handle(id)?);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CHARACTER DATA
    // ═══════════════════════════════════════════════════════════════════════════

    /// `textContent`; `None` for documents and doctypes.
    pub fn text_content(&self, id: NodeId) -> DomResult<Option<String>> {
        let handle = self.handle(id)?;
        Ok(match &handle.data {
            NodeData::Document if !self.fragments.contains(&id) => None,
            NodeData::Doctype { .. } => None,
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            NodeData::Comment { contents } => Some(contents.to_string()),
            NodeData::ProcessingInstruction { contents, .. } => Some(contents.to_string()),
            _ => {
                let mut out = String::new();
                collect_text(&handle, &mut out);
                Some(out)
            }
        })
    }

    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let handle = self.handle(id)?;
        match &handle.data {
            NodeData::Text { .. } | NodeData::Comment { .. } => self.set_node_value(id, text),
            NodeData::Element { .. } | NodeData::Document if can_have_children(&handle) => {
                let children: Vec<Handle> = handle.children.borrow_mut().drain(..).collect();
                for child in children {
                    child.parent.set(None);
                }
                if !text.is_empty() {
                    let text_id = self.create_text_node(text);
                    self.append_child(id, text_id)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// `nodeValue` / `data` for text and comment nodes.
    pub fn node_value(&self, id: NodeId) -> DomResult<Option<String>> {
        let handle = self.handle(id)?;
        Ok(match &handle.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            NodeData::Comment { contents } => Some(contents.to_string()),
            _ => None,
        })
    }

    pub fn set_node_value(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        let handle = self.handle(id)?;
        match &handle.data {
            NodeData::Text { contents } => {
                *contents.borrow_mut() = StrTendril::from(value);
            }
            NodeData::Comment { .. } => {
                // Comment data is immutable in the tree; swap in a new node
                // under the same id.
                let replacement = Node::new(NodeData::Comment {
                    contents: StrTendril::from(value),
                });
                if let Some(parent) = parent_of(&handle) {
                    let mut children = parent.children.borrow_mut();
                    if let Some(slot) = children.iter_mut().find(|c| Rc::ptr_eq(c, &handle)) {
                        *slot = replacement.clone();
                    }
                    replacement.parent.set(Some(Rc::downgrade(&parent)));
                }
                handle.parent.set(None);
                self.ids.remove(&Rc::as_ptr(&handle));
                self.ids.insert(Rc::as_ptr(&replacement), id);
                self.handles[id as usize] = Some(replacement);
            }
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn get_attribute(&self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let handle = self.handle(id)?;
        Ok(match &handle.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|a| attribute_name(a) == name)
                .map(|a| a.value.to_string()),
            _ => None,
        })
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let handle = self.handle(id)?;
        if let NodeData::Element {
            name: element_name,
            attrs,
            ..
        } = &handle.data
        {
            let name = if element_name.ns == Namespace::from(HTML_NAMESPACE) {
                name.to_ascii_lowercase()
            } else {
                name.to_string()
            };
            let mut attrs = attrs.borrow_mut();
            match attrs.iter_mut().find(|a| attribute_name(a) == name) {
                Some(existing) => existing.value = StrTendril::from(value),
                None => attrs.push(Attribute {
                    name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
                    value: StrTendril::from(value),
                }),
            }
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let handle = self.handle(id)?;
        if let NodeData::Element { attrs, .. } = &handle.data {
            attrs.borrow_mut().retain(|a| attribute_name(a) != name);
        }
        Ok(())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> DomResult<bool> {
        Ok(self.get_attribute(id, name)?.is_some())
    }

    pub fn attribute_names(&self, id: NodeId) -> DomResult<Vec<String>> {
        let handle = self.handle(id)?;
        Ok(match &handle.data {
            NodeData::Element { attrs, .. } => attrs.borrow().iter().map(attribute_name).collect(),
            _ => Vec::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MARKUP
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn inner_html(&self, id: NodeId) -> DomResult<String> {
        let handle = self.handle(id)?;
        serialize_node(&handle, TraversalScope::ChildrenOnly(None))
    }

    pub fn outer_html(&self, id: NodeId) -> DomResult<String> {
        let handle = self.handle(id)?;
        if matches!(handle.data, NodeData::Document) {
            return serialize_node(&handle, TraversalScope::ChildrenOnly(None));
        }
        serialize_node(&handle, TraversalScope::IncludeNode)
    }

    /// Replaces the children of `id` with the parsed `html` fragment.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> DomResult<()> {
        let handle = self.handle(id)?;
        if !can_have_children(&handle) {
            return Ok(());
        }
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("body"),
        );
        let dom = parse_fragment(RcDom::default(), Default::default(), context, Vec::new()).one(html);
        let parsed: Vec<Handle> = dom
            .document
            .children
            .borrow()
            .first()
            .map(|html| html.children.borrow().clone())
            .unwrap_or_default();

        let old: Vec<Handle> = handle.children.borrow_mut().drain(..).collect();
        for child in old {
            child.parent.set(None);
        }
        for node in parsed {
            append(&handle, &node);
        }
        Ok(())
    }

    pub fn get_element_by_id(&mut self, element_id: &str) -> Option<NodeId> {
        let root = self.root.clone();
        find_descendant(&root, &|node| attribute_value(node, "id").as_deref() == Some(element_id))
            .map(|h| self.register(&h))
    }

    /// Simple selectors only: `#id`, `.class` or a tag name.
    pub fn query_selector(&mut self, scope: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let scope = self.handle(scope)?;
        let selector = selector.trim();
        let found = if let Some(id) = selector.strip_prefix('#') {
            find_descendant(&scope, &|node| attribute_value(node, "id").as_deref() == Some(id))
        } else if let Some(class) = selector.strip_prefix('.') {
            find_descendant(&scope, &|node| {
                attribute_value(node, "class")
                    .is_some_and(|c| c.split_ascii_whitespace().any(|part| part == class))
            })
        } else {
            let tag = selector.to_ascii_lowercase();
            find_descendant(&scope, &|node| match &node.data {
                NodeData::Element { name, .. } => *name.local == *tag,
                _ => false,
            })
        };
        Ok(found.map(|h| self.register(&h)))
    }

    pub fn snapshot(&self, id: NodeId) -> DomResult<ElementSnapshot> {
        let handle = self.handle(id)?;
        snapshot_of(&handle)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn new_element(namespace: &str, tag: &str) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(namespace), LocalName::from(tag)),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn element_tag_name(name: &QualName) -> String {
    if name.ns == Namespace::from(HTML_NAMESPACE) {
        name.local.to_ascii_uppercase().to_string()
    } else {
        name.local.to_string()
    }
}

fn attribute_name(attribute: &Attribute) -> String {
    match &attribute.name.prefix {
        Some(prefix) => format!("{}:{}", prefix, attribute.name.local),
        None => attribute.name.local.to_string(),
    }
}

fn attribute_value(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| attribute_name(a) == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

fn can_have_children(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. } | NodeData::Document)
}

fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(Weak::upgrade);
    node.parent.set(weak);
    parent
}

fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, node));
    }
    node.parent.set(None);
}

fn append(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

fn is_connected(node: &Handle, root: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(handle) = current {
        if Rc::ptr_eq(&handle, root) {
            return true;
        }
        current = parent_of(&handle);
    }
    false
}

fn find_element(parent: &Handle, tag: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|c| matches!(&c.data, NodeData::Element { name, .. } if &*name.local == tag))
        .cloned()
}

/// Depth-first, document order, excluding `scope` itself.
fn find_descendant(scope: &Handle, predicate: &dyn Fn(&Handle) -> bool) -> Option<Handle> {
    for child in scope.children.borrow().iter() {
        if is_element(child) && predicate(child) {
            return Some(child.clone());
        }
        if let Some(found) = find_descendant(child, predicate) {
            return Some(found);
        }
    }
    None
}

fn collect_text(node: &Handle, out: &mut String) {
    for child in node.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => collect_text(child, out),
            _ => {}
        }
    }
}

fn serialize_node(handle: &Handle, scope: TraversalScope) -> DomResult<String> {
    let mut buffer = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    html5ever::serialize(&mut buffer, &SerializableHandle::from(handle.clone()), opts)
        .map_err(|e| DomError::Serialize(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| DomError::Serialize(e.to_string()))
}

fn snapshot_of(handle: &Handle) -> DomResult<ElementSnapshot> {
    let NodeData::Element { name, attrs, .. } = &handle.data else {
        return Err(DomError::HierarchyRequest("only elements can be snapshotted"));
    };
    let mut text = String::new();
    collect_text(handle, &mut text);
    let children = handle
        .children
        .borrow()
        .iter()
        .filter(|c| is_element(c))
        .map(snapshot_of)
        .collect::<DomResult<Vec<_>>>()?;
    Ok(ElementSnapshot {
        tag_name: element_tag_name(name),
        attributes: attrs
            .borrow()
            .iter()
            .map(|a| (attribute_name(a), a.value.to_string()))
            .collect(),
        text_content: text,
        outer_html: serialize_node(handle, TraversalScope::IncludeNode)?,
        children,
    })
}
