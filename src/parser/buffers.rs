//! Per-region growable buffers and the overflow-guard policy.
//!
//! Each syntactic region owns one growable string; a region's buffer is
//! reset to empty when its content is emitted. Appends are amortized O(1)
//! so arbitrarily large text and CDATA runs accumulate without quadratic
//! copying.
//!
//! The overflow guard bounds memory on pathological inputs: once the
//! absolute position crosses a scheduled check point, every buffer is
//! inspected against `max_buffer_length`. Text and CDATA overflow by
//! emitting a partial event and clearing; any other region overflowing is a
//! soft error. The next check point is then scheduled at the earliest
//! position where an overrun could happen again.

/// Identifies the buffers that can overflow, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BufferKind {
    AttributeName,
    AttributeValue,
    Cdata,
    Comment,
    Doctype,
    Entity,
    ProcInstName,
    ProcInstBody,
    SgmlDecl,
    TagName,
    TextNode,
}

impl BufferKind {
    /// All buffer kinds, in the order the overflow check inspects them.
    pub(crate) const ALL: [BufferKind; 11] = [
        BufferKind::AttributeName,
        BufferKind::AttributeValue,
        BufferKind::Cdata,
        BufferKind::Comment,
        BufferKind::Doctype,
        BufferKind::Entity,
        BufferKind::ProcInstName,
        BufferKind::ProcInstBody,
        BufferKind::SgmlDecl,
        BufferKind::TagName,
        BufferKind::TextNode,
    ];

    /// The region name used in the "Max buffer length exceeded" diagnostic.
    pub(crate) fn name(self) -> &'static str {
        match self {
            BufferKind::AttributeName => "attributeName",
            BufferKind::AttributeValue => "attributeValue",
            BufferKind::Cdata => "cdata",
            BufferKind::Comment => "comment",
            BufferKind::Doctype => "doctype",
            BufferKind::Entity => "entity",
            BufferKind::ProcInstName => "procInstName",
            BufferKind::ProcInstBody => "procInstBody",
            BufferKind::SgmlDecl => "sgmlDeclaration",
            BufferKind::TagName => "tagName",
            BufferKind::TextNode => "textNode",
        }
    }
}

/// The per-region buffers of one parser instance.
#[derive(Debug, Default)]
pub(crate) struct Buffers {
    pub(crate) attribute_name: String,
    pub(crate) attribute_value: String,
    pub(crate) cdata: String,
    pub(crate) comment: String,
    pub(crate) doctype: String,
    pub(crate) entity: String,
    pub(crate) proc_inst_name: String,
    pub(crate) proc_inst_body: String,
    pub(crate) sgml_decl: String,
    pub(crate) tag_name: String,
    pub(crate) text_node: String,
}

impl Buffers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear_all(&mut self) {
        for kind in BufferKind::ALL {
            self.get_mut(kind).clear();
        }
    }

    pub(crate) fn len(&self, kind: BufferKind) -> usize {
        self.get(kind).len()
    }

    fn get(&self, kind: BufferKind) -> &String {
        match kind {
            BufferKind::AttributeName => &self.attribute_name,
            BufferKind::AttributeValue => &self.attribute_value,
            BufferKind::Cdata => &self.cdata,
            BufferKind::Comment => &self.comment,
            BufferKind::Doctype => &self.doctype,
            BufferKind::Entity => &self.entity,
            BufferKind::ProcInstName => &self.proc_inst_name,
            BufferKind::ProcInstBody => &self.proc_inst_body,
            BufferKind::SgmlDecl => &self.sgml_decl,
            BufferKind::TagName => &self.tag_name,
            BufferKind::TextNode => &self.text_node,
        }
    }

    fn get_mut(&mut self, kind: BufferKind) -> &mut String {
        match kind {
            BufferKind::AttributeName => &mut self.attribute_name,
            BufferKind::AttributeValue => &mut self.attribute_value,
            BufferKind::Cdata => &mut self.cdata,
            BufferKind::Comment => &mut self.comment,
            BufferKind::Doctype => &mut self.doctype,
            BufferKind::Entity => &mut self.entity,
            BufferKind::ProcInstName => &mut self.proc_inst_name,
            BufferKind::ProcInstBody => &mut self.proc_inst_body,
            BufferKind::SgmlDecl => &mut self.sgml_decl,
            BufferKind::TagName => &mut self.tag_name,
            BufferKind::TextNode => &mut self.text_node,
        }
    }

    /// Returns the length of the longest buffer, for scheduling the next
    /// overflow check.
    pub(crate) fn longest(&self) -> usize {
        BufferKind::ALL
            .iter()
            .map(|&kind| self.len(kind))
            .max()
            .unwrap_or(0)
    }
}
