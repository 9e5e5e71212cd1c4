//! Namespace scopes and qualified-name handling.
//!
//! Prefix→URI bindings form a parent-chained scope: each element that
//! declares bindings gets its own [`NamespaceScope`] whose parent is the
//! enclosing scope, and lookup walks the chain from the innermost scope
//! outward. Scopes are shared through `Rc` handles — tags keep a handle to
//! the scope active inside them, and popping an element simply drops back
//! to the parent handle.
//!
//! See Namespaces in XML 1.0 <https://www.w3.org/TR/xml-names/>.

use std::rc::Rc;

/// The reserved `xml` prefix.
pub(crate) const XML_PREFIX: &str = "xml";
/// The URI the `xml` prefix is permanently bound to.
pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// The reserved `xmlns` prefix.
pub(crate) const XMLNS_PREFIX: &str = "xmlns";
/// The URI the `xmlns` prefix is permanently bound to.
pub(crate) const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A prefix→URI binding scope with a pointer to its enclosing scope.
///
/// Bindings keep declaration order so namespace open/close events fire in
/// document order.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct NamespaceScope {
    bindings: Vec<(String, String)>,
    parent: Option<Rc<NamespaceScope>>,
}

impl NamespaceScope {
    /// Returns the root scope, pre-seeded with the `xml` and `xmlns`
    /// reserved bindings.
    pub(crate) fn root() -> Rc<NamespaceScope> {
        Rc::new(NamespaceScope {
            bindings: vec![
                (XML_PREFIX.to_string(), XML_NAMESPACE.to_string()),
                (XMLNS_PREFIX.to_string(), XMLNS_NAMESPACE.to_string()),
            ],
            parent: None,
        })
    }

    /// Returns a child scope of `parent` holding `bindings`.
    pub(crate) fn child(
        parent: &Rc<NamespaceScope>,
        bindings: Vec<(String, String)>,
    ) -> Rc<NamespaceScope> {
        Rc::new(NamespaceScope {
            bindings,
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Resolves `prefix` by walking from this scope outward. The empty
    /// prefix resolves the default namespace.
    pub(crate) fn get(&self, prefix: &str) -> Option<&str> {
        let mut scope = self;
        loop {
            if let Some((_, uri)) = scope.bindings.iter().rev().find(|(p, _)| p == prefix) {
                return Some(uri);
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return None,
            }
        }
    }

    /// The bindings this scope itself introduced, in declaration order.
    pub(crate) fn own_bindings(&self) -> &[(String, String)] {
        &self.bindings
    }

    /// Returns this scope's parent, if any.
    pub(crate) fn parent(&self) -> Option<&Rc<NamespaceScope>> {
        self.parent.as_ref()
    }
}

/// Splits a qualified name into `(prefix, local)` parts.
///
/// An unprefixed name has an empty prefix. The name `xmlns` itself is
/// special-cased as `("xmlns", "")` so the default-namespace declaration
/// takes the binding path. For attributes, an unprefixed name keeps an
/// empty prefix; for elements the empty prefix later resolves against the
/// default namespace.
pub(crate) fn qname(name: &str) -> (String, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (prefix.to_string(), local.to_string()),
        None if name == XMLNS_PREFIX => (XMLNS_PREFIX.to_string(), String::new()),
        None => (String::new(), name.to_string()),
    }
}
