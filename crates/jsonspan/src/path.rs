//! JSON-Path-like locations for diagnostics.
//!
//! While the mapping engine walks a document it keeps one [`PathItem`] per
//! open nesting level: the property name being populated in an object, or the
//! element index in an array. When an error surfaces, the items render into a
//! string such as `$.store.books[3].title` that is attached to the error.

use std::fmt::Write as _;

/// One step in the location of a value inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathItem {
    /// A property name inside an object.
    Key(String),
    /// An element index inside an array.
    Index(usize),
}

impl From<&str> for PathItem {
    fn from(s: &str) -> Self {
        Self::Key(s.to_owned())
    }
}

impl From<usize> for PathItem {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Renders a sequence of path items in dotted-with-brackets form.
///
/// Names consisting of ASCII alphanumerics and underscores use dot notation;
/// anything else is bracket-quoted so the rendered path stays unambiguous.
///
/// # Examples
///
/// ```
/// use jsonspan::path::{render_path, PathItem};
///
/// let path = [
///     PathItem::Key("store".into()),
///     PathItem::Index(3),
///     PathItem::Key("a b".into()),
/// ];
/// assert_eq!(render_path(path.iter()), "$.store[3]['a b']");
/// ```
#[must_use]
pub fn render_path<'a>(items: impl Iterator<Item = &'a PathItem>) -> String {
    let mut out = String::from("$");
    for item in items {
        match item {
            PathItem::Key(name) if is_plain_name(name) => {
                out.push('.');
                out.push_str(name);
            }
            PathItem::Key(name) => {
                out.push_str("['");
                out.push_str(name);
                out.push_str("']");
            }
            PathItem::Index(i) => {
                let _ = write!(out, "[{i}]");
            }
        }
    }
    out
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_renders_as_dollar() {
        assert_eq!(render_path([].iter()), "$");
    }

    #[test]
    fn mixed_segments() {
        let path = [
            PathItem::Key("foo".into()),
            PathItem::Key("bar".into()),
            PathItem::Index(3),
            PathItem::Key("baz".into()),
        ];
        assert_eq!(render_path(path.iter()), "$.foo.bar[3].baz");
    }

    #[test]
    fn odd_names_are_bracketed() {
        let path = [PathItem::Key(String::new()), PathItem::Key("a.b".into())];
        assert_eq!(render_path(path.iter()), "$['']['a.b']");
    }
}
