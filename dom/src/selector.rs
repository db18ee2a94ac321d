use std::fmt;

use crate::node::Element;

/// A compound selector: every class and every exact attribute value must match.
///
/// An empty selector matches any element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

impl Selector {
    pub fn class(class_name: impl Into<String>) -> Self {
        Selector::default().and_class(class_name)
    }

    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Selector::default().and_attr(name, value)
    }

    pub fn and_class(mut self, class_name: impl Into<String>) -> Self {
        self.classes.push(class_name.into());
        self
    }

    pub fn and_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn matches(&self, element: &Element) -> bool {
        self.classes.iter().all(|c| element.has_class(c))
            && self
                .attrs
                .iter()
                .all(|(name, value)| element.attr(name) == Some(value.as_str()))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.classes.is_empty() && self.attrs.is_empty() {
            return write!(f, "*");
        }
        for class_name in &self.classes {
            write!(f, ".{}", class_name)?;
        }
        for (name, value) in &self.attrs {
            write!(f, "[{}=\"{}\"]", name, value)?;
        }
        Ok(())
    }
}
