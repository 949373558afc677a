//! Key template parsing and resolution.
//!
//! A template is either a bare property name (the property's value becomes
//! the key verbatim) or a pattern with `{{Property}}` placeholders
//! interleaved with literal text. Resolution is pure: the same template and
//! the same property values always produce the same key.

use std::fmt;

use super::error::{EntityError, MappingError, TemplateError};
use super::traits::Entity;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Property(String),
}

/// A parsed key template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl KeyTemplate {
    /// Parses a template string.
    ///
    /// A string without `{{` is a bare property name. Otherwise every `{{`
    /// must be closed by `}}` around a non-empty property name.
    pub fn parse(template: &str) -> Result<Self, MappingError> {
        let invalid = |reason: &str| MappingError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        if template.trim().is_empty() {
            return Err(invalid("template is empty"));
        }

        if !template.contains(OPEN) {
            return Ok(Self {
                source: template.to_string(),
                segments: vec![Segment::Property(template.trim().to_string())],
            });
        }

        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open
                .find(CLOSE)
                .ok_or_else(|| invalid("unclosed placeholder"))?;
            let name = after_open[..end].trim();
            if name.is_empty() {
                return Err(invalid("empty placeholder"));
            }
            segments.push(Segment::Property(name.to_string()));
            rest = &after_open[end + CLOSE.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the property name when the template is a bare property name.
    pub fn verbatim_property(&self) -> Option<&str> {
        if self.source.contains(OPEN) {
            return None;
        }
        match self.segments.as_slice() {
            [Segment::Property(name)] => Some(name),
            _ => None,
        }
    }

    /// Property names referenced by the template, in order of appearance.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Property(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Checks that every referenced property exists on `E`.
    pub fn validate<E: Entity>(&self) -> Result<(), MappingError> {
        match self.properties().find(|name| !E::has_field(name)) {
            Some(unknown) => Err(MappingError::UnknownProperty {
                entity_type: E::TYPE_NAME,
                property: unknown.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Resolves the template against a model instance.
    pub fn resolve<E: Entity>(&self, entity: &E) -> Result<String, EntityError> {
        let mut key = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Property(name) => {
                    if !E::has_field(name) {
                        return Err(MappingError::UnknownProperty {
                            entity_type: E::TYPE_NAME,
                            property: name.clone(),
                        }
                        .into());
                    }
                    let value = entity.get(name).ok_or_else(|| TemplateError::NullValue {
                        property: name.clone(),
                    })?;
                    key.push_str(&value.to_string());
                }
            }
        }
        Ok(key)
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses `template` and resolves it against `entity` in one step.
pub fn resolve<E: Entity>(template: &str, entity: &E) -> Result<String, EntityError> {
    KeyTemplate::parse(template)?.resolve(entity)
}
