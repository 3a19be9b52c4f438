//! Keyword tables for the type grammar

/// Expands to a dictionary with string keys
pub const DICTIONARY_SHORTHAND: &str = "dictionary-shorthand";

/// Expands to an array
pub const ARRAY_SHORTHAND: &str = "array-shorthand";

/// Keys that put a node into "real type" form.
///
/// `properties` only counts when `type` is present too, so canonical object
/// output normalizes again without change while a field named `properties`
/// stays a field.
pub const CANONICAL_KEYS: &[&str] = &["type", "items", "default", "keys", "properties"];

/// JSON-Schema keywords that are carried through verbatim.
///
/// Covers the identity, annotation and assertion vocabularies. These are
/// never treated as field names and never recursed into.
pub const PASSTHROUGH_KEYWORDS: &[&str] = &[
    // identity
    "$id",
    "$schema",
    "$ref",
    "$anchor",
    "$comment",
    // annotation
    "title",
    "description",
    "examples",
    "deprecated",
    "readOnly",
    "writeOnly",
    // assertion
    "enum",
    "const",
    "pattern",
    "format",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "uniqueItems",
    "minProperties",
    "maxProperties",
    "required",
    "additionalProperties",
    "contentEncoding",
    "contentMediaType",
];

pub fn is_passthrough(key: &str) -> bool {
    PASSTHROUGH_KEYWORDS.contains(&key)
}

pub fn is_canonical(key: &str, has_type: bool) -> bool {
    CANONICAL_KEYS.contains(&key) && (key != "properties" || has_type)
}

pub fn is_shorthand(key: &str) -> bool {
    key == DICTIONARY_SHORTHAND || key == ARRAY_SHORTHAND
}
