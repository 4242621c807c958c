//! `$NAME` / `${NAME WITH SPACES}` expansion against a component.
//!
//! Names resolve against intrinsic attributes first, then against field names.
//! Unresolved tokens are copied through unchanged; an empty value still counts
//! as resolved.

use super::{is_word_char, Component};

type Accessor = fn(&Component) -> Option<String>;

const INTRINSICS: &[(&str, Accessor)] = &[
    ("Ref", |c| Some(c.reference.clone())),
    ("DisplayRef", |c| c.display_reference.clone()),
    ("LibRef", |c| Some(c.lib_ref.clone())),
    ("Lib", |c| c.lib.clone()),
    ("PartNo", |c| Some(c.part.to_string())),
    ("Timestamp", |c| Some(c.timestamp.clone())),
    ("X", |c| Some(c.position.x.to_string())),
    ("Y", |c| Some(c.position.y.to_string())),
    ("Sheet", |c| Some(c.sheet().to_string())),
];

/// Value of an intrinsic attribute or, failing that, of the field called `name`.
pub fn property_value(component: &Component, name: &str) -> Option<String> {
    INTRINSICS
        .iter()
        .find(|(key, _)| *key == name)
        .and_then(|(_, accessor)| accessor(component))
        .or_else(|| component.field(name).map(|f| f.text.clone()))
}

pub fn resolve(component: &Component, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        let Some((name, token_len)) = token_at(after) else {
            out.push('$');
            rest = after;
            continue;
        };

        match property_value(component, name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[dollar..=dollar + token_len]),
        }
        rest = &after[token_len..];
    }

    out.push_str(rest);
    out
}

// Name and byte length of the token following a `$`.
fn token_at(s: &str) -> Option<(&str, usize)> {
    if let Some(braced) = s.strip_prefix('{') {
        let close = braced.find('}')?;
        let name = &braced[..close];
        let valid = !name.trim().is_empty()
            && name.chars().all(|c| is_word_char(c) || c.is_whitespace());
        return valid.then_some((name, close + 2));
    }

    let len = s.find(|c| !is_word_char(c)).unwrap_or(s.len());
    (len > 0).then(|| (&s[..len], len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{BlockId, Field, FormatVersion};

    const BLOCK: &str = "L Device:R R1
U 2 1 5C8A5B2B
P 3000 2000
F 0 \"R1\" H 3070 2046 50  0000 L CNN
F 1 \"10k\" H 3070 1955 50  0000 L CNN
F 2 \"\" H 3000 2000 50  0001 C CNN
\t2    3000 2000
\t1    0    0    -1  \n";

    fn component() -> Component {
        let mut c = Component::parse(BLOCK, BlockId::new(1, 0), FormatVersion(4)).unwrap();
        let mut field = Field::default_for(&c, "Part Number", Some(4));
        field.text = "RC0603".to_string();
        c.add_field(field);
        c
    }

    #[test]
    fn test_expands_intrinsics_and_fields() {
        let c = component();
        assert_eq!(c.resolve_template("$Ref-$Value"), "R1-10k");
        assert_eq!(c.resolve_template("$LibRef@$X,$Y"), "R@3000,2000");
        assert_eq!(c.resolve_template("$Lib/$PartNo/$Sheet"), "Device/2/1");
        assert_eq!(c.resolve_template("${Part Number}.pdf"), "RC0603.pdf");
    }

    #[test]
    fn test_leaves_unresolved_tokens_verbatim() {
        let c = component();
        assert_eq!(c.resolve_template("$Unknown"), "$Unknown");
        assert_eq!(c.resolve_template("${No Such Field}!"), "${No Such Field}!");
        assert_eq!(c.resolve_template("$DisplayRef"), "$DisplayRef");
    }

    #[test]
    fn test_empty_text_is_a_resolved_value() {
        let c = component();
        assert_eq!(c.resolve_template("[$Footprint]"), "[]");
    }

    #[test]
    fn test_token_boundaries_are_exact() {
        let c = component();
        assert_eq!(c.resolve_template("$Reference"), "$Reference");
        assert_eq!(c.resolve_template("$$Ref $ ${} ${"), "$R1 $ ${} ${");
    }

    #[test]
    fn test_expansions_are_not_rescanned() {
        let mut c = component();
        c.field_mut("Value").unwrap().text = "$Ref".to_string();
        assert_eq!(c.resolve_template("$Value"), "$Ref");
    }
}
