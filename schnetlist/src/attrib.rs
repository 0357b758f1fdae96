//! Attribute storage and the attribute value grammars.
//!
//! Attributes are ordered name/value multimaps.  The *attached* scope
//! of a component holds the attributes of its instance on the page;
//! the *inherited* scope holds the floating attributes of its symbol
//! file.  The two scopes are kept separate and combined at the call
//! site, never merged.

use compact_str::CompactString;
use lazy_static::lazy_static;
use regex::Regex;
use schparse::{Object, Revision};

/// An ordered attribute list.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    items: Vec<(CompactString, CompactString)>,
}

impl Attributes {
    pub fn new() -> Attributes {
        Attributes { items: Vec::new() }
    }

    /// The attributes attached to an object, in file order.
    /// Attached text that does not parse as `name=value` has already
    /// been reported by the parser and is skipped here.
    pub fn from_attached(ob: &Object) -> Attributes {
        Attributes {
            items: ob.attached.iter()
                .filter_map(|t| t.attribute())
                .collect()
        }
    }

    /// The floating attributes of a revision: top-level text objects
    /// with `name=value` content, in file order.
    pub fn from_floating(rev: &Revision) -> Attributes {
        Attributes {
            items: rev.objects.iter()
                .filter_map(|t| t.attribute())
                .collect()
        }
    }

    /// First value of the attribute, or `None`.
    pub fn get_first(&self, name: &str) -> Option<&CompactString> {
        self.items.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// All values of the attribute, in order.
    pub fn get_all<'i>(&'i self, name: &'i str)
                       -> impl Iterator<Item = &'i CompactString> + 'i
    {
        self.items.iter()
            .filter(move |(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// All name/value pairs, in order.
    pub fn iter(&self) -> impl Iterator<Item = &(CompactString, CompactString)> {
        self.items.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

lazy_static! {
    static ref RE_NET_VALUE: Regex =
        Regex::new(r"^([^:]+):(.+)$").unwrap();
    static ref RE_SLOTDEF: Regex =
        Regex::new(r"^([0-9]+):(.+)$").unwrap();
}

/// Parse a `net=Name:p1,p2,...` attribute value.
pub(crate) fn parse_net_value(value: &str)
                              -> Option<(CompactString, Vec<CompactString>)> {
    let caps = RE_NET_VALUE.captures(value)?;
    let name = CompactString::from(&caps[1]);
    let pins: Vec<CompactString> = caps[2].split(',')
        .map(CompactString::from)
        .collect();
    if pins.iter().any(|p| p.is_empty()) {
        return None
    }
    Some((name, pins))
}

/// Parse a `slotdef=N:p1,p2,...` attribute value.
pub(crate) fn parse_slotdef(value: &str)
                            -> Option<(u32, Vec<CompactString>)> {
    let caps = RE_SLOTDEF.captures(value)?;
    let slot: u32 = caps[1].parse().ok()?;
    let pins: Vec<CompactString> = caps[2].split(',')
        .map(CompactString::from)
        .collect();
    if pins.iter().any(|p| p.is_empty()) {
        return None
    }
    Some((slot, pins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_value() {
        assert_eq!(parse_net_value("GND:7,14"),
                   Some(("GND".into(), vec!["7".into(), "14".into()])));
        assert_eq!(parse_net_value("Vcc:16"),
                   Some(("Vcc".into(), vec!["16".into()])));
        assert_eq!(parse_net_value("GND"), None);
        assert_eq!(parse_net_value(":7"), None);
        assert_eq!(parse_net_value("GND:"), None);
        assert_eq!(parse_net_value("GND:7,,14"), None);
    }

    #[test]
    fn test_slotdef() {
        assert_eq!(parse_slotdef("1:1,2,3"),
                   Some((1, vec!["1".into(), "2".into(), "3".into()])));
        assert_eq!(parse_slotdef("2:4,5,6"),
                   Some((2, vec!["4".into(), "5".into(), "6".into()])));
        assert_eq!(parse_slotdef("x:1,2"), None);
        assert_eq!(parse_slotdef("1:"), None);
        assert_eq!(parse_slotdef("1"), None);
    }
}
