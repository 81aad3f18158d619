//! Section id resolution
//!
//! Callers may address a section by name or positionally as `@type[n]`,
//! where `n` counts from the start of the current enumeration of that type,
//! or from the end when negative (`@rule[-1]` is the last rule).

use crate::state::State;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

fn section_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@([a-zA-Z0-9_-]+)\[(-?[0-9]+)\]$").expect("valid regex"))
}

/// Positional section reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRef<'a> {
    /// Section type to enumerate
    pub section_type: &'a str,
    /// Position, negative counts from the end
    pub position: i64,
}

impl<'a> SectionRef<'a> {
    /// Parse an `@type[n]` reference; plain names yield `None`
    pub fn parse(reference: &'a str) -> Option<Self> {
        let caps = section_ref_regex().captures(reference)?;
        let section_type = caps.get(1)?.as_str();
        // Out-of-range positions saturate and never resolve.
        let position = caps[2].parse::<i64>().unwrap_or(if caps[2].starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        });

        Some(Self {
            section_type,
            position,
        })
    }

    /// Index into an enumeration of `len` sections
    pub fn offset(&self, len: usize) -> Option<usize> {
        let len = i64::try_from(len).ok()?;
        let offset = if self.position >= 0 {
            self.position
        } else {
            len.checked_add(self.position)?
        };

        if (0..len).contains(&offset) {
            usize::try_from(offset).ok()
        } else {
            None
        }
    }
}

impl State {
    /// Resolve a section reference to a concrete section id
    ///
    /// Plain names pass through unchanged, whether or not they exist.
    pub fn resolve_sid(&self, config: &str, sid: &str) -> Option<String> {
        if sid.is_empty() {
            return None;
        }

        match SectionRef::parse(sid) {
            Some(reference) => {
                let sections = self.sections(config, Some(reference.section_type));
                let offset = reference.offset(sections.len())?;
                Some(sections[offset].name.clone())
            }
            None => Some(sid.to_string()),
        }
    }

    /// Generate an unused `newXXXXXX` placeholder id for a draft section
    pub fn create_sid(&self, config: &str) -> String {
        let mut rng = rand::thread_rng();

        loop {
            let sid = format!("new{:06x}", rng.gen_range(0..0x0100_0000u32));

            let pending = self.overlay.draft(config, &sid).is_some();
            let existing = self.snapshot_section(config, &sid).is_some();

            if !pending && !existing {
                return sid;
            }
        }
    }
}
