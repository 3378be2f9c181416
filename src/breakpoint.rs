use std::collections::{hash_map, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub name: String,
    pub offset: u16,
}

impl Breakpoint {
    pub fn new(name: impl Into<String>, offset: u16) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

/// Breakpoints indexed both by address and by name.
#[derive(Debug, Default, Clone)]
pub struct BreakpointMap {
    by_offset: HashMap<u16, Breakpoint>,
    by_name: HashMap<String, u16>,
}

impl BreakpointMap {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a breakpoint unless one with the same address or name exists.
    pub fn add(&mut self, breakpoint: Breakpoint) {
        if self.has(breakpoint.offset) || self.has_name(&breakpoint.name) {
            return;
        }

        self.by_name.insert(breakpoint.name.clone(), breakpoint.offset);
        self.by_offset.insert(breakpoint.offset, breakpoint);
    }

    pub fn remove(&mut self, offset: u16) -> Option<Breakpoint> {
        let breakpoint = self.by_offset.remove(&offset)?;
        self.by_name.remove(&breakpoint.name);
        Some(breakpoint)
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<Breakpoint> {
        let offset = self.by_name.remove(name)?;
        self.by_offset.remove(&offset)
    }

    pub fn clear(&mut self) {
        self.by_offset.clear();
        self.by_name.clear();
    }

    pub fn find(&self, offset: u16) -> Option<&Breakpoint> {
        self.by_offset.get(&offset)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Breakpoint> {
        self.by_name
            .get(name)
            .and_then(|offset| self.by_offset.get(offset))
    }

    pub fn has(&self, offset: u16) -> bool {
        self.by_offset.contains_key(&offset)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_offset.len()
    }

    pub fn iter(&self) -> hash_map::Values<'_, u16, Breakpoint> {
        self.by_offset.values()
    }
}

impl<'a> IntoIterator for &'a BreakpointMap {
    type Item = &'a Breakpoint;
    type IntoIter = hash_map::Values<'a, u16, Breakpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
