//! Typed key/value property sets and their binary encoding.
//!
//! A set is five independent tables (strings, booleans, integers, floats, colors),
//! each stored as a count followed by `(key, value)` pairs in insertion order.
//! An optional set is preceded by a presence flag; an absent set is the flag alone.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::binary::{Color32, ReadExt, WriteExt};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PropertyKind {
    String,
    Bool,
    Int,
    Float,
    Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    Int(i32),
    Float(f32),
    Color(Color32),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::Color(_) => PropertyKind::Color,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    pub strings: Vec<(String, String)>,
    pub bools: Vec<(String, bool)>,
    pub ints: Vec<(String, i32)>,
    pub floats: Vec<(String, f32)>,
    pub colors: Vec<(String, Color32)>,
}

fn upsert<T>(table: &mut Vec<(String, T)>, key: String, value: T) {
    match table.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => table.push((key, value)),
    }
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.strings.len() + self.bools.len() + self.ints.len() + self.floats.len() + self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or replaces `key`. Replacing with the same type keeps the key's
    /// position; a key stored under another type moves to the new type's table.
    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        let kind = value.kind();
        if self.kind_of(&key).is_some_and(|k| k != kind) {
            self.remove(&key);
        }
        match value {
            PropertyValue::String(v) => upsert(&mut self.strings, key, v),
            PropertyValue::Bool(v) => upsert(&mut self.bools, key, v),
            PropertyValue::Int(v) => upsert(&mut self.ints, key, v),
            PropertyValue::Float(v) => upsert(&mut self.floats, key, v),
            PropertyValue::Color(v) => upsert(&mut self.colors, key, v),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.strings.retain(|(k, _)| k != key);
        self.bools.retain(|(k, _)| k != key);
        self.ints.retain(|(k, _)| k != key);
        self.floats.retain(|(k, _)| k != key);
        self.colors.retain(|(k, _)| k != key);
    }

    pub fn kind_of(&self, key: &str) -> Option<PropertyKind> {
        fn has<T>(t: &[(String, T)], key: &str) -> bool {
            t.iter().any(|(k, _)| k == key)
        }
        if has(&self.strings, key) {
            Some(PropertyKind::String)
        } else if has(&self.bools, key) {
            Some(PropertyKind::Bool)
        } else if has(&self.ints, key) {
            Some(PropertyKind::Int)
        } else if has(&self.floats, key) {
            Some(PropertyKind::Float)
        } else if has(&self.colors, key) {
            Some(PropertyKind::Color)
        } else {
            None
        }
    }

    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        fn find<T: Clone>(t: &[(String, T)], key: &str) -> Option<T> {
            t.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        }
        find(&self.strings, key)
            .map(PropertyValue::String)
            .or_else(|| find(&self.bools, key).map(PropertyValue::Bool))
            .or_else(|| find(&self.ints, key).map(PropertyValue::Int))
            .or_else(|| find(&self.floats, key).map(PropertyValue::Float))
            .or_else(|| find(&self.colors, key).map(PropertyValue::Color))
    }

    /// Layers `overrides` on top of `self`; keys in `overrides` win.
    pub fn merged_with(&self, overrides: &PropertySet) -> PropertySet {
        let mut out = self.clone();
        for (k, v) in &overrides.strings {
            out.insert(k.clone(), PropertyValue::String(v.clone()));
        }
        for (k, v) in &overrides.bools {
            out.insert(k.clone(), PropertyValue::Bool(*v));
        }
        for (k, v) in &overrides.ints {
            out.insert(k.clone(), PropertyValue::Int(*v));
        }
        for (k, v) in &overrides.floats {
            out.insert(k.clone(), PropertyValue::Float(*v));
        }
        for (k, v) in &overrides.colors {
            out.insert(k.clone(), PropertyValue::Color(*v));
        }
        out
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        w.write_count(self.strings.len())?;
        for (k, v) in &self.strings {
            w.write_string(k)?;
            w.write_string(v)?;
        }
        w.write_count(self.bools.len())?;
        for (k, v) in &self.bools {
            w.write_string(k)?;
            w.write_bool(*v)?;
        }
        w.write_count(self.ints.len())?;
        for (k, v) in &self.ints {
            w.write_string(k)?;
            w.write_i32_le(*v)?;
        }
        w.write_count(self.floats.len())?;
        for (k, v) in &self.floats {
            w.write_string(k)?;
            w.write_f32_le(*v)?;
        }
        w.write_count(self.colors.len())?;
        for (k, v) in &self.colors {
            w.write_string(k)?;
            w.write_color(*v)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let mut set = PropertySet::new();
        for _ in 0..r.read_count()? {
            set.strings.push((r.read_string()?, r.read_string()?));
        }
        for _ in 0..r.read_count()? {
            set.bools.push((r.read_string()?, r.read_bool()?));
        }
        for _ in 0..r.read_count()? {
            set.ints.push((r.read_string()?, r.read_i32_le()?));
        }
        for _ in 0..r.read_count()? {
            set.floats.push((r.read_string()?, r.read_f32_le()?));
        }
        for _ in 0..r.read_count()? {
            set.colors.push((r.read_string()?, r.read_color()?));
        }
        Ok(set)
    }
}

/// Writes the presence flag, then the tables when present.
pub fn write_properties<W: Write + ?Sized>(w: &mut W, props: Option<&PropertySet>) -> Result<()> {
    match props {
        Some(set) => {
            w.write_bool(true)?;
            set.write_to(w)
        }
        None => w.write_bool(false),
    }
}

pub fn read_properties<R: Read + ?Sized>(r: &mut R) -> Result<Option<PropertySet>> {
    if r.read_bool()? {
        Ok(Some(PropertySet::read_from(r)?))
    } else {
        Ok(None)
    }
}
