//! Deduplicating attribute index
//!
//! Maps tag sets to small integer ids. Strings are interned into a string
//! store, a tag set becomes a sorted array of (key id, value id) pairs in the
//! collection store, and reverse maps make identical content resolve to the
//! same id.
//!
//! Ids `0` and `1` are reserved for "no attributes" and "empty attributes";
//! stored collections start at `2`.

use std::hash::{Hash, Hasher};
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rustc_hash::FxHashMap;

use super::Tags;
use crate::core::{Error, Result};
use crate::formats::io::read_bytes;

/// Id returned for a missing tag set
pub const NULL_ID: u32 = 0;
/// Id returned for an empty tag set
pub const EMPTY_ID: u32 = 1;
/// First id handed out to stored collections
const FIRST_ID: u32 = 2;

/// How strings are interned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringInterning {
    /// Every string is appended, no lookup
    None,
    /// Keys are interned, values always appended
    KeysOnly,
    /// Keys and values are interned
    All,
}

/// Storage and lookup options of an [`AttributeIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMode {
    /// Hand out dense append-order ids through a remap array
    pub increase_one: bool,
    /// Deduplicate identical collections
    pub reverse_collections: bool,
    pub strings: StringInterning,
}

impl IndexMode {
    /// Edge profiles: dense ids, fully deduplicated
    pub const PROFILES: IndexMode = IndexMode {
        increase_one: true,
        reverse_collections: true,
        strings: StringInterning::All,
    };

    /// Edge meta data: high-cardinality values, keys interned only
    pub const META: IndexMode = IndexMode {
        increase_one: false,
        reverse_collections: false,
        strings: StringInterning::KeysOnly,
    };

    /// Content-addressed ids, fully deduplicated
    pub const REVERSE_ALL: IndexMode = IndexMode {
        increase_one: false,
        reverse_collections: true,
        strings: StringInterning::All,
    };
}

impl Default for IndexMode {
    fn default() -> Self {
        IndexMode::REVERSE_ALL
    }
}

/// Reverse-map key over a collection's encoded pairs
///
/// Hash is length XOR every element; equality is full-array equality.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CollectionKey(Box<[u32]>);

impl Hash for CollectionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut hash = self.0.len() as u32;
        for value in self.0.iter() {
            hash ^= *value;
        }
        state.write_u32(hash);
    }
}

/// Deduplicating tag-set store
#[derive(Debug, Clone)]
pub struct AttributeIndex {
    mode: IndexMode,
    read_only: bool,

    /// Length-prefixed UTF-8 strings, back to back
    strings: Vec<u8>,
    /// Byte offset of each string in `strings`
    string_offsets: Vec<u64>,
    string_reverse: FxHashMap<String, u32>,

    /// Collections as `[pair count, k0, v0, k1, v1, ...]`, back to back
    collections: Vec<u32>,
    collection_count: u32,
    collection_reverse: FxHashMap<CollectionKey, u32>,

    /// Append-order id to collection offset (only with `increase_one`)
    index: Vec<u32>,
}

impl AttributeIndex {
    pub fn new(mode: IndexMode) -> Self {
        Self {
            mode,
            read_only: false,
            strings: Vec::new(),
            string_offsets: Vec::new(),
            string_reverse: FxHashMap::default(),
            collections: Vec::new(),
            collection_count: 0,
            collection_reverse: FxHashMap::default(),
            index: Vec::new(),
        }
    }

    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of ids in use, including the two reserved ones
    pub fn count(&self) -> u32 {
        self.collection_count + FIRST_ID
    }

    /// Id of `tags`, storing them if not seen before
    ///
    /// # Panics
    ///
    /// Panics when called on a deserialized (read-only) index.
    pub fn add(&mut self, tags: &Tags) -> u32 {
        assert!(!self.read_only, "attribute index is read-only");
        if tags.is_empty() {
            return EMPTY_ID;
        }

        let mut pairs: Vec<(u32, u32)> = tags
            .iter()
            .map(|(k, v)| {
                let key = self.add_string(k, true);
                let value = self.add_string(v, false);
                (key, value)
            })
            .collect();
        pairs.sort_unstable();

        let mut encoded = Vec::with_capacity(pairs.len() * 2);
        for (k, v) in &pairs {
            encoded.push(*k);
            encoded.push(*v);
        }

        if self.mode.reverse_collections {
            let key = CollectionKey(encoded.into_boxed_slice());
            if let Some(id) = self.collection_reverse.get(&key) {
                return *id;
            }
            let id = self.push_collection(&key.0);
            self.collection_reverse.insert(key, id);
            id
        } else {
            self.push_collection(&encoded)
        }
    }

    /// Same as [`add`](Self::add) but treats `None` as the null set
    pub fn add_optional(&mut self, tags: Option<&Tags>) -> u32 {
        match tags {
            Some(tags) => self.add(tags),
            None => NULL_ID,
        }
    }

    /// Tags stored under `id`; `None` only for [`NULL_ID`]
    ///
    /// # Panics
    ///
    /// Panics if `id` was never handed out by this index.
    pub fn get(&self, id: u32) -> Option<Tags> {
        match id {
            NULL_ID => None,
            EMPTY_ID => Some(Tags::new()),
            _ => Some(self.read_collection(self.offset_of(id))),
        }
    }

    /// Every stored collection with its external id, in storage order
    pub fn iter(&self) -> impl Iterator<Item = (u32, Tags)> + '_ {
        let offsets = self.collection_offsets();
        offsets.into_iter().enumerate().map(move |(ordinal, offset)| {
            let id = if self.mode.increase_one {
                ordinal as u32 + FIRST_ID
            } else {
                offset + FIRST_ID
            };
            (id, self.read_collection(offset))
        })
    }

    fn offset_of(&self, id: u32) -> u32 {
        let internal = id - FIRST_ID;
        if self.mode.increase_one {
            self.index[internal as usize]
        } else {
            assert!(
                (internal as usize) < self.collections.len(),
                "attribute id {} out of range",
                id
            );
            internal
        }
    }

    fn push_collection(&mut self, encoded: &[u32]) -> u32 {
        let offset = self.collections.len() as u32;
        self.collections.push((encoded.len() / 2) as u32);
        self.collections.extend_from_slice(encoded);
        self.collection_count += 1;

        if self.mode.increase_one {
            self.index.push(offset);
            self.index.len() as u32 - 1 + FIRST_ID
        } else {
            offset + FIRST_ID
        }
    }

    fn add_string(&mut self, value: &str, is_key: bool) -> u32 {
        let intern = match self.mode.strings {
            StringInterning::All => true,
            StringInterning::KeysOnly => is_key,
            StringInterning::None => false,
        };
        if intern {
            if let Some(id) = self.string_reverse.get(value) {
                return *id;
            }
        }

        let id = self.string_offsets.len() as u32;
        self.string_offsets.push(self.strings.len() as u64);
        self.strings
            .extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.strings.extend_from_slice(value.as_bytes());

        if intern {
            self.string_reverse.insert(value.to_string(), id);
        }
        id
    }

    fn string(&self, id: u32) -> &str {
        let start = self.string_offsets[id as usize] as usize;
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.strings[start..start + 4]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        // validated on insert and on load
        std::str::from_utf8(&self.strings[start + 4..start + 4 + len]).unwrap_or_default()
    }

    fn read_collection(&self, offset: u32) -> Tags {
        let offset = offset as usize;
        let count = self.collections[offset] as usize;
        let mut tags = Tags::with_capacity(count);
        for pair in self.collections[offset + 1..offset + 1 + count * 2].chunks_exact(2) {
            tags.add(self.string(pair[0]), self.string(pair[1]));
        }
        tags
    }

    /// Offsets of all collections in storage order
    fn collection_offsets(&self) -> Vec<u32> {
        if self.mode.increase_one {
            return self.index.clone();
        }
        let mut offsets = Vec::with_capacity(self.collection_count as usize);
        let mut offset = 0usize;
        while offset < self.collections.len() {
            offsets.push(offset as u32);
            offset += 1 + self.collections[offset] as usize * 2;
        }
        offsets
    }

    /// Bytes [`serialize`](Self::serialize) will write
    pub fn serialized_size(&self) -> u64 {
        let mut size = 1 + 8 + self.collections.len() as u64 * 4 + 8 + self.strings.len() as u64;
        if self.mode.increase_one {
            size += 8 + self.index.len() as u64 * 4;
        }
        size
    }

    /// Write the index; returns the number of bytes written
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<u64> {
        writer.write_u8(u8::from(self.mode.increase_one))?;

        writer.write_u64::<LittleEndian>(self.collections.len() as u64 * 4)?;
        for word in &self.collections {
            writer.write_u32::<LittleEndian>(*word)?;
        }

        writer.write_u64::<LittleEndian>(self.strings.len() as u64)?;
        writer.write_all(&self.strings)?;

        if self.mode.increase_one {
            writer.write_u64::<LittleEndian>(self.index.len() as u64 * 4)?;
            for offset in &self.index {
                writer.write_u32::<LittleEndian>(*offset)?;
            }
        }
        Ok(self.serialized_size())
    }

    /// Read an index written by [`serialize`](Self::serialize)
    ///
    /// The result is read-only.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let mode_flag = reader.read_u8()?;
        let increase_one = match mode_flag {
            0 => false,
            1 => true,
            other => {
                return Err(Error::Format(format!(
                    "unknown attribute index mode {}",
                    other
                )))
            }
        };

        let collections = read_words(reader, "collection store")?;
        let strings_len = reader.read_u64::<LittleEndian>()?;
        let strings = read_bytes(reader, strings_len)?;
        let index = if increase_one {
            read_words(reader, "remap array")?
        } else {
            Vec::new()
        };

        let string_offsets = scan_strings(&strings)?;

        let mut result = Self::new(IndexMode {
            increase_one,
            reverse_collections: false,
            strings: StringInterning::None,
        });
        result.read_only = true;
        result.strings = strings;
        result.string_offsets = string_offsets;
        result.collections = collections;
        result.index = index;

        let offsets = scan_collections(&result.collections, result.string_offsets.len())?;
        if increase_one {
            if let Some(bad) = result
                .index
                .iter()
                .find(|offset| offsets.binary_search(offset).is_err())
            {
                return Err(Error::Format(format!(
                    "remap entry {} does not point at a collection",
                    bad
                )));
            }
            result.collection_count = result.index.len() as u32;
        } else {
            result.collection_count = offsets.len() as u32;
        }
        Ok(result)
    }
}

impl PartialEq for AttributeIndex {
    /// Content equality: same ids resolve to the same tags
    fn eq(&self, other: &Self) -> bool {
        self.count() == other.count() && self.iter().eq(other.iter())
    }
}

fn read_words<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u32>> {
    let len = reader.read_u64::<LittleEndian>()?;
    if len % 4 != 0 {
        return Err(Error::Format(format!(
            "{} length {} is not a multiple of 4",
            what, len
        )));
    }
    let bytes = read_bytes(reader, len)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Offsets of every string in the store, validating lengths and UTF-8
fn scan_strings(strings: &[u8]) -> Result<Vec<u64>> {
    let mut offsets = Vec::new();
    let mut pos = 0usize;
    while pos < strings.len() {
        if pos + 4 > strings.len() {
            return Err(Error::Format("string store truncated".to_string()));
        }
        let len = u32::from_le_bytes([
            strings[pos],
            strings[pos + 1],
            strings[pos + 2],
            strings[pos + 3],
        ]) as usize;
        let end = pos + 4 + len;
        if end > strings.len() {
            return Err(Error::Format("string store truncated".to_string()));
        }
        std::str::from_utf8(&strings[pos + 4..end])
            .map_err(|e| Error::Format(format!("invalid string at {}: {}", pos, e)))?;
        offsets.push(pos as u64);
        pos = end;
    }
    Ok(offsets)
}

/// Offsets of every collection, validating string references
fn scan_collections(collections: &[u32], string_count: usize) -> Result<Vec<u32>> {
    let mut offsets = Vec::new();
    let mut pos = 0usize;
    while pos < collections.len() {
        let end = pos + 1 + collections[pos] as usize * 2;
        if end > collections.len() {
            return Err(Error::Format("collection store truncated".to_string()));
        }
        if collections[pos + 1..end]
            .iter()
            .any(|id| *id as usize >= string_count)
        {
            return Err(Error::Format(format!(
                "collection at {} references a missing string",
                pos
            )));
        }
        offsets.push(pos as u32);
        pos = end;
    }
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_reserved_ids() {
        let mut index = AttributeIndex::new(IndexMode::PROFILES);
        assert_eq!(index.add(&Tags::new()), EMPTY_ID);
        assert_eq!(index.add_optional(None), NULL_ID);
        assert_eq!(index.get(NULL_ID), None);
        assert_eq!(index.get(EMPTY_ID), Some(Tags::new()));
        assert_eq!(index.count(), 2);
    }

    #[test]
    fn test_identical_sets_share_an_id() {
        for mode in [IndexMode::PROFILES, IndexMode::REVERSE_ALL] {
            let mut index = AttributeIndex::new(mode);
            let a = index.add(&tags(&[("highway", "primary"), ("oneway", "yes")]));
            let b = index.add(&tags(&[("oneway", "yes"), ("highway", "primary")]));
            let c = index.add(&tags(&[("highway", "primary")]));
            assert_eq!(a, b);
            assert_ne!(a, c);
            assert_eq!(index.count(), 4);
        }
    }

    #[test]
    fn test_increase_one_hands_out_dense_ids() {
        let mut index = AttributeIndex::new(IndexMode::PROFILES);
        assert_eq!(index.add(&tags(&[("highway", "primary")])), 2);
        assert_eq!(index.add(&tags(&[("highway", "secondary")])), 3);
        assert_eq!(index.add(&tags(&[("highway", "primary")])), 2);
        assert_eq!(index.add(&tags(&[("highway", "tertiary"), ("maxspeed", "50")])), 4);
    }

    #[test]
    fn test_get_round_trips_content() {
        let mut index = AttributeIndex::new(IndexMode::REVERSE_ALL);
        let input = tags(&[("name", "Grand Place"), ("highway", "pedestrian"), ("lit", "yes")]);
        let id = index.add(&input);
        let output = index.get(id).unwrap();
        assert!(output.same_as(&input));
    }

    #[test]
    fn test_meta_mode_does_not_deduplicate() {
        let mut index = AttributeIndex::new(IndexMode::META);
        let a = index.add(&tags(&[("name", "Rue Haute")]));
        let b = index.add(&tags(&[("name", "Rue Haute")]));
        assert_ne!(a, b);
        assert_eq!(index.get(a), index.get(b));
        // the key is interned once, values twice
        assert_eq!(index.string_offsets.len(), 3);
    }

    #[test]
    fn test_serialize_round_trip() {
        for mode in [IndexMode::PROFILES, IndexMode::META, IndexMode::REVERSE_ALL] {
            let mut index = AttributeIndex::new(mode);
            let ids: Vec<u32> = [
                tags(&[("highway", "residential")]),
                tags(&[("highway", "primary"), ("maxspeed", "70")]),
                tags(&[("name", "Chaussée de Wavre"), ("ref", "N4")]),
            ]
            .iter()
            .map(|t| index.add(t))
            .collect();

            let mut buf = Vec::new();
            let written = index.serialize(&mut buf).unwrap();
            assert_eq!(written, buf.len() as u64);
            assert_eq!(written, index.serialized_size());

            let loaded = AttributeIndex::deserialize(&mut Cursor::new(buf)).unwrap();
            assert!(loaded.is_read_only());
            assert_eq!(loaded.count(), index.count());
            for id in ids {
                assert_eq!(loaded.get(id), index.get(id));
            }
            assert!(loaded == index);
        }
    }

    #[test]
    #[should_panic(expected = "read-only")]
    fn test_add_on_read_only_panics() {
        let mut index = AttributeIndex::new(IndexMode::PROFILES);
        index.add(&tags(&[("highway", "primary")]));
        let mut buf = Vec::new();
        index.serialize(&mut buf).unwrap();

        let mut loaded = AttributeIndex::deserialize(&mut Cursor::new(buf)).unwrap();
        loaded.add(&tags(&[("highway", "secondary")]));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result = AttributeIndex::deserialize(&mut Cursor::new(vec![9u8]));
        assert!(matches!(result, Err(Error::Format(_))));
    }
}
