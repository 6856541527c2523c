//! Network database: the routing network with its attribute indexes
//!
//! Owns one network, the edge profile and edge meta indexes, the profiles
//! it was built for and any contracted graphs computed on top of it. The
//! guid identifies one version of the network; it changes when the network
//! is mutated after having been serialized, so stale contracted graphs on
//! disk can be detected.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use log::debug;
use uuid::Uuid;

use crate::attributes::{AttributeIndex, IndexMode, Tags};
use crate::core::{Error, Result};
use crate::formats::crc::{checksum, CrcWriter};
use crate::formats::io::{
    read_block, read_bytes, read_string, read_strings, read_tags, string_size, strings_size,
    tags_size, write_block_header, write_string, write_strings, write_tags,
};
use crate::graph::{RoutingNetwork, DEFAULT_MAX_EDGE_DISTANCE};

const VERSION: u8 = 1;
const MAGIC: u32 = 0x42444E42; // "BNDB" on disk
const FOOTER_SIZE: usize = 8;

#[derive(Debug)]
pub struct RouterDb {
    guid: Uuid,
    serialized: AtomicBool,
    network: RoutingNetwork,
    edge_profiles: AttributeIndex,
    edge_meta: AttributeIndex,
    supported_profiles: Vec<String>,
    meta: Tags,
    contracted: BTreeMap<String, Bytes>,
}

impl Default for RouterDb {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EDGE_DISTANCE)
    }
}

impl RouterDb {
    pub fn new(max_edge_distance: f32) -> Self {
        Self {
            guid: Uuid::new_v4(),
            serialized: AtomicBool::new(false),
            network: RoutingNetwork::new(max_edge_distance),
            edge_profiles: AttributeIndex::new(IndexMode::PROFILES),
            edge_meta: AttributeIndex::new(IndexMode::META),
            supported_profiles: Vec::new(),
            meta: Tags::new(),
            contracted: BTreeMap::new(),
        }
    }

    pub fn guid(&self) -> Uuid {
        self.guid
    }

    /// Assign a fresh identity
    pub fn new_guid(&mut self) {
        self.guid = Uuid::new_v4();
    }

    pub fn is_empty(&self) -> bool {
        self.network.vertex_count() == 0
    }

    /// A change after serialization makes this a different network
    fn touch(&mut self) {
        if *self.serialized.get_mut() {
            self.new_guid();
            *self.serialized.get_mut() = false;
        }
    }

    pub fn network(&self) -> &RoutingNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut RoutingNetwork {
        self.touch();
        &mut self.network
    }

    pub fn edge_profiles(&self) -> &AttributeIndex {
        &self.edge_profiles
    }

    pub fn edge_profiles_mut(&mut self) -> &mut AttributeIndex {
        self.touch();
        &mut self.edge_profiles
    }

    pub fn edge_meta(&self) -> &AttributeIndex {
        &self.edge_meta
    }

    pub fn edge_meta_mut(&mut self) -> &mut AttributeIndex {
        self.touch();
        &mut self.edge_meta
    }

    pub fn add_supported_profile(&mut self, name: &str) {
        if !self.supports(name) {
            self.supported_profiles.push(name.to_string());
        }
    }

    pub fn supports(&self, name: &str) -> bool {
        self.supported_profiles.iter().any(|p| p == name)
    }

    pub fn supported_profiles(&self) -> &[String] {
        &self.supported_profiles
    }

    /// Descriptive tags about the database, e.g. source and build date
    pub fn meta(&self) -> &Tags {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Tags {
        &mut self.meta
    }

    /// Store a contracted graph for a supported profile, replacing any
    /// previous one
    pub fn add_contracted(&mut self, profile: &str, graph: Bytes) -> Result<()> {
        if !self.supports(profile) {
            return Err(Error::UnsupportedProfile(profile.to_string()));
        }
        self.contracted.insert(profile.to_string(), graph);
        Ok(())
    }

    pub fn remove_contracted(&mut self, profile: &str) -> bool {
        self.contracted.remove(profile).is_some()
    }

    pub fn try_get_contracted(&self, profile: &str) -> Option<&Bytes> {
        self.contracted.get(profile)
    }

    pub fn has_contracted_for(&self, profile: &str) -> bool {
        self.contracted.contains_key(profile)
    }

    /// Profile names with a contracted graph, sorted
    pub fn contracted_profiles(&self) -> impl Iterator<Item = &str> {
        self.contracted.keys().map(String::as_str)
    }

    /// Write the whole database; returns the number of bytes written
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<u64> {
        if self.contracted.len() > u8::MAX as usize {
            return Err(Error::Capacity(format!(
                "{} contracted graphs, at most {} can be stored",
                self.contracted.len(),
                u8::MAX
            )));
        }

        writer.write_u8(VERSION)?;
        writer.write_all(self.guid.as_bytes())?;
        let mut size = 1 + 16;

        let profiles_size = strings_size(self.supported_profiles.iter().map(String::as_str));
        write_block_header(writer, profiles_size)?;
        write_strings(writer, self.supported_profiles.iter().map(String::as_str))?;
        size += 8 + profiles_size;

        let meta_size = tags_size(&self.meta);
        write_block_header(writer, meta_size)?;
        write_tags(writer, &self.meta)?;
        size += 8 + meta_size;

        writer.write_u8(self.contracted.len() as u8)?;
        size += 1;

        write_block_header(writer, self.edge_profiles.serialized_size())?;
        size += 8 + self.edge_profiles.serialize(writer)?;
        write_block_header(writer, self.edge_meta.serialized_size())?;
        size += 8 + self.edge_meta.serialize(writer)?;
        write_block_header(writer, self.network.serialized_size())?;
        size += 8 + self.network.serialize(writer)?;

        for (profile, graph) in &self.contracted {
            write_string(writer, profile)?;
            write_block_header(writer, graph.len() as u64)?;
            writer.write_all(graph)?;
            size += string_size(profile) + 8 + graph.len() as u64;
        }

        self.serialized.store(true, Ordering::Relaxed);
        debug!("Serialized router db {} ({} bytes)", self.guid, size);
        Ok(size)
    }

    /// Read a database written by [`serialize`](Self::serialize)
    ///
    /// The attribute indexes come back read-only.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion {
                what: "router db",
                found: version,
                expected: VERSION,
            });
        }
        let mut guid = [0u8; 16];
        reader.read_exact(&mut guid)?;

        let supported_profiles = read_block(reader, |block| read_strings(block))?;
        let meta = read_block(reader, |block| read_tags(block))?;
        let contracted_count = reader.read_u8()?;
        let edge_profiles = read_block(reader, |block| AttributeIndex::deserialize(block))?;
        let edge_meta = read_block(reader, |block| AttributeIndex::deserialize(block))?;
        let network = read_block(reader, |block| RoutingNetwork::deserialize(block))?;

        let mut contracted = BTreeMap::new();
        for _ in 0..contracted_count {
            let profile = read_string(reader)?;
            let len = reader.read_u64::<LittleEndian>()?;
            let graph = read_bytes(reader, len)?;
            contracted.insert(profile, Bytes::from(graph));
        }

        Ok(Self {
            guid: Uuid::from_bytes(guid),
            serialized: AtomicBool::new(true),
            network,
            edge_profiles,
            edge_meta,
            supported_profiles,
            meta,
            contracted,
        })
    }

    /// Write one contracted graph tagged with this database's guid
    pub fn serialize_contracted<W: Write>(&self, profile: &str, writer: &mut W) -> Result<u64> {
        let graph = self
            .contracted
            .get(profile)
            .ok_or_else(|| Error::MissingContracted(profile.to_string()))?;
        writer.write_all(self.guid.as_bytes())?;
        write_string(writer, profile)?;
        write_block_header(writer, graph.len() as u64)?;
        writer.write_all(graph)?;
        Ok(16 + string_size(profile) + 8 + graph.len() as u64)
    }

    /// Read a graph written by [`serialize_contracted`](Self::serialize_contracted)
    /// and store it; returns the profile name
    ///
    /// Fails when the graph was built for another version of the network.
    pub fn deserialize_and_add_contracted<R: Read>(&mut self, reader: &mut R) -> Result<String> {
        let mut guid = [0u8; 16];
        reader.read_exact(&mut guid)?;
        let guid = Uuid::from_bytes(guid);
        if guid != self.guid {
            return Err(Error::GuidMismatch {
                expected: self.guid.to_string(),
                found: guid.to_string(),
            });
        }
        let profile = read_string(reader)?;
        let len = reader.read_u64::<LittleEndian>()?;
        let graph = read_bytes(reader, len)?;
        self.add_contracted(&profile, Bytes::from(graph))?;
        Ok(profile)
    }

    /// Write the database to `path` with a magic header and CRC-64 footer
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let file = File::create(path.as_ref())?;
        let mut writer = CrcWriter::new(BufWriter::new(file));
        writer.write_u32::<LittleEndian>(MAGIC)?;
        let size = 4 + self.serialize(&mut writer)?;

        let (mut inner, file_crc) = writer.finish();
        inner.write_u64::<LittleEndian>(file_crc)?;
        inner.flush()?;
        Ok(size + FOOTER_SIZE as u64)
    }

    /// Read a database written by [`write_file`](Self::write_file)
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        if bytes.len() < 4 + FOOTER_SIZE {
            return Err(Error::Format(format!(
                "{} is too short to be a router db ({} bytes)",
                path.as_ref().display(),
                bytes.len()
            )));
        }

        let (content, footer) = bytes.split_at(bytes.len() - FOOTER_SIZE);
        let expected = u64::from_le_bytes([
            footer[0], footer[1], footer[2], footer[3], footer[4], footer[5], footer[6], footer[7],
        ]);
        let computed = checksum(content);
        if expected != computed {
            return Err(Error::Checksum { expected, computed });
        }

        let mut reader = content;
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != MAGIC {
            return Err(Error::Format(format!(
                "bad magic 0x{:08x}, expected 0x{:08x}",
                magic, MAGIC
            )));
        }
        let db = Self::deserialize(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::Format(format!(
                "{} trailing bytes after router db",
                reader.len()
            )));
        }
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeData;

    fn sample() -> RouterDb {
        let mut db = RouterDb::default();
        db.add_supported_profile("car");
        db.meta_mut().add("source", "unit-test");

        let tags: Tags = [("highway", "residential")].into_iter().collect();
        let profile = db.edge_profiles_mut().add(&tags) as u16;
        let meta_tags: Tags = [("name", "Rue Neuve")].into_iter().collect();
        let meta_id = db.edge_meta_mut().add(&meta_tags);

        let network = db.network_mut();
        let a = network.add_vertex(50.85, 4.35);
        let b = network.add_vertex(50.851, 4.351);
        network.add_edge(
            a,
            b,
            EdgeData {
                distance: 131.0,
                profile,
                meta_id,
            },
            &[],
        );
        db
    }

    #[test]
    fn test_stream_round_trip() {
        let mut db = sample();
        db.add_contracted("car", Bytes::from_static(b"graph")).unwrap();

        let mut buf = Vec::new();
        let written = db.serialize(&mut buf).unwrap();
        assert_eq!(written, buf.len() as u64);

        let read = RouterDb::deserialize(&mut buf.as_slice()).unwrap();
        assert_eq!(read.guid(), db.guid());
        assert_eq!(read.supported_profiles(), db.supported_profiles());
        assert_eq!(read.meta(), db.meta());
        assert_eq!(read.network().vertex_count(), 2);
        assert_eq!(read.network().edge_count(), 1);
        assert_eq!(read.edge_profiles(), db.edge_profiles());
        assert_eq!(read.edge_meta(), db.edge_meta());
        assert_eq!(
            read.try_get_contracted("car"),
            Some(&Bytes::from_static(b"graph"))
        );
    }

    #[test]
    fn test_guid_changes_on_mutation_after_serialize() {
        let mut db = sample();
        let before = db.guid();

        // mutation before any serialize keeps the identity
        db.network_mut();
        assert_eq!(db.guid(), before);

        db.serialize(&mut Vec::new()).unwrap();
        assert_eq!(db.guid(), before);
        db.network();
        assert_eq!(db.guid(), before);

        db.network_mut().add_vertex(50.0, 4.0);
        let after = db.guid();
        assert_ne!(after, before);

        // only once per serialize
        db.edge_meta_mut();
        assert_eq!(db.guid(), after);
    }

    #[test]
    fn test_contracted_requires_supported_profile() {
        let mut db = sample();
        assert!(matches!(
            db.add_contracted("bicycle", Bytes::new()),
            Err(Error::UnsupportedProfile(_))
        ));
        db.add_contracted("car", Bytes::from_static(b"ch")).unwrap();
        assert!(db.has_contracted_for("car"));
        assert!(db.remove_contracted("car"));
        assert!(!db.has_contracted_for("car"));
        assert!(!db.remove_contracted("car"));
    }

    #[test]
    fn test_contracted_stream_checks_guid() {
        let mut db = sample();
        db.add_contracted("car", Bytes::from_static(b"ch")).unwrap();
        let mut buf = Vec::new();
        db.serialize_contracted("car", &mut buf).unwrap();

        db.remove_contracted("car");
        assert_eq!(
            db.deserialize_and_add_contracted(&mut buf.as_slice()).unwrap(),
            "car"
        );
        assert!(db.has_contracted_for("car"));

        let mut other = sample();
        assert!(matches!(
            other.deserialize_and_add_contracted(&mut buf.as_slice()),
            Err(Error::GuidMismatch { .. })
        ));

        assert!(matches!(
            db.serialize_contracted("bicycle", &mut Vec::new()),
            Err(Error::MissingContracted(_))
        ));
    }

    #[test]
    fn test_unknown_version() {
        let mut buf = Vec::new();
        sample().serialize(&mut buf).unwrap();
        buf[0] = 9;
        assert!(matches!(
            RouterDb::deserialize(&mut buf.as_slice()),
            Err(Error::UnsupportedVersion { found: 9, .. })
        ));
    }

    #[test]
    fn test_too_many_contracted_graphs() {
        let mut db = sample();
        for i in 0..256 {
            let name = format!("car.{}", i);
            db.add_supported_profile(&name);
            db.add_contracted(&name, Bytes::new()).unwrap();
        }
        assert!(matches!(
            db.serialize(&mut Vec::new()),
            Err(Error::Capacity(_))
        ));
    }
}
