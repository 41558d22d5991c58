//! Per-zone encryption and signature validation.
//!
//! An archive has four structural zones: the trailing base header, the local entry headers (with the
//! names and extra fields that follow them), the central directory block and the entry payloads.
//! Every zone can be given its own transform for each direction. Unset header zones fall back to
//! the base header transform, which in turn falls back to the default cipher; the payload zone falls
//! back to no transform at all.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::types::{BaseHeader, CentralDirHeader, LocalHeader};

/// In-place transform applied to a span of bytes
pub type Transform = Arc<dyn Fn(&mut [u8]) + Send + Sync>;

/// Caller supplied signature validator
pub type SignatureCheck = Arc<dyn Fn(HeaderKind, u32) -> bool + Send + Sync>;

/// The default decryption: `!(b.rotate_right(3))`
pub fn default_decrypt(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = !b.rotate_right(3);
    }
}

/// The default encryption: `(!b).rotate_left(3)`
pub fn default_encrypt(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = (!*b).rotate_left(3);
    }
}

/// A single structural zone of the archive
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Zone {
    BaseHeader,
    LocalHeader,
    CentralDirHeader,
    Buffer,
}

/// The header records carrying a signature
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    Base,
    Local,
    CentralDir,
}

impl HeaderKind {
    const fn slot(self) -> usize {
        match self {
            HeaderKind::Base => 0,
            HeaderKind::Local => 1,
            HeaderKind::CentralDir => 2,
        }
    }

    const fn zones(self) -> Zones {
        match self {
            HeaderKind::Base => Zones::BASE_HEADER,
            HeaderKind::Local => Zones::LOCAL_HEADER,
            HeaderKind::CentralDir => Zones::CENTRAL_DIR_HEADER,
        }
    }
}

/// Set of zones a configuration call applies to
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Zones(u8);

impl Zones {
    pub const NONE: Zones = Zones(0);
    pub const BASE_HEADER: Zones = Zones(1);
    pub const LOCAL_HEADER: Zones = Zones(2);
    pub const CENTRAL_DIR_HEADER: Zones = Zones(4);
    /// All three header zones
    pub const HEADERS: Zones = Zones(7);
    pub const BUFFER: Zones = Zones(8);
    pub const ALL: Zones = Zones(15);

    pub const fn contains(self, other: Zones) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Zones {
    type Output = Zones;

    fn bitor(self, rhs: Zones) -> Zones {
        Zones(self.0 | rhs.0)
    }
}

impl BitOrAssign for Zones {
    fn bitor_assign(&mut self, rhs: Zones) {
        self.0 |= rhs.0;
    }
}

/// Transforms registered for one direction (encryption or decryption)
#[derive(Clone, Default)]
pub struct CipherSet {
    base_header: Option<Transform>,
    local_header: Option<Transform>,
    central_dir_header: Option<Transform>,
    buffer: Option<Transform>,
}

impl fmt::Debug for CipherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSet")
            .field("base_header", &self.base_header.is_some())
            .field("local_header", &self.local_header.is_some())
            .field("central_dir_header", &self.central_dir_header.is_some())
            .field("buffer", &self.buffer.is_some())
            .finish()
    }
}

impl CipherSet {
    /// Registers `transform` for every zone in `zones`, `None` restores the fallback
    pub fn set(&mut self, zones: Zones, transform: Option<Transform>) {
        if zones.contains(Zones::BASE_HEADER) {
            self.base_header = transform.clone();
        }
        if zones.contains(Zones::LOCAL_HEADER) {
            self.local_header = transform.clone();
        }
        if zones.contains(Zones::CENTRAL_DIR_HEADER) {
            self.central_dir_header = transform.clone();
        }
        if zones.contains(Zones::BUFFER) {
            self.buffer = transform;
        }
    }

    pub fn is_set(&self, zone: Zone) -> bool {
        match zone {
            Zone::BaseHeader => self.base_header.is_some(),
            Zone::LocalHeader => self.local_header.is_some(),
            Zone::CentralDirHeader => self.central_dir_header.is_some(),
            Zone::Buffer => self.buffer.is_some(),
        }
    }

    /// Applies the fallback chain, using `default` where the base header has nothing registered
    pub(crate) fn resolve(&self, default: fn(&mut [u8])) -> Cipher {
        let base: Transform = self
            .base_header
            .clone()
            .unwrap_or_else(|| Arc::new(default) as Transform);

        Cipher {
            local_header: self.local_header.clone().unwrap_or_else(|| base.clone()),
            central_dir_header: self
                .central_dir_header
                .clone()
                .unwrap_or_else(|| base.clone()),
            buffer: self.buffer.clone(),
            base_header: base,
        }
    }
}

/// A [`CipherSet`] with every fallback applied
#[derive(Clone)]
pub(crate) struct Cipher {
    base_header: Transform,
    local_header: Transform,
    central_dir_header: Transform,
    buffer: Option<Transform>,
}

impl Cipher {
    pub fn apply(&self, zone: Zone, buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }

        match zone {
            Zone::BaseHeader => (self.base_header)(buf),
            Zone::LocalHeader => (self.local_header)(buf),
            Zone::CentralDirHeader => (self.central_dir_header)(buf),
            Zone::Buffer => {
                if let Some(buffer) = &self.buffer {
                    buffer(buf)
                }
            }
        }
    }
}

/// Signature acceptance rules for the three header kinds
#[derive(Clone)]
pub struct Signatures {
    known: [Vec<u32>; 3],
    overrides: [Option<u32>; 3],
    check: Option<SignatureCheck>,
}

impl Default for Signatures {
    fn default() -> Self {
        Self {
            known: [
                BaseHeader::KNOWN_SIGNATURES.to_vec(),
                LocalHeader::KNOWN_SIGNATURES.to_vec(),
                CentralDirHeader::KNOWN_SIGNATURES.to_vec(),
            ],
            overrides: [None; 3],
            check: None,
        }
    }
}

impl fmt::Debug for Signatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signatures")
            .field("known", &self.known)
            .field("overrides", &self.overrides)
            .field("check", &self.check.is_some())
            .finish()
    }
}

impl Signatures {
    /// Replaces the set of values accepted by default for `kind`
    pub fn set_known(&mut self, kind: HeaderKind, values: impl IntoIterator<Item = u32>) {
        self.known[kind.slot()] = values.into_iter().collect();
    }

    pub fn known(&self, kind: HeaderKind) -> &[u32] {
        &self.known[kind.slot()]
    }

    /// Sets the value written (and also accepted) for every header kind in `zones`
    pub fn set_override(&mut self, zones: Zones, value: Option<u32>) {
        for kind in [HeaderKind::Base, HeaderKind::Local, HeaderKind::CentralDir] {
            if zones.contains(kind.zones()) {
                self.overrides[kind.slot()] = value;
            }
        }
    }

    pub fn override_for(&self, kind: HeaderKind) -> Option<u32> {
        self.overrides[kind.slot()]
    }

    pub fn set_check(&mut self, check: Option<SignatureCheck>) {
        self.check = check;
    }

    /// Whether `value` is an acceptable signature for a `kind` header
    pub fn is_valid(&self, kind: HeaderKind, value: u32) -> bool {
        self.known[kind.slot()].contains(&value)
            || self.check.as_ref().is_some_and(|check| check(kind, value))
            || self.overrides[kind.slot()] == Some(value)
    }
}
