//! This library handles reading from and creating **MRS** files used by *GunZ: The Duel*.
//!
//! # MRS Archive Format Documentation
//!
//! MRS is a ZIP-like container. Entries are stored back to back, each behind a local header, and are
//! described a second time by a central directory. A base header at the very end of the file points
//! at the directory. Every header, name and extra field is obfuscated by a byte transform; entry
//! payloads are left as is unless a payload transform is registered.
//!
//! ## File Structure
//!
//! | Part               | Description                                                           |
//! |--------------------|-----------------------------------------------------------------------|
//! | Local entries      | Local header, name, extra field, then the stored payload, per entry   |
//! | Central directory  | Central directory header, name, extra field and comment, per entry    |
//! | Base header        | 22 bytes, the last bytes of the file                                  |
//!
//! ### Base Header
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Signature              | 4 bytes: 0x05030208 (also 0x05030207, 0x06054B50)          |
//! | 0x0004         | Disk Number            | 2 bytes: Always 0                                          |
//! | 0x0006         | Disk Start             | 2 bytes: Always 0                                          |
//! | 0x0008         | Entry Count            | 2 bytes: Number of entries on this disk                    |
//! | 0x000A         | Total Entry Count      | 2 bytes: Number of entries in the archive                  |
//! | 0x000C         | Directory Size         | 4 bytes: Size of the central directory block               |
//! | 0x0010         | Directory Offset       | 4 bytes: Offset of the central directory block             |
//! | 0x0014         | Comment Length         | 2 bytes: Always 0                                          |
//!
//! ### Local Header
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Signature              | 4 bytes: 0x04034B50 (also 0x85840000)                      |
//! | 0x0004         | Version                | 2 bytes: 0x14                                              |
//! | 0x0006         | Flags                  | 2 bytes                                                    |
//! | 0x0008         | Compression            | 2 bytes: 0 stored, 8 raw deflate                           |
//! | 0x000A         | Modified               | 4 bytes: DOS time word then DOS date word                  |
//! | 0x000E         | CRC32                  | 4 bytes: Checksum of the uncompressed payload              |
//! | 0x0012         | Compressed Size        | 4 bytes                                                    |
//! | 0x0016         | Uncompressed Size      | 4 bytes                                                    |
//! | 0x001A         | Name Length            | 2 bytes                                                    |
//! | 0x001C         | Extra Length           | 2 bytes                                                    |
//!
//! ### Central Directory Header
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Signature              | 4 bytes: 0x02014B50 (also 0x05024B80)                      |
//! | 0x0004         | Version Made           | 2 bytes: 0x19                                              |
//! | 0x0006         | Version Needed         | 2 bytes: 0x14                                              |
//! | 0x0008         | Flags                  | 2 bytes                                                    |
//! | 0x000A         | Compression            | 2 bytes: 0 stored, 8 raw deflate                           |
//! | 0x000C         | Modified               | 4 bytes: DOS time word then DOS date word                  |
//! | 0x0010         | CRC32                  | 4 bytes                                                    |
//! | 0x0014         | Compressed Size        | 4 bytes                                                    |
//! | 0x0018         | Uncompressed Size      | 4 bytes                                                    |
//! | 0x001C         | Name Length            | 2 bytes                                                    |
//! | 0x001E         | Extra Length           | 2 bytes                                                    |
//! | 0x0020         | Comment Length         | 2 bytes                                                    |
//! | 0x0022         | Disk Start             | 2 bytes                                                    |
//! | 0x0024         | Internal Attributes    | 2 bytes                                                    |
//! | 0x0026         | External Attributes    | 4 bytes                                                    |
//! | 0x002A         | Offset                 | 4 bytes: Offset of the local header                        |
//!
//! ## Obfuscation
//!
//! The default transform decrypts a byte as `!b.rotate_right(3)` and encrypts it as
//! `(!b).rotate_left(3)`. The local header, its name and its extra field are each transformed as
//! their own span; the whole central directory is a single span. Transforms can be replaced per
//! zone, see [`crypto`].
//!
//! ## Additional Information
//!
//! - **File Extension**: `.mrs`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Names**: `\` separated on disk, `/` separated in this crate
//!

pub mod archive;
pub mod buffers;
pub mod compression;
pub mod crypto;
pub mod dostime;
pub mod error;
pub mod ledger;
pub mod path;
pub mod read;
pub mod resolver;
pub mod scratch;
pub mod types;
pub mod walk;
pub mod write;

mod entry;

pub use archive::{Archive, ArchiveOptions, Source};
pub use compression::CompressionMethod;
pub use entry::EntryInfo;
pub use read::{list, verify};
pub use resolver::OnDupe;
pub use write::{compile, decompile, Progress, ProgressEvent, SaveMode};
