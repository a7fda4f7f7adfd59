//! Direct access to OpenType table data
//!
//! The font compiler regenerates some `head` and `OS/2` fields in ways the
//! patcher does not want. [`TableEditor`] reads and rewrites those fields in
//! the finished file, keeping table checksums and the file-wide
//! `checksumAdjustment` correct. It works on plain SFNT files and on TTC
//! collections and needs nothing but `Read + Write + Seek`.

pub mod compiler;
pub mod fixup;

pub use compiler::{is_binary_font, FontCompiler};
pub use fixup::{fix_font_files, fix_tables, variation_tables, AvgWidthFix, FixReport};

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

/// `checksumAdjustment` makes the whole file sum to this value
pub const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

const COLLECTION_SIGNATURE: [u8; 4] = *b"ttcf";
const TABLE_RECORD_LEN: u64 = 16;

/// Tables only present in variable fonts
pub const VARIATION_TABLES: [Tag; 7] = [
    Tag::new(*b"avar"),
    Tag::new(*b"cvar"),
    Tag::new(*b"fvar"),
    Tag::new(*b"gvar"),
    Tag::new(*b"HVAR"),
    Tag::new(*b"MVAR"),
    Tag::new(*b"VVAR"),
];

/// A four byte table tag
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const HEAD: Tag = Tag::new(*b"head");
    pub const OS2: Tag = Tag::new(*b"OS/2");

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no '{tag}' table in subfont {subfont}")]
    TableNotFound { tag: Tag, subfont: u32 },
    #[error("trying to access subfont index {index} but have only {count} fonts")]
    SubfontOutOfRange { index: u32, count: u32 },
    #[error("trying to access subfont {index} but file is no collection")]
    NotACollection { index: u32 },
    #[error("font data ends before byte {0}")]
    Truncated(u64),
    #[error("checksum of whole font is bad (stored 0x{stored:08X}, expected 0x{expected:08X})")]
    ChecksumMismatch { stored: u32, expected: u32 },
    #[error("field {field:?} lives in '{expected}', not in '{found}'")]
    WrongTable { field: Field, expected: Tag, found: Tag },
}

pub type TableResult<T> = Result<T, TableError>;

/// Where one table lives in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontTableHandle {
    pub tag: Tag,
    pub subfont: u32,
    pub offset: u32,
    pub length: u32,
    pub checksum: u32,
    /// File offset of the checksum in the table record
    pub checksum_field: u64,
}

impl FontTableHandle {
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }
}

/// Fixed position fields the patcher repairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `head.checksumAdjustment`
    ChecksumAdjustment,
    /// `head.flags`
    Flags,
    /// `head.lowestRecPPEM`
    LowestRecPpem,
    /// `OS/2.xAvgCharWidth`
    AvgCharWidth,
}

impl Field {
    pub fn table(self) -> Tag {
        match self {
            Self::AvgCharWidth => Tag::OS2,
            _ => Tag::HEAD,
        }
    }

    /// Byte offset inside the owning table
    pub fn offset(self) -> u32 {
        match self {
            Self::ChecksumAdjustment => 8,
            Self::Flags => 16,
            Self::LowestRecPpem => 46,
            Self::AvgCharWidth => 2,
        }
    }

    /// Field size in bytes
    pub fn size(self) -> u32 {
        match self {
            Self::ChecksumAdjustment => 4,
            _ => 2,
        }
    }
}

/// Sum big-endian u32 words, padding a trailing partial word with zeros
pub fn checksum_of(bytes: &[u8]) -> u32 {
    let mut chunks = bytes.chunks_exact(4);
    let mut sum = chunks.by_ref().fold(0u32, |sum, word| {
        sum.wrapping_add(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
    });
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut word = [0u8; 4];
        word[..rest.len()].copy_from_slice(rest);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

/// Reads and patches tables of one font file
#[derive(Debug)]
pub struct TableEditor<F> {
    file: F,
    num_fonts: u32,
    collection: bool,
    dirty: bool,
}

impl TableEditor<File> {
    /// Open a font file, for writing when `writable` is set
    pub fn open(path: impl AsRef<Path>, writable: bool) -> TableResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path.as_ref())?;
        Self::new(file)
    }
}

impl<F: Read + Write + Seek> TableEditor<F> {
    pub fn new(mut file: F) -> TableResult<Self> {
        let mut signature = [0u8; 4];
        read_exact_at(&mut file, 0, &mut signature)?;
        let (collection, num_fonts) = if signature == COLLECTION_SIGNATURE {
            let count = read_u32_from(&mut file, 8)?;
            (true, count)
        } else {
            (false, 1)
        };
        Ok(Self {
            file,
            num_fonts,
            collection,
            dirty: false,
        })
    }

    pub fn num_fonts(&self) -> u32 {
        self.num_fonts
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Whether any field was written since opening
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn into_inner(self) -> F {
        self.file
    }

    /// File offset of a subfont's table directory
    fn directory_offset(&mut self, subfont: u32) -> TableResult<u64> {
        if self.collection {
            if subfont >= self.num_fonts {
                return Err(TableError::SubfontOutOfRange {
                    index: subfont,
                    count: self.num_fonts,
                });
            }
            let offset = read_u32_from(&mut self.file, 12 + 4 * u64::from(subfont))?;
            Ok(u64::from(offset))
        } else if subfont != 0 {
            Err(TableError::NotACollection { index: subfont })
        } else {
            Ok(0)
        }
    }

    /// All table records of one subfont
    pub fn tables(&mut self, subfont: u32) -> TableResult<Vec<FontTableHandle>> {
        let directory = self.directory_offset(subfont)?;
        let num_tables = read_u16_from(&mut self.file, directory + 4)?;

        let mut tables = Vec::with_capacity(usize::from(num_tables));
        for index in 0..u64::from(num_tables) {
            let record = directory + 12 + index * TABLE_RECORD_LEN;
            let mut bytes = [0u8; 16];
            read_exact_at(&mut self.file, record, &mut bytes)?;
            tables.push(FontTableHandle {
                tag: Tag::new([bytes[0], bytes[1], bytes[2], bytes[3]]),
                subfont,
                checksum: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
                offset: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
                length: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
                checksum_field: record + 4,
            });
        }
        Ok(tables)
    }

    /// First table matching any of `tags`
    pub fn find_any(&mut self, tags: &[Tag], subfont: u32) -> TableResult<Option<FontTableHandle>> {
        Ok(self
            .tables(subfont)?
            .into_iter()
            .find(|table| tags.contains(&table.tag)))
    }

    pub fn locate(&mut self, tag: Tag, subfont: u32) -> TableResult<FontTableHandle> {
        self.find_any(&[tag], subfont)?
            .ok_or(TableError::TableNotFound { tag, subfont })
    }

    fn field_position(table: &FontTableHandle, field: Field) -> TableResult<u64> {
        if table.tag != field.table() {
            return Err(TableError::WrongTable {
                field,
                expected: field.table(),
                found: table.tag,
            });
        }
        if field.offset() + field.size() > table.length {
            return Err(TableError::Truncated(table.end()));
        }
        Ok(u64::from(table.offset) + u64::from(field.offset()))
    }

    pub fn read_field(&mut self, table: &FontTableHandle, field: Field) -> TableResult<u32> {
        let position = Self::field_position(table, field)?;
        match field.size() {
            4 => read_u32_from(&mut self.file, position),
            _ => read_u16_from(&mut self.file, position).map(u32::from),
        }
    }

    /// Write a field, returning whether the stored value changed
    pub fn write_field(
        &mut self,
        table: &FontTableHandle,
        field: Field,
        value: u32,
    ) -> TableResult<bool> {
        if self.read_field(table, field)? == value {
            return Ok(false);
        }
        let position = Self::field_position(table, field)?;
        match field.size() {
            4 => self.write_at(position, &value.to_be_bytes())?,
            // 16 bit fields take the low half
            _ => self.write_at(position, &(value as u16).to_be_bytes())?,
        }
        Ok(true)
    }

    fn write_at(&mut self, position: u64, bytes: &[u8]) -> TableResult<()> {
        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(bytes)?;
        self.dirty = true;
        Ok(())
    }

    /// Checksum of the bytes in `start..end`
    pub fn checksum(&mut self, start: u64, end: u64) -> TableResult<u32> {
        let len = end.saturating_sub(start);
        let mut bytes = vec![0u8; usize::try_from(len).map_err(|_| TableError::Truncated(end))?];
        read_exact_at(&mut self.file, start, &mut bytes)?;
        Ok(checksum_of(&bytes))
    }

    /// Checksum a table should carry
    ///
    /// For `head` the stored `checksumAdjustment` is left out of the sum.
    pub fn table_checksum(&mut self, table: &FontTableHandle) -> TableResult<u32> {
        let sum = self.checksum(u64::from(table.offset), table.end())?;
        if table.tag == Tag::HEAD {
            let adjustment = self.read_field(table, Field::ChecksumAdjustment)?;
            Ok(sum.wrapping_sub(adjustment))
        } else {
            Ok(sum)
        }
    }

    /// Recompute and store a table's checksum in its table record
    pub fn reset_table_checksum(&mut self, table: &FontTableHandle) -> TableResult<u32> {
        let checksum = self.table_checksum(table)?;
        if checksum != read_u32_from(&mut self.file, table.checksum_field)? {
            self.write_at(table.checksum_field, &checksum.to_be_bytes())?;
        }
        Ok(checksum)
    }

    fn file_len(&mut self) -> TableResult<u64> {
        Ok(self.file.seek(SeekFrom::End(0))?)
    }

    /// Sum of the whole file with `head.checksumAdjustment` taken out
    pub fn full_checksum(&mut self, head: &FontTableHandle) -> TableResult<u32> {
        let end = self.file_len()?;
        let sum = self.checksum(0, end)?;
        let adjustment = self.read_field(head, Field::ChecksumAdjustment)?;
        Ok(sum.wrapping_sub(adjustment))
    }

    /// Store the `checksumAdjustment` that makes the file sum to the magic value
    pub fn reset_full_checksum(&mut self, head: &FontTableHandle) -> TableResult<u32> {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(self.full_checksum(head)?);
        self.write_field(head, Field::ChecksumAdjustment, adjustment)?;
        Ok(adjustment)
    }

    pub fn verify_full_checksum(&mut self, head: &FontTableHandle) -> TableResult<()> {
        let expected = CHECKSUM_MAGIC.wrapping_sub(self.full_checksum(head)?);
        let stored = self.read_field(head, Field::ChecksumAdjustment)?;
        if stored != expected {
            return Err(TableError::ChecksumMismatch { stored, expected });
        }
        Ok(())
    }

    /// Variation tables present in the first subfont
    pub fn variation_tables(&mut self) -> TableResult<Vec<Tag>> {
        Ok(self
            .tables(0)?
            .into_iter()
            .map(|table| table.tag)
            .filter(|tag| VARIATION_TABLES.contains(tag))
            .collect())
    }
}

fn read_exact_at<F: Read + Seek>(file: &mut F, position: u64, buf: &mut [u8]) -> TableResult<()> {
    file.seek(SeekFrom::Start(position))?;
    file.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => TableError::Truncated(position + buf.len() as u64),
        _ => TableError::Io(err),
    })
}

fn read_u16_from<F: Read + Seek>(file: &mut F, position: u64) -> TableResult<u16> {
    let mut bytes = [0u8; 2];
    read_exact_at(file, position, &mut bytes)?;
    Ok(u16::from_be_bytes(bytes))
}

fn read_u32_from<F: Read + Seek>(file: &mut F, position: u64) -> TableResult<u32> {
    let mut bytes = [0u8; 4];
    read_exact_at(file, position, &mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
}


#[cfg(test)]
mod tests {
    use super::testfont::*;
    use super::*;
    use std::io::Cursor;

    fn simple_font() -> Vec<u8> {
        sfnt(&[(Tag::OS2, os2(500)), (Tag::HEAD, head(0x000B, 8))])
    }

    #[test]
    fn checksum_pads_partial_words() {
        assert_eq!(checksum_of(&[]), 0);
        assert_eq!(checksum_of(&[0, 0, 0, 1, 0, 0, 0, 2]), 3);
        // Three trailing bytes count as 0xAABBCC00
        let bytes = [0x00, 0x00, 0x01, 0x00, 0xAA, 0xBB, 0xCC];
        assert_eq!(checksum_of(&bytes), 0x0000_0100 + 0xAABB_CC00);
        // Overflow wraps
        assert_eq!(checksum_of(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 2]), 1);
    }

    #[test]
    fn editor_checksum_uses_half_open_range() {
        let mut editor =
            TableEditor::new(Cursor::new(vec![0, 0, 0, 5, 0xAA, 0xBB, 0xCC, 0xDD])).unwrap();
        assert_eq!(editor.checksum(0, 4).unwrap(), 5);
        assert_eq!(editor.checksum(0, 7).unwrap(), 5 + 0xAABB_CC00);
        assert_eq!(editor.checksum(4, 4).unwrap(), 0);
    }

    #[test]
    fn locates_tables_in_plain_fonts() {
        let mut editor = TableEditor::new(Cursor::new(simple_font())).unwrap();
        assert_eq!(editor.num_fonts(), 1);
        assert!(!editor.is_collection());

        let head = editor.locate(Tag::HEAD, 0).unwrap();
        assert_eq!(head.length, HEAD_LEN as u32);
        assert_eq!(editor.read_field(&head, Field::Flags).unwrap(), 0x000B);
        assert_eq!(editor.read_field(&head, Field::LowestRecPpem).unwrap(), 8);

        let os2 = editor.locate(Tag::OS2, 0).unwrap();
        assert_eq!(editor.read_field(&os2, Field::AvgCharWidth).unwrap(), 500);
        assert_eq!(editor.table_checksum(&os2).unwrap(), os2.checksum);
        assert_eq!(editor.table_checksum(&head).unwrap(), head.checksum);
    }

    #[test]
    fn missing_tables_and_subfonts_are_errors() {
        let mut editor = TableEditor::new(Cursor::new(simple_font())).unwrap();
        assert!(matches!(
            editor.locate(Tag::new(*b"glyf"), 0),
            Err(TableError::TableNotFound { .. })
        ));
        assert!(matches!(
            editor.locate(Tag::HEAD, 1),
            Err(TableError::NotACollection { index: 1 })
        ));
    }

    #[test]
    fn fields_check_their_table() {
        let mut editor = TableEditor::new(Cursor::new(simple_font())).unwrap();
        let os2 = editor.locate(Tag::OS2, 0).unwrap();
        assert!(matches!(
            editor.read_field(&os2, Field::Flags),
            Err(TableError::WrongTable { .. })
        ));
    }

    #[test]
    fn collections_resolve_subfonts() {
        let file = collection(&[
            vec![(Tag::HEAD, head(0, 9))],
            vec![(Tag::HEAD, head(0, 12)), (Tag::OS2, os2(600))],
        ]);
        let mut editor = TableEditor::new(Cursor::new(file)).unwrap();
        assert!(editor.is_collection());
        assert_eq!(editor.num_fonts(), 2);

        let first = editor.locate(Tag::HEAD, 0).unwrap();
        let second = editor.locate(Tag::HEAD, 1).unwrap();
        assert_ne!(first.offset, second.offset);
        assert_eq!(editor.read_field(&first, Field::LowestRecPpem).unwrap(), 9);
        assert_eq!(editor.read_field(&second, Field::LowestRecPpem).unwrap(), 12);
        assert!(editor.locate(Tag::OS2, 0).is_err());
        assert!(matches!(
            editor.locate(Tag::HEAD, 2),
            Err(TableError::SubfontOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn unchanged_writes_leave_the_file_clean() {
        let mut editor = TableEditor::new(Cursor::new(simple_font())).unwrap();
        let head = editor.locate(Tag::HEAD, 0).unwrap();
        assert!(!editor.write_field(&head, Field::LowestRecPpem, 8).unwrap());
        assert!(!editor.is_dirty());
        assert!(editor.write_field(&head, Field::LowestRecPpem, 6).unwrap());
        assert!(editor.is_dirty());
        assert_eq!(editor.read_field(&head, Field::LowestRecPpem).unwrap(), 6);
    }

    #[test]
    fn table_checksum_follows_field_writes() {
        let mut editor = TableEditor::new(Cursor::new(simple_font())).unwrap();
        let os2 = editor.locate(Tag::OS2, 0).unwrap();
        editor.write_field(&os2, Field::AvgCharWidth, 612).unwrap();
        assert_ne!(editor.table_checksum(&os2).unwrap(), os2.checksum);

        let stored = editor.reset_table_checksum(&os2).unwrap();
        let reread = editor.locate(Tag::OS2, 0).unwrap();
        assert_eq!(reread.checksum, stored);
        assert_eq!(editor.table_checksum(&reread).unwrap(), stored);
    }

    #[test]
    fn head_checksum_ignores_the_adjustment() {
        let mut editor = TableEditor::new(Cursor::new(simple_font())).unwrap();
        let head = editor.locate(Tag::HEAD, 0).unwrap();
        let before = editor.table_checksum(&head).unwrap();
        editor.write_field(&head, Field::ChecksumAdjustment, 0x1234_5678).unwrap();
        assert_eq!(editor.table_checksum(&head).unwrap(), before);
    }

    #[test]
    fn full_checksum_round_trip() {
        let mut editor = TableEditor::new(Cursor::new(simple_font())).unwrap();
        let head = editor.locate(Tag::HEAD, 0).unwrap();
        assert!(matches!(
            editor.verify_full_checksum(&head),
            Err(TableError::ChecksumMismatch { .. })
        ));

        editor.reset_full_checksum(&head).unwrap();
        editor.verify_full_checksum(&head).unwrap();

        let bytes = editor.into_inner().into_inner();
        assert_eq!(checksum_of(&bytes), CHECKSUM_MAGIC);
    }

    #[test]
    fn variation_tables_are_reported() {
        let file = sfnt(&[
            (Tag::HEAD, head(0, 8)),
            (Tag::new(*b"fvar"), vec![0; 16]),
            (Tag::new(*b"gvar"), vec![0; 20]),
        ]);
        let mut editor = TableEditor::new(Cursor::new(file)).unwrap();
        let tags = editor.variation_tables().unwrap();
        assert_eq!(tags, vec![Tag::new(*b"fvar"), Tag::new(*b"gvar")]);
        assert_eq!(tags[0].to_string(), "fvar");
    }

    #[test]
    fn truncated_files_are_reported() {
        let mut bytes = simple_font();
        bytes.truncate(20);
        let mut editor = TableEditor::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(editor.tables(0), Err(TableError::Truncated(_))));
    }
}
