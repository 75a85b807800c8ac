use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

const LEN_BYTES: usize = 4;
const CRC_BYTES: usize = 4;
/// A length prefix above this is treated as corruption, not an allocation request.
const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// Frame one event as `[u32 len][bincode payload][u32 crc32]`, little endian.
fn write_record(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "journal record too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Why a replay stopped before the physical end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailDamage {
    /// The last record was cut short (crash mid-write).
    Truncated,
    /// A record failed its checksum or did not decode.
    Corrupt,
}

/// Everything recovered from a journal file.
#[derive(Debug, Default)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Set when trailing bytes were discarded.
    pub damage: Option<TailDamage>,
}

enum Record {
    Event(Event),
    End,
    Damaged(TailDamage),
}

/// Fill `buf` completely, or report how the stream ended.
/// `Ok(false)` means a clean EOF before the first byte.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<Result<bool, TailDamage>> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(Ok(false)),
            Ok(0) => return Ok(Err(TailDamage::Truncated)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Ok(true))
}

fn read_record(reader: &mut impl Read) -> io::Result<Record> {
    let mut len_buf = [0u8; LEN_BYTES];
    match read_full(reader, &mut len_buf)? {
        Ok(true) => {}
        Ok(false) => return Ok(Record::End),
        Err(damage) => return Ok(Record::Damaged(damage)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_RECORD_BYTES {
        return Ok(Record::Damaged(TailDamage::Corrupt));
    }
    let mut payload = vec![0u8; len];
    let mut crc_buf = [0u8; CRC_BYTES];
    for buf in [payload.as_mut_slice(), crc_buf.as_mut_slice()] {
        if !matches!(read_full(reader, buf)?, Ok(true)) {
            return Ok(Record::Damaged(TailDamage::Truncated));
        }
    }

    if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
        return Ok(Record::Damaged(TailDamage::Corrupt));
    }
    match bincode::deserialize::<Event>(&payload) {
        Ok(event) => Ok(Record::Event(event)),
        Err(_) => Ok(Record::Damaged(TailDamage::Corrupt)),
    }
}

/// Append-only journal file backing the engine.
///
/// Writes are buffered; `flush_sync` makes everything appended so far durable.
/// Compaction writes a replacement file next to the journal and renames it over.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Wal {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(Self::open_append(path)?),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    fn open_append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn compact_tmp_path(path: &Path) -> PathBuf {
        path.with_extension("wal.tmp")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Buffer one record. Not durable until `flush_sync`.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        write_record(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Write the replacement journal to a side file and fsync it.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(Self::compact_tmp_path(path))?);
        for event in events {
            write_record(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// Rename the side file over the journal and continue appending to it.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        fs::rename(Self::compact_tmp_path(&self.path), &self.path)?;
        self.writer = BufWriter::new(Self::open_append(&self.path)?);
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Replace the file with exactly `events`, dropping a damaged tail so
    /// later appends are not stranded behind it.
    pub fn rewrite(path: &Path, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(path, events)?;
        fs::rename(Self::compact_tmp_path(path), path)
    }

    /// Read every intact record. A missing file replays as empty; a damaged
    /// tail is dropped and reported in `Replay::damage`.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut replay = Replay::default();
        loop {
            match read_record(&mut reader)? {
                Record::Event(event) => replay.events.push(event),
                Record::End => break,
                Record::Damaged(damage) => {
                    replay.damage = Some(damage);
                    break;
                }
            }
        }
        Ok(replay)
    }
}
