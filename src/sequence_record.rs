use crate::error::{ErrorCode, PipelineError};
use bio::io::fasta;
use std::{fs::File, io::BufWriter, path::Path};

pub const HEADER_FIELD_SEPARATOR: char = '|';
pub const DATE_FIELD: usize = 1;
pub const PASSAGE_FIELD: usize = 2;

/// One FASTA entry. The header is `id` plus the optional free-text description,
/// whose pipe-delimited fields carry the collection date and passage history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceRecord {
    id: String,
    desc: Option<String>,
    seq: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: &str, desc: Option<&str>, seq: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            desc: desc.map(|d| d.to_string()),
            seq: seq.to_vec(),
        }
    }

    pub fn from_fasta_record(record: &fasta::Record) -> Self {
        Self::new(record.id(), record.desc(), record.seq())
    }

    pub fn from_fasta_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, PipelineError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            let mut err = PipelineError::from(e);
            err.message = format!("Could not open FASTA file '{}': {}", path.display(), err.message);
            err
        })?;
        fasta::Reader::new(file)
            .records()
            .map(|record| {
                record
                    .map(|record| Self::from_fasta_record(&record))
                    .map_err(|e| {
                        PipelineError::new(
                            ErrorCode::InvalidInput,
                            format!("Could not parse FASTA file '{}': {e}", path.display()),
                        )
                    })
            })
            .collect()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Full header line without the leading `>`.
    pub fn header(&self) -> String {
        match &self.desc {
            Some(desc) => format!("{} {desc}", self.id),
            None => self.id.clone(),
        }
    }

    /// Pipe-delimited header field; field 0 starts with the identifier.
    pub fn header_field(&self, index: usize) -> Option<String> {
        self.header()
            .split(HEADER_FIELD_SEPARATOR)
            .nth(index)
            .map(|s| s.to_string())
    }

    pub fn with_sequence(&self, seq: &[u8]) -> Self {
        Self {
            id: self.id.clone(),
            desc: self.desc.clone(),
            seq: seq.to_vec(),
        }
    }
}

pub fn write_fasta_file<'a, P, I>(path: P, records: I) -> Result<usize, PipelineError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a SequenceRecord>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| {
        PipelineError::new(
            ErrorCode::Io,
            format!("Could not create FASTA file '{}': {e}", path.display()),
        )
    })?;
    let mut writer = fasta::Writer::new(BufWriter::new(file));
    let mut written = 0;
    for record in records {
        writer
            .write(record.id(), record.desc(), record.seq())
            .map_err(|e| {
                PipelineError::new(
                    ErrorCode::Io,
                    format!("Could not write FASTA record to '{}': {e}", path.display()),
                )
            })?;
        written += 1;
    }
    writer.flush().map_err(|e| {
        PipelineError::new(
            ErrorCode::Io,
            format!("Could not flush FASTA file '{}': {e}", path.display()),
        )
    })?;
    Ok(written)
}
