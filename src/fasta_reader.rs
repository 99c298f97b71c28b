// FASTA reader for the CLI, using bio::io::fasta with automatic gzip
// detection by file extension. The core never reads files; this is glue
// around analyze().

use bio::io::fasta;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read};

/// One input record: name plus sequence text.
pub struct FastaRecord {
    pub name: String,
    pub sequence: String,
}

pub struct FastaReader {
    records: fasta::Records<io::BufReader<Box<dyn Read>>>,
}

impl FastaReader {
    /// Open a FASTA file (.fa, .fasta, optionally .gz).
    pub fn new(path: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if path.ends_with(".gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self {
            records: fasta::Reader::new(reader).records(),
        })
    }
}

impl Iterator for FastaReader {
    type Item = io::Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.records.next()? {
            Ok(record) => Some(Ok(FastaRecord {
                name: record.id().to_string(),
                sequence: String::from_utf8_lossy(record.seq()).into_owned(),
            })),
            Err(e) => Some(Err(e)),
        }
    }
}
