use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;

use crate::as_graphs::as_graph::{CustomerProviderLink, PeerLink, ASN};
use crate::shared::SimulationError;

const INPUT_CLIQUE_HEADER: &str = "# input clique:";

/// Links parsed out of one serial-2 file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CAIDALinks {
    pub cp_links: Vec<CustomerProviderLink>,
    pub peer_links: Vec<PeerLink>,
    pub input_clique: Vec<ASN>,
}

/// Converter for CAIDA AS relationship files.
///
/// Lines look like `provider|customer|-1` or `peer|peer|0`, optionally with a
/// trailing `|source` column. Files ending in `.bz2` are decompressed on the fly.
pub struct CAIDAASGraphConverter {
    file_path: PathBuf,
}

impl CAIDAASGraphConverter {
    pub fn new(file_path: &Path) -> Self {
        CAIDAASGraphConverter {
            file_path: file_path.to_path_buf(),
        }
    }

    pub fn read_links(&self) -> Result<CAIDALinks, SimulationError> {
        let file = File::open(&self.file_path)?;
        let is_bz2 = self
            .file_path
            .extension()
            .map_or(false, |ext| ext == "bz2");
        let reader: Box<dyn Read> = if is_bz2 {
            Box::new(BzDecoder::new(file))
        } else {
            Box::new(file)
        };
        parse_links(BufReader::new(reader))
    }
}

pub fn parse_links<R: BufRead>(reader: R) -> Result<CAIDALinks, SimulationError> {
    let mut links = CAIDALinks::default();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let trimmed = line.trim();

        if let Some(asns) = trimmed.strip_prefix(INPUT_CLIQUE_HEADER) {
            for asn_str in asns.split_whitespace() {
                let asn = asn_str.parse::<ASN>().map_err(|_| malformed(line_no, &line))?;
                links.input_clique.push(asn);
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = trimmed.split('|').collect();
        if parts.len() < 3 {
            return Err(malformed(line_no, &line));
        }
        let asn1 = parts[0].parse::<ASN>().map_err(|_| malformed(line_no, &line))?;
        let asn2 = parts[1].parse::<ASN>().map_err(|_| malformed(line_no, &line))?;
        match parts[2] {
            "-1" => links.cp_links.push(CustomerProviderLink::new(asn1, asn2)),
            "0" => links.peer_links.push(PeerLink::new(asn1, asn2)),
            other => {
                log::warn!("Skipping line {} with unknown relationship type {}", line_no, other);
            }
        }
    }

    Ok(links)
}

fn malformed(line: usize, content: &str) -> SimulationError {
    SimulationError::MalformedTopology {
        line,
        content: content.to_string(),
    }
}
