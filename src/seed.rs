//! Startup Seed Files
//!
//! Binary record files read once at startup:
//!
//! - credentials: repeated `[address:4][credential:20]`
//! - peers: repeated `[ipv4:4][gateway port:2][peer port:2]`
//!
//! Records run to end of file; a trailing partial record is an error.

use crate::protocol::{
    Address, Credential, PortPair, ProtocolError, WireReader, ADDRESS_SIZE, CREDENTIAL_SIZE,
    IPV4_SIZE, PORT_PAIR_SIZE,
};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Size of one credential record.
pub const CREDENTIAL_RECORD_SIZE: usize = ADDRESS_SIZE + CREDENTIAL_SIZE;

/// Size of one peer record.
pub const PEER_RECORD_SIZE: usize = IPV4_SIZE + PORT_PAIR_SIZE;

/// One entry of the credential seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialSeed {
    pub address: Address,
    pub credential: Credential,
}

/// One entry of the peer seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerSeed {
    pub ip: Ipv4Addr,
    pub ports: PortPair,
}

/// Errors loading seed files.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed file not found: {0}")]
    Missing(PathBuf),

    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seed data truncated: {trailing} trailing bytes after {records} records of {record_size} bytes")]
    Truncated {
        records: usize,
        record_size: usize,
        trailing: usize,
    },

    #[error("corrupt seed record: {0}")]
    Corrupt(#[from] ProtocolError),
}

fn check_length(data: &[u8], record_size: usize) -> Result<(), SeedError> {
    let trailing = data.len() % record_size;
    if trailing != 0 {
        return Err(SeedError::Truncated {
            records: data.len() / record_size,
            record_size,
            trailing,
        });
    }
    Ok(())
}

/// Decode a credential seed.
pub fn parse_credentials(data: &[u8]) -> Result<Vec<CredentialSeed>, SeedError> {
    check_length(data, CREDENTIAL_RECORD_SIZE)?;

    let mut reader = WireReader::new(data);
    let mut seeds = Vec::with_capacity(data.len() / CREDENTIAL_RECORD_SIZE);
    while !reader.is_empty() {
        seeds.push(CredentialSeed {
            address: reader.read_address()?,
            credential: reader.read_credential()?,
        });
    }
    Ok(seeds)
}

/// Decode a peer seed.
pub fn parse_peers(data: &[u8]) -> Result<Vec<PeerSeed>, SeedError> {
    check_length(data, PEER_RECORD_SIZE)?;

    let mut reader = WireReader::new(data);
    let mut seeds = Vec::with_capacity(data.len() / PEER_RECORD_SIZE);
    while !reader.is_empty() {
        seeds.push(PeerSeed {
            ip: reader.read_ipv4()?,
            ports: reader.read_port_pair()?,
        });
    }
    Ok(seeds)
}

pub fn encode_credentials(seeds: &[CredentialSeed]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(seeds.len() * CREDENTIAL_RECORD_SIZE);
    for seed in seeds {
        buf.extend_from_slice(&seed.address.to_bytes());
        buf.extend_from_slice(seed.credential.as_bytes());
    }
    buf
}

pub fn encode_peers(seeds: &[PeerSeed]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(seeds.len() * PEER_RECORD_SIZE);
    for seed in seeds {
        buf.extend_from_slice(&seed.ip.octets());
        buf.extend_from_slice(&seed.ports.to_bytes());
    }
    buf
}

/// Read a seed file.
///
/// A missing file yields `Ok(None)` with a warning unless `required`.
fn read_file(path: &Path, required: bool) -> Result<Option<Vec<u8>>, SeedError> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(SeedError::Missing(path.to_path_buf()))
            } else {
                warn!(path = %path.display(), "Seed file not found, skipping");
                Ok(None)
            }
        }
        Err(e) => Err(SeedError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub fn load_credentials(path: &Path, required: bool) -> Result<Vec<CredentialSeed>, SeedError> {
    match read_file(path, required)? {
        Some(data) => parse_credentials(&data),
        None => Ok(Vec::new()),
    }
}

pub fn load_peers(path: &Path, required: bool) -> Result<Vec<PeerSeed>, SeedError> {
    match read_file(path, required)? {
        Some(data) => parse_peers(&data),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn credential_seed() -> CredentialSeed {
        CredentialSeed {
            address: Address::new(1, 2),
            credential: Credential::padded(b"KEY0000000000000001").unwrap(),
        }
    }

    #[test]
    fn test_credential_record_layout() {
        let data = encode_credentials(&[credential_seed()]);
        assert_eq!(data.len(), CREDENTIAL_RECORD_SIZE);
        assert_eq!(&data[..4], &[0, 1, 0, 2]);
        assert_eq!(&data[4..23], b"KEY0000000000000001");
        assert_eq!(data[23], 0);

        assert_eq!(parse_credentials(&data).unwrap(), vec![credential_seed()]);
    }

    #[test]
    fn test_peer_records() {
        let data = [10, 0, 0, 1, 0xAB, 0x04, 0xAB, 0x05, 10, 0, 0, 2, 0, 1, 0, 2];
        let peers = parse_peers(&data).unwrap();
        assert_eq!(
            peers,
            vec![
                PeerSeed {
                    ip: Ipv4Addr::new(10, 0, 0, 1),
                    ports: PortPair::new(43780, 43781),
                },
                PeerSeed {
                    ip: Ipv4Addr::new(10, 0, 0, 2),
                    ports: PortPair::new(1, 2),
                },
            ]
        );
        assert_eq!(encode_peers(&peers), data.to_vec());
    }

    #[test]
    fn test_empty_files() {
        assert!(parse_credentials(&[]).unwrap().is_empty());
        assert!(parse_peers(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_partial_record() {
        let mut data = encode_credentials(&[credential_seed()]);
        data.extend_from_slice(&[0, 1, 0]);

        match parse_credentials(&data) {
            Err(SeedError::Truncated {
                records,
                record_size,
                trailing,
            }) => {
                assert_eq!(records, 1);
                assert_eq!(record_size, CREDENTIAL_RECORD_SIZE);
                assert_eq!(trailing, 3);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        assert!(matches!(
            parse_peers(&[10, 0, 0, 1, 0]),
            Err(SeedError::Truncated { .. })
        ));
    }

    #[test]
    fn test_load_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let creds_path = temp_dir.path().join("credentials.bin");
        let peers_path = temp_dir.path().join("peers.bin");
        fs::write(&creds_path, encode_credentials(&[credential_seed()])).unwrap();
        fs::write(&peers_path, [127, 0, 0, 1, 0, 80, 0, 81]).unwrap();

        assert_eq!(load_credentials(&creds_path, true).unwrap().len(), 1);
        let peers = load_peers(&peers_path, true).unwrap();
        assert_eq!(peers[0].ports, PortPair::new(80, 81));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.bin");

        assert!(load_credentials(&path, false).unwrap().is_empty());
        assert!(matches!(
            load_peers(&path, true),
            Err(SeedError::Missing(_))
        ));
    }
}
