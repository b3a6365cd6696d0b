/*
 * Provides utility functions for calculating checksums of files.
 * Currently, it supports SHA256 checksum calculation. This module is used to
 * detect file content changes cheaply, so persisted per-file token counts can
 * be reused across sessions without re-reading unchanged files.
 */
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/*
 * Calculates the SHA256 checksum of a file and returns it as a hex-encoded
 * string.
 *
 * Reads the file in chunks to handle potentially large files efficiently. If
 * any I/O error occurs during file reading or if the path does not point to a
 * file, an `io::Error` is returned.
 */
pub fn calculate_sha256_checksum(file_path: &Path) -> io::Result<String> {
    if !file_path.is_file() {
        let err_msg = format!("Path {file_path:?} is not a file, cannot calculate checksum.");
        log::warn!("ChecksumUtils: {err_msg}");
        return Err(io::Error::new(io::ErrorKind::InvalidInput, err_msg));
    }

    let file = File::open(file_path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0; 1024 * 4];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let hash_bytes = hasher.finalize();
    Ok(format!("{hash_bytes:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_calculate_sha256_checksum_existing_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = b"hello checksum";
        temp_file.as_file_mut().write_all(content).unwrap();

        let checksum = calculate_sha256_checksum(temp_file.path()).unwrap();
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));

        // Same content, same digest.
        let mut second_file = NamedTempFile::new().unwrap();
        second_file.as_file_mut().write_all(content).unwrap();
        assert_eq!(
            checksum,
            calculate_sha256_checksum(second_file.path()).unwrap()
        );
    }

    #[test]
    fn test_calculate_sha256_checksum_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let checksum = calculate_sha256_checksum(temp_file.path()).unwrap();

        // SHA256 of the empty input.
        assert_eq!(
            checksum,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_sha256_checksum_changes_with_content() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.as_file_mut().write_all(b"version one").unwrap();
        let first = calculate_sha256_checksum(temp_file.path()).unwrap();

        temp_file.as_file_mut().write_all(b" and more").unwrap();
        let second = calculate_sha256_checksum(temp_file.path()).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_calculate_sha256_checksum_non_existing_file() {
        let path = Path::new("this_file_should_not_exist_for_checksum_test.txt");
        assert!(!path.exists());

        let err = calculate_sha256_checksum(path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_calculate_sha256_checksum_for_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = calculate_sha256_checksum(temp_dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
