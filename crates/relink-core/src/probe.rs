use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::warn;

/// Report whether a regular file exists at `path` and its byte size.
/// Probe failures other than NotFound (permission, unreachable mount)
/// are folded into "missing" for classification, but logged so they
/// stay distinguishable from a true absence.
pub fn probe(path: &Path) -> Option<u64> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        Ok(_) => None,
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(
                "Probe failed for {} (treated as missing): {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Streaming blake3 hash of a file's contents, used by the optional
/// strict verification mode.
pub fn content_hash(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize())
}
