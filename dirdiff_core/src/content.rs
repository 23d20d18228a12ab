use dirdiff_common::{ContentMode, ContentReadError, Vfs, VfsError};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const BUFFER_SIZE: usize = 64 * 1024;

/// Decides whether two files hold exactly the same bytes.
///
/// Both modes read the files to the end; nothing is sampled.
pub struct ContentComparator {
    vfs: Arc<dyn Vfs>,
    mode: ContentMode,
}

impl ContentComparator {
    pub fn new(vfs: Arc<dyn Vfs>, mode: ContentMode) -> Self {
        Self { vfs, mode }
    }

    pub fn same_content(&self, left: &Path, right: &Path) -> Result<bool, ContentReadError> {
        let read_error = |source: VfsError| ContentReadError {
            left: left.to_path_buf(),
            right: right.to_path_buf(),
            source,
        };

        let left_reader = self.vfs.open_file(left).map_err(read_error)?;
        let right_reader = self.vfs.open_file(right).map_err(read_error)?;

        let same = match self.mode {
            ContentMode::Bytes => streams_equal(left_reader, right_reader),
            ContentMode::Blake3 => {
                hash_reader(left_reader).and_then(|l| Ok(l == hash_reader(right_reader)?))
            }
        }
        .map_err(|e| read_error(VfsError::Io(e)))?;

        debug!("{:?} vs {:?}: same content = {}", left, right, same);
        Ok(same)
    }
}

fn hash_reader(mut reader: Box<dyn Read + Send>) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

fn streams_equal(
    mut left: Box<dyn Read + Send>,
    mut right: Box<dyn Read + Send>,
) -> io::Result<bool> {
    let mut left_buf = vec![0; BUFFER_SIZE];
    let mut right_buf = vec![0; BUFFER_SIZE];

    loop {
        let l = fill(&mut left, &mut left_buf)?;
        let r = fill(&mut right, &mut right_buf)?;
        if l != r || left_buf[..l] != right_buf[..r] {
            return Ok(false);
        }
        if l == 0 {
            return Ok(true);
        }
    }
}

/// Reads until `buf` is full or the stream ends; returns the byte count.
fn fill(reader: &mut Box<dyn Read + Send>, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
