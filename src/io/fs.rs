use super::AsyncReadRange;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fs::File;
use std::io::Result;
use std::path::{Path, PathBuf};

/// Positional reads against a local file. The file is reopened per call so
/// the reader stays immutable and clonable across worker tasks.
#[derive(Clone, Debug)]
pub struct FileReader(PathBuf);

impl FileReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self(path.as_ref().to_path_buf())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl AsyncReadRange for FileReader {
    fn read_range_async<'a>(
        &'a self,
        start: u64,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<usize>> {
        async move {
            let file = File::open(&self.0)?;
            read_at(&file, start, buf)
        }
        .boxed()
    }
}

#[cfg(unix)]
fn read_at(file: &File, start: u64, buf: &mut [u8]) -> Result<usize> {
    use std::os::unix::fs::FileExt;
    let mut pos = 0;
    while pos < buf.len() {
        let n = file.read_at(&mut buf[pos..], start + pos as u64)?;
        if n == 0 {
            break;
        }
        pos += n;
    }
    Ok(pos)
}

#[cfg(not(unix))]
fn read_at(file: &File, start: u64, buf: &mut [u8]) -> Result<usize> {
    use std::io::{Read, Seek, SeekFrom};
    let mut file = file;
    file.seek(SeekFrom::Start(start))?;
    let mut pos = 0;
    while pos < buf.len() {
        let n = file.read(&mut buf[pos..])?;
        if n == 0 {
            break;
        }
        pos += n;
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_ranges_from_disk() {
        let path = std::env::temp_dir().join(format!("cogbench-fs-test-{}", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(&(0u8..64).collect::<Vec<_>>()).unwrap();
        drop(file);

        let reader = FileReader::new(&path);
        let bytes = futures::executor::block_on(reader.read_range_to_vec_async(8, 16)).unwrap();
        assert_eq!(bytes, (8u8..16).collect::<Vec<_>>());

        let mut buf = [0u8; 32];
        let n = futures::executor::block_on(reader.read_range_async(60, &mut buf)).unwrap();
        assert_eq!(n, 4);

        std::fs::remove_file(&path).unwrap();
    }
}
