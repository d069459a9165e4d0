use std::io;
use std::path::Path;

/// The single I/O primitive the stability tracker needs: the current size
/// of a file on disk.
///
/// A file that has disappeared mid-watch surfaces as
/// [`io::ErrorKind::NotFound`]; the tracker treats every probe error the
/// same way (terminal failure for that path, no retry), so existence does
/// not need its own return channel.
///
/// The trait seam exists so stability tests can script size sequences
/// without a real filesystem.
pub trait StatProbe: Send + Sync {
    fn file_size(&self, path: &Path) -> io::Result<u64>;
}

/// Production probe backed by `std::fs::metadata`.
pub struct FsProbe;

impl StatProbe for FsProbe {
    fn file_size(&self, path: &Path) -> io::Result<u64> {
        std::fs::metadata(path).map(|m| m.len())
    }
}
