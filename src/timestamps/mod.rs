use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;

use crate::payload::FileMetadata;

/// Read `(creation, modification)` times of `path` as epoch seconds.
///
/// On Unix the creation value is the inode change time, which is what the
/// platform reports for "ctime".
pub fn get_times(path: &Path) -> io::Result<FileMetadata> {
    let meta = fs::metadata(path)?;
    let modification_time = to_epoch_secs(meta.modified()?);

    #[cfg(unix)]
    let creation_time = {
        use std::os::unix::fs::MetadataExt;
        meta.ctime() as f64 + meta.ctime_nsec() as f64 / 1e9
    };
    #[cfg(not(unix))]
    let creation_time = to_epoch_secs(meta.created().or_else(|_| meta.modified())?);

    Ok(FileMetadata {
        creation_time,
        modification_time,
    })
}

/// Restore the timestamps recorded in `metadata` onto `path`.
///
/// Creation time cannot be set portably; it is written as the access time,
/// the modification time as the modification time.
pub fn set_times(path: &Path, metadata: &FileMetadata) -> io::Result<()> {
    let times = FileTimes::new()
        .set_accessed(from_epoch_secs(metadata.creation_time)?)
        .set_modified(from_epoch_secs(metadata.modification_time)?);

    // directories cannot be opened for writing
    let file = File::options()
        .write(true)
        .open(path)
        .or_else(|_| File::open(path))?;
    file.set_times(times)?;

    debug!(
        "restored times on {}: accessed={} modified={}",
        path.display(),
        metadata.creation_time,
        metadata.modification_time
    );
    Ok(())
}

fn to_epoch_secs(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

fn from_epoch_secs(secs: f64) -> io::Result<SystemTime> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("timestamp {secs} is out of range"),
        )
    };
    let offset = Duration::try_from_secs_f64(secs.abs()).map_err(|_| invalid())?;
    let time = if secs >= 0.0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    };
    time.ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamped.txt");
        fs::write(&path, b"x").unwrap();

        let wanted = FileMetadata {
            creation_time: 1_600_000_000.5,
            modification_time: 1_500_000_000.25,
        };
        set_times(&path, &wanted).unwrap();

        let meta = fs::metadata(&path).unwrap();
        let modified = to_epoch_secs(meta.modified().unwrap());
        assert!((modified - wanted.modification_time).abs() < 1e-3);
        let accessed = to_epoch_secs(meta.accessed().unwrap());
        assert!((accessed - wanted.creation_time).abs() < 1e-3);

        let read_back = get_times(&path).unwrap();
        assert!((read_back.modification_time - wanted.modification_time).abs() < 1e-3);
    }

    #[test]
    fn test_epoch_conversion() {
        let t = from_epoch_secs(12.5).unwrap();
        assert_eq!(to_epoch_secs(t), 12.5);
        let before = from_epoch_secs(-3.0).unwrap();
        assert_eq!(to_epoch_secs(before), -3.0);
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(from_epoch_secs(f64::NAN).is_err());
        assert!(from_epoch_secs(f64::INFINITY).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(get_times(&dir.path().join("nope")).is_err());
    }
}
