//! Rotating log file behaviour through the public API.

use std::fs;
use std::sync::Arc;

use shardgate::observability::{Level, LeveledLogger, LogFormat, RotatingFileWriter};

#[test]
fn rotation_walkthrough_with_single_backup() {
    let dir = tempfile::tempdir().unwrap();
    let writer = RotatingFileWriter::open(dir.path().join("sys.log"), 100, 1).unwrap();
    let backup = writer.backup_path(1);

    writer.write(&[b'a'; 80]).unwrap();
    assert_eq!(writer.current_size(), 80);
    assert!(!backup.exists());

    // 80 + 30 > 100: rotate first, then write into the fresh file.
    writer.write(&[b'b'; 30]).unwrap();
    assert_eq!(writer.current_size(), 30);
    assert_eq!(fs::read(writer.path()).unwrap(), vec![b'b'; 30]);
    assert_eq!(fs::read(&backup).unwrap(), vec![b'a'; 80]);

    // Oversized single write: rotate, then write it whole.
    writer.write(&[b'c'; 150]).unwrap();
    assert_eq!(writer.current_size(), 150);
    assert_eq!(fs::read(writer.path()).unwrap(), vec![b'c'; 150]);
    assert_eq!(fs::read(&backup).unwrap(), vec![b'b'; 30]);
    assert!(!writer.backup_path(2).exists());
    assert_eq!(writer.rotations(), 2);

    writer.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn post_rotation_size_equals_the_triggering_write() {
    let dir = tempfile::tempdir().unwrap();
    let writer = RotatingFileWriter::open(dir.path().join("sql.log"), 64, 2).unwrap();

    for len in [10usize, 20, 30, 40, 7, 60, 64, 1] {
        let before = writer.current_size();
        let rotations = writer.rotations();
        writer.write(&vec![b'x'; len]).unwrap();

        if before > 0 && before + len as u64 > 64 {
            assert_eq!(writer.rotations(), rotations + 1);
            assert_eq!(writer.current_size(), len as u64);
        } else {
            assert_eq!(writer.current_size(), before + len as u64);
        }
        assert_eq!(fs::metadata(writer.path()).unwrap().len(), writer.current_size());
    }
}

#[test]
fn filtered_records_write_zero_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sys.log");
    let logger = LeveledLogger::new(
        "system",
        Box::new(RotatingFileWriter::open(&path, 1024, 1).unwrap()),
    );
    logger.set_level_name("error");

    logger.debug("main", "main", "debug", &[]);
    logger.info("main", "main", "info", &[]);
    logger.warn("main", "main", "warn", &[("k", &1)]);
    logger.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn logger_close_is_idempotent_and_later_records_fail() {
    let dir = tempfile::tempdir().unwrap();
    let logger = LeveledLogger::new(
        "sql",
        Box::new(RotatingFileWriter::open(dir.path().join("sql.log"), 1024, 1).unwrap()),
    );

    logger.close().unwrap();
    logger.close().unwrap();
    assert!(logger.log(Level::Error, "conn", "query", "late", &[]).is_err());
}

#[test]
fn concurrent_records_stay_whole_across_rotations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sys.log");
    let format = LogFormat {
        timestamp: false,
        ..LogFormat::default()
    };
    let logger = Arc::new(LeveledLogger::with_format(
        "system",
        Box::new(RotatingFileWriter::open(&path, 512, 3).unwrap()),
        format,
    ));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let logger = logger.clone();
            std::thread::spawn(move || {
                for seq in 0..100 {
                    logger
                        .log(Level::Info, "worker", "loop", "tick", &[("worker", &worker), ("seq", &seq)])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.close().unwrap();

    let mut files = vec![path.clone()];
    files.extend((1..=3).map(|n| dir.path().join(format!("sys.log.{}", n))));
    for file in files.iter().filter(|f| f.exists()) {
        let content = fs::read_to_string(file).unwrap();
        assert!(content.len() <= 512);
        for line in content.lines() {
            assert!(
                line.starts_with("[INFO] [worker:loop] \"tick\" worker="),
                "torn line in {}: {:?}",
                file.display(),
                line
            );
        }
    }
}
