#![allow(dead_code)]

use std::path::PathBuf;
use tabfile_frame::*;
use tempfile::TempDir;

/// A scratch directory holding a single destination path
pub struct Scratch {
    pub dir: TempDir,
    pub path: PathBuf,
}

pub fn scratch() -> Scratch {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.tab");
    Scratch { dir, path }
}

/// Write then read back, comparing against `expected` (or the input itself)
pub fn check_round_trip(frame: Frame, expected: Option<Frame>, options: &WriteOptions) {
    let scratch = scratch();
    write(&Input::Frame(frame.clone()), &scratch.path, options).unwrap();
    let result = read(&scratch.path).unwrap();
    assert_eq!(result, expected.unwrap_or(frame));
}

/// Assert that writing `input` fails with `kind` and leaves no file behind
pub fn check_error_on_write(input: Input, kind: ErrorKind) -> TabfileError {
    let scratch = scratch();
    let err = write(&input, &scratch.path, &WriteOptions::default()).unwrap_err();
    assert_eq!(err.kind(), kind, "unexpected error {:?}", err);
    assert!(!scratch.path.exists());
    assert_eq!(std::fs::read_dir(scratch.dir.path()).unwrap().count(), 0);
    err
}

pub fn frame_a() -> Frame {
    Frame::from_columns(vec![Series::new("A", [1i64, 2, 3])]).unwrap()
}
