//! Allocation failure tests.
//!
//! This binary runs under an allocator that refuses any single allocation
//! over 64 KiB, so 1 MiB fragments make the write path fail for real. A
//! failed append must leave the assembler (and the history around it)
//! exactly as it was.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;

use cmdlog_core::{
    Assembler, AssemblyResult, CommandHistory, Error, FramingPolicy, HistoryConfig,
};

/// Largest allocation the test allocator will satisfy
const ALLOC_CAP: usize = 64 * 1024;

struct CappedAlloc;

unsafe impl GlobalAlloc for CappedAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() > ALLOC_CAP {
            return ptr::null_mut();
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if new_size > ALLOC_CAP {
            return ptr::null_mut();
        }
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: CappedAlloc = CappedAlloc;

const BIG: usize = 1 << 20;

// Statics, so the fixtures themselves never go through the allocator
static LONG_LINE: [u8; BIG] = [b'x'; BIG];
static LONG_LINE_WITH_TAIL: [u8; BIG + 6] = long_line_with_tail();

const fn long_line_with_tail() -> [u8; BIG + 6] {
    let tail = b"\nyy\nzz";
    let mut bytes = [b'x'; BIG + 6];
    let mut i = 0;
    while i < tail.len() {
        bytes[BIG + i] = tail[i];
        i += 1;
    }
    bytes
}

fn assert_append_fails_cleanly(policy: FramingPolicy) {
    let mut assembler = Assembler::with_policy(b'\n', policy);
    assert!(matches!(
        assembler.append(b"abc").unwrap(),
        AssemblyResult::Incomplete
    ));
    let before = assembler.stats();

    for fragment in [&LONG_LINE[..], &LONG_LINE_WITH_TAIL[..]] {
        let result = assembler.append(fragment);
        assert!(
            matches!(result, Err(Error::Alloc { .. })),
            "{:?}: expected allocation failure for {} bytes",
            policy,
            fragment.len()
        );
        assert_eq!(assembler.pending(), b"abc");
        assert_eq!(assembler.stats(), before);
    }

    // Still usable afterwards
    match assembler.append(b"d\n").unwrap() {
        AssemblyResult::Complete(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].as_bytes(), b"abcd\n");
        }
        AssemblyResult::Incomplete => panic!("{:?}: delimiter not framed", policy),
    }
}

/// Test a failed append under the default split policy.
#[test]
fn test_append_failure_leaves_split_assembler_unchanged() {
    assert_append_fails_cleanly(FramingPolicy::Split);
}

/// Test a failed append under the first-delimiter policy.
#[test]
fn test_append_failure_leaves_first_delimiter_assembler_unchanged() {
    assert_append_fails_cleanly(FramingPolicy::FirstDelimiter);
}

/// Test that a rejected write leaves the history untouched and is counted.
#[test]
fn test_write_failure_leaves_history_unchanged() {
    for policy in [FramingPolicy::Split, FramingPolicy::FirstDelimiter] {
        let history = CommandHistory::new(HistoryConfig {
            capacity: 2,
            policy,
            ..HistoryConfig::default()
        })
        .unwrap();

        history.write(b"kept\n").unwrap();
        history.write(b"abc").unwrap();
        let contents = history.contents().unwrap();
        let stats = history.stats().unwrap();
        let failures = history.metrics().unwrap().alloc_failures;

        let err = history.write(&LONG_LINE_WITH_TAIL).unwrap_err();
        assert!(matches!(err, Error::Alloc { .. }));
        assert!(err.is_retryable());

        assert_eq!(history.contents().unwrap(), contents);
        assert_eq!(history.stats().unwrap(), stats);
        assert_eq!(history.metrics().unwrap().alloc_failures, failures + 1);

        history.write(b"\n").unwrap();
        assert_eq!(history.contents().unwrap(), b"kept\nabc\n");
    }
}
