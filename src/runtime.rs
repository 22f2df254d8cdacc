//! Host implementation of the runtime ABI
//!
//! These functions stand in for `runtime/bbruntime.c` when a module runs in
//! the JIT. Strings they return are owned by the [`Arena`] entered on the
//! calling thread and live until that arena is released (each `JitSession`
//! owns one). Output goes to stdout unless the current thread is inside
//! [`capture_output`].

use std::cell::{Cell, RefCell};
use std::ffi::{c_char, CStr, CString};
use std::io::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codegen::runtime::{PRINT, STR_COMPARE, STR_CONCAT, STR_FROM_FLOAT, STR_FROM_INT, WRITE};

thread_local! {
    static CAPTURE: RefCell<Option<String>> = const { RefCell::new(None) };
    static STRINGS: RefCell<Vec<(u64, CString)>> = const { RefCell::new(Vec::new()) };
    static ACTIVE: Cell<u64> = const { Cell::new(0) };
}

/// Owner of the strings the runtime returns while it is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena(u64);

impl Arena {
    /// A fresh arena, distinct from every other one in the process
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Arena(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Run `f` with runtime strings charged to this arena
    pub fn enter<R>(self, f: impl FnOnce() -> R) -> R {
        let previous = ACTIVE.with(|active| active.replace(self.0));
        let result = f();
        ACTIVE.with(|active| active.set(previous));
        result
    }

    /// Free this arena's strings on the current thread
    pub fn release(self) {
        STRINGS.with(|s| s.borrow_mut().retain(|(owner, _)| *owner != self.0));
    }
}

/// Run `f`, collecting everything the runtime prints meanwhile.
pub fn capture_output<R>(f: impl FnOnce() -> R) -> (R, String) {
    let previous = CAPTURE.with(|c| c.borrow_mut().replace(String::new()));
    let result = f();
    let output = CAPTURE.with(|c| std::mem::replace(&mut *c.borrow_mut(), previous));
    (result, output.unwrap_or_default())
}

fn emit(text: &str, newline: bool) {
    let captured = CAPTURE.with(|c| match c.borrow_mut().as_mut() {
        Some(buffer) => {
            buffer.push_str(text);
            if newline {
                buffer.push('\n');
            }
            true
        }
        None => false,
    });
    if captured {
        return;
    }

    let mut stdout = std::io::stdout().lock();
    // the ABI has no error channel; a closed stdout drops output like C stdio
    let _ = stdout.write_all(text.as_bytes());
    if newline {
        let _ = stdout.write_all(b"\n");
    }
    let _ = stdout.flush();
}

/// Keep `text` alive in the arena and return its C pointer
fn intern(text: String) -> *const c_char {
    // interior NULs cannot come from the runtime's own formatting
    let text = CString::new(text).unwrap_or_default();
    let ptr = text.as_ptr();
    let owner = ACTIVE.with(Cell::get);
    STRINGS.with(|s| s.borrow_mut().push((owner, text)));
    ptr
}

/// # Safety
/// `text` must be null or point to a NUL-terminated string.
unsafe fn read<'a>(text: *const c_char) -> &'a CStr {
    if text.is_null() {
        c""
    } else {
        CStr::from_ptr(text)
    }
}

/// Blitz's float formatting: six decimals, trailing zeros trimmed to one
pub fn format_float(value: f32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let text = format!("{value:.6}");
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

unsafe extern "C" fn bb_print(text: *const c_char) {
    emit(&read(text).to_string_lossy(), true);
}

unsafe extern "C" fn bb_write(text: *const c_char) {
    emit(&read(text).to_string_lossy(), false);
}

extern "C" fn bb_str_from_int(value: i32) -> *const c_char {
    intern(value.to_string())
}

extern "C" fn bb_str_from_float(value: f32) -> *const c_char {
    intern(format_float(value))
}

unsafe extern "C" fn bb_str_concat(left: *const c_char, right: *const c_char) -> *const c_char {
    let mut joined = read(left).to_bytes().to_vec();
    joined.extend_from_slice(read(right).to_bytes());
    intern(String::from_utf8_lossy(&joined).into_owned())
}

unsafe extern "C" fn bb_str_compare(left: *const c_char, right: *const c_char) -> i32 {
    match read(left).cmp(read(right)) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

/// Address of the host implementation of a runtime symbol
pub fn host_address(symbol: &str) -> Option<usize> {
    let address = match symbol {
        PRINT => bb_print as usize,
        WRITE => bb_write as usize,
        STR_FROM_INT => bb_str_from_int as usize,
        STR_FROM_FLOAT => bb_str_from_float as usize,
        STR_CONCAT => bb_str_concat as usize,
        STR_COMPARE => bb_str_compare as usize,
        _ => return None,
    };
    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::runtime::RUNTIME_FUNCTIONS;

    #[test]
    fn test_every_runtime_function_has_a_host_address() {
        for func in RUNTIME_FUNCTIONS {
            assert!(host_address(func.symbol).is_some(), "{}", func.symbol);
        }
        assert!(host_address("bbmain").is_none());
    }

    #[test]
    fn test_float_format() {
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(-0.125), "-0.125");
        assert_eq!(format_float(1.0 / 3.0), "0.333333");
    }

    fn owned_by(arena: Arena) -> usize {
        STRINGS.with(|s| s.borrow().iter().filter(|(owner, _)| *owner == arena.0).count())
    }

    #[test]
    fn test_capture_and_strings() {
        let arena = Arena::allocate();
        let ((), output) = capture_output(|| {
            arena.enter(|| unsafe {
                let n = bb_str_from_int(42);
                let joined = bb_str_concat(c"n=".as_ptr(), n);
                bb_write(joined);
                bb_print(c"!".as_ptr());
            })
        });
        assert_eq!(output, "n=42!\n");
        assert_eq!(owned_by(arena), 2);
        arena.release();
        assert_eq!(owned_by(arena), 0);
    }

    #[test]
    fn test_release_keeps_other_arenas() {
        let first = Arena::allocate();
        let second = Arena::allocate();
        assert_ne!(first, second);

        first.enter(|| bb_str_from_int(1));
        let kept = second.enter(|| bb_str_from_float(2.5));
        first.release();

        assert_eq!(owned_by(first), 0);
        assert_eq!(owned_by(second), 1);
        assert_eq!(unsafe { read(kept) }, c"2.5");
        second.release();
    }

    #[test]
    fn test_compare() {
        unsafe {
            assert_eq!(bb_str_compare(c"a".as_ptr(), c"b".as_ptr()), -1);
            assert_eq!(bb_str_compare(c"b".as_ptr(), c"b".as_ptr()), 0);
            assert_eq!(bb_str_compare(std::ptr::null(), c"".as_ptr()), 0);
        }
    }
}
