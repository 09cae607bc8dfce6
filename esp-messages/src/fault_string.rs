// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded fault-phrase accumulator used by the fault report. One is
//! built per device check and discarded after printing.

#![cfg(any(test, feature = "std"))]

/// Display capacity used by fault report callers.
pub const FAULT_STRING_LENGTH: usize = 500;

/// Separator inserted between appended phrases.
pub const FAULT_STRING_SEPARATOR: &str = ", ";

/// Accumulates fault phrases up to a fixed capacity.
///
/// A phrase that does not fit is dropped silently rather than truncated;
/// the fault flag is still raised, so the report never under-counts even
/// when it under-describes.
#[derive(Debug, Clone)]
pub struct FaultString {
    buf: String,
    capacity: usize,
    any_fault: bool,
}

impl FaultString {
    pub fn new() -> Self {
        Self::with_capacity(FAULT_STRING_LENGTH)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: String::new(), capacity, any_fault: false }
    }

    /// Append `phrase` followed by the separator. The phrase is dropped
    /// (buffer unchanged) when `capacity <= len + phrase_len + 2`; note
    /// the boundary is `<=`, so a phrase that would exactly fill the
    /// buffer is also dropped.
    pub fn append(&mut self, phrase: &str) {
        self.any_fault = true;
        if self.capacity
            <= self.buf.len() + phrase.len() + FAULT_STRING_SEPARATOR.len()
        {
            return;
        }
        self.buf.push_str(phrase);
        self.buf.push_str(FAULT_STRING_SEPARATOR);
    }

    pub fn any_fault(&self) -> bool {
        self.any_fault
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Trim the trailing separator and yield the accumulated string.
    pub fn finish(mut self) -> (bool, String) {
        if self.buf.ends_with(FAULT_STRING_SEPARATOR) {
            self.buf.truncate(self.buf.len() - FAULT_STRING_SEPARATOR.len());
        }
        (self.any_fault, self.buf)
    }
}

impl Default for FaultString {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_phrase_has_no_separator() {
        let mut fs = FaultString::with_capacity(20);
        fs.append("General Fault");
        let (any, s) = fs.finish();
        assert!(any);
        assert_eq!(s, "General Fault");
    }

    #[test]
    fn phrases_are_comma_separated() {
        let mut fs = FaultString::new();
        fs.append("Faulted");
        fs.append("Env Intf Fault");
        let (any, s) = fs.finish();
        assert!(any);
        assert_eq!(s, "Faulted, Env Intf Fault");
    }

    #[test]
    fn oversized_phrase_is_dropped_but_still_counts() {
        // phrase len 5 + separator 2 == capacity 7 hits the <= boundary
        let mut fs = FaultString::with_capacity(7);
        fs.append("ABCDE");
        assert!(fs.is_empty());
        let (any, s) = fs.finish();
        assert!(any);
        assert_eq!(s, "");

        // one byte of headroom is enough
        let mut fs = FaultString::with_capacity(8);
        fs.append("ABCDE");
        let (_, s) = fs.finish();
        assert_eq!(s, "ABCDE");
    }

    #[test]
    fn later_phrase_dropped_when_buffer_nearly_full() {
        let mut fs = FaultString::with_capacity(12);
        fs.append("ABCDE");
        fs.append("FGHIJ");
        let (any, s) = fs.finish();
        assert!(any);
        assert_eq!(s, "ABCDE");
    }

    #[test]
    fn empty_accumulator_reports_no_fault() {
        let (any, s) = FaultString::new().finish();
        assert!(!any);
        assert_eq!(s, "");
    }
}
