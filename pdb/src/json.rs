//! The JSON-builder callback contract (spec.md §6: "a JSON-builder with the operations
//! `open_object`, `open_array(key)`, `key_string(k,v)`, `key_number(k,v)`, `end`").
//!
//! This crate does not depend on a JSON library: rendering in JSON mode only ever calls back into
//! a sink the host disassembler provides, matching spec.md §1's scope note that "the output
//! channel that receives textual/JSON rendering" is an external collaborator.

/// A JSON-builder callback. Implementations typically wrap something like `serde_json::Value`
/// or a streaming writer; this crate only ever calls the five operations below, in properly
/// nested `open_object`/`open_array`/`end` order.
pub trait JsonSink {
    /// Opens a new JSON object as the current value.
    fn open_object(&mut self);
    /// Opens a new JSON array under the given key, and makes it the current container.
    fn open_array(&mut self, key: &str);
    /// Writes a string-valued key into the current object.
    fn key_string(&mut self, key: &str, value: &str);
    /// Writes a number-valued key into the current object.
    fn key_number(&mut self, key: &str, value: i64);
    /// Closes the most recently opened object or array.
    fn end(&mut self);
}
