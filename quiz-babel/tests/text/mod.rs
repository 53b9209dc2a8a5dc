//! Plain-text notation tests

mod datasets;
mod roundtrip;
