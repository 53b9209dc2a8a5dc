//! Moodle XML tests
//!
//! Round trips start from the text kitchensink; imports start from exports
//! the way Moodle writes them.

mod import;
mod roundtrip;
