//! Shared fakes and end-to-end pipeline scenarios.

pub(crate) mod fakes;
