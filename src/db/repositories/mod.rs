pub(crate) mod details;
pub(crate) mod history;
pub(crate) mod raw_samples;
pub(crate) mod trips;
