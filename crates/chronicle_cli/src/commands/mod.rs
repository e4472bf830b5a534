pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod reset;
pub(crate) mod run;
pub(crate) mod shared;
pub(crate) mod stats;
pub(crate) mod sync;
