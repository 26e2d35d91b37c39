//! Runtime module — process lifecycle: boot, then run every input to completion.

pub mod boot;
pub mod run;
