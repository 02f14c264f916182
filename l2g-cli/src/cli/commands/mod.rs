pub mod apply;
pub mod discover;
pub mod plan;
pub mod resync;
pub mod rollback;
pub mod simulate;
pub mod suggest;
pub mod terms;
