pub mod analysis;
pub mod fixes;
pub mod health;
pub mod imports;
pub mod materialize;
pub mod statistics;
pub mod suggest;
