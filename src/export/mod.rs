pub mod provenance;
pub mod writer;
