pub mod cosmos;

pub use cosmos::CosmosStore;
